use std::io::Read;
use std::path::Path;

use anyhow::Context;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Deserializer};
use thiserror::Error;
use tracing::{info, warn};

use crate::models::{Case, CaseId, Event, Occupation, RecordedDate, SocCode};

pub const OCCUPATIONS_FILE: &str = "occupations.csv";
pub const CASES_FILE: &str = "cases.csv";
pub const EVENTS_FILE: &str = "events.csv";

#[derive(Debug, Error, PartialEq)]
pub enum RecordError {
    #[error("occupation {soc_code}: automation_probability {value} is outside [0, 1]")]
    ProbabilityOutOfRange { soc_code: SocCode, value: f64 },
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawOccupation {
    pub soc_code: SocCode,
    pub job_title: Option<String>,
    pub automation_probability: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawCase {
    pub case_id: CaseId,
    pub employee_id: Option<i64>,
    pub training_program: Option<String>,
    #[serde(default, deserialize_with = "deserialize_flag")]
    pub certification_earned: Option<bool>,
    pub completion_date: Option<String>,
    pub start_date: Option<String>,
    pub perceived_skill_improvement: Option<f64>,
    pub training_feedback_score: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEvent {
    pub event_id: i64,
    pub case_id: Option<CaseId>,
    pub activity: Option<String>,
    pub actor: Option<String>,
    pub completion_status: Option<String>,
    pub score: Option<String>,
    pub skill_category: Option<String>,
    pub timestamp: Option<String>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
}

/// Reads booleans the way spreadsheets and Postgres text exports write them.
/// Unrecognised values are treated as missing.
fn deserialize_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(parse_flag))
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "" => None,
        "true" | "t" | "yes" | "y" | "1" => Some(true),
        "false" | "f" | "no" | "n" | "0" => Some(false),
        other => {
            warn!(value = other, "unrecognised boolean treated as missing");
            None
        }
    }
}

const DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const OFFSET_DATE_TIME_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f%#z", "%Y-%m-%dT%H:%M:%S%.f%#z"];

/// Date part of a `date`, `timestamp` or `timestamptz` value, including the
/// Postgres text forms (`2023-01-01 00:00:00+00`).
pub fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Some(timestamp.date_naive());
    }
    OFFSET_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| DateTime::parse_from_str(raw, format).ok())
        .map(|timestamp| timestamp.date_naive())
        .or_else(|| {
            DATE_TIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
                .map(|timestamp| timestamp.date())
        })
}

fn recorded_date(case_id: CaseId, column: &'static str, value: Option<String>) -> Option<RecordedDate> {
    let raw = non_blank(value)?;
    match parse_date_text(&raw) {
        Some(date) => Some(RecordedDate::Parsed(date)),
        None => {
            warn!(case_id, column, value = %raw, "unrecognised date kept as text");
            Some(RecordedDate::Unparsed(raw))
        }
    }
}

impl TryFrom<RawOccupation> for Occupation {
    type Error = RecordError;

    fn try_from(raw: RawOccupation) -> Result<Self, Self::Error> {
        if let Some(value) = raw.automation_probability {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(RecordError::ProbabilityOutOfRange {
                    soc_code: raw.soc_code,
                    value,
                });
            }
        }

        Ok(Occupation {
            soc_code: raw.soc_code,
            job_title: non_blank(raw.job_title),
            automation_probability: raw.automation_probability,
        })
    }
}

impl From<RawCase> for Case {
    fn from(raw: RawCase) -> Self {
        Case {
            case_id: raw.case_id,
            employee_id: raw.employee_id,
            training_program: non_blank(raw.training_program),
            certification_earned: raw.certification_earned,
            completion_date: recorded_date(raw.case_id, "completion_date", raw.completion_date),
            start_date: recorded_date(raw.case_id, "start_date", raw.start_date),
            perceived_skill_improvement: raw.perceived_skill_improvement,
            training_feedback_score: raw.training_feedback_score,
        }
    }
}

impl From<RawEvent> for Event {
    fn from(raw: RawEvent) -> Self {
        Event {
            event_id: raw.event_id,
            case_id: raw.case_id,
            activity: non_blank(raw.activity),
            actor: non_blank(raw.actor),
            completion_status: non_blank(raw.completion_status),
            score: non_blank(raw.score),
            skill_category: non_blank(raw.skill_category),
            timestamp: non_blank(raw.timestamp),
        }
    }
}

/// One snapshot of the three record sets.
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub occupations: Vec<Occupation>,
    pub cases: Vec<Case>,
    pub events: Vec<Event>,
}

impl Dataset {
    pub fn from_raw(
        occupations: Vec<RawOccupation>,
        cases: Vec<RawCase>,
        events: Vec<RawEvent>,
    ) -> Result<Self, RecordError> {
        let dataset = Dataset {
            occupations: occupations
                .into_iter()
                .map(Occupation::try_from)
                .collect::<Result<_, _>>()?,
            cases: cases.into_iter().map(Case::from).collect(),
            events: events.into_iter().map(Event::from).collect(),
        };

        info!(
            occupations = dataset.occupations.len(),
            cases = dataset.cases.len(),
            events = dataset.events.len(),
            "loaded reskilling dataset"
        );
        Ok(dataset)
    }

    /// Reads `occupations.csv`, `cases.csv` and `events.csv` from `dir`.
    pub fn from_csv_dir(dir: &Path) -> anyhow::Result<Self> {
        let occupations = read_csv_file(&dir.join(OCCUPATIONS_FILE))?;
        let cases = read_csv_file(&dir.join(CASES_FILE))?;
        let events = read_csv_file(&dir.join(EVENTS_FILE))?;
        Ok(Self::from_raw(occupations, cases, events)?)
    }
}

pub fn read_csv<T, R>(reader: R) -> Result<Vec<T>, csv::Error>
where
    T: for<'de> Deserialize<'de>,
    R: Read,
{
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(reader);
    reader.deserialize::<T>().collect()
}

fn read_csv_file<T>(path: &Path) -> anyhow::Result<Vec<T>>
where
    T: for<'de> Deserialize<'de>,
{
    let file = std::fs::File::open(path)
        .with_context(|| format!("failed to open {}", path.display()))?;
    read_csv(file).with_context(|| format!("failed to parse {}", path.display()))
}
