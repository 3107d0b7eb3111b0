use chrono::NaiveDate;
use serde::Serialize;

pub type CaseId = i64;
pub type SocCode = i64;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Occupation {
    pub soc_code: SocCode,
    pub job_title: Option<String>,
    pub automation_probability: Option<f64>,
}

impl Occupation {
    pub fn display_name(&self) -> String {
        match self.job_title.as_deref() {
            Some(title) => title.to_string(),
            None => format!("Occupation {}", self.soc_code),
        }
    }
}

/// A date column as recorded. Text that is not a recognised date is kept so
/// that its presence still counts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum RecordedDate {
    Parsed(NaiveDate),
    Unparsed(String),
}

impl RecordedDate {
    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            RecordedDate::Parsed(date) => Some(*date),
            RecordedDate::Unparsed(_) => None,
        }
    }
}

impl From<NaiveDate> for RecordedDate {
    fn from(date: NaiveDate) -> Self {
        RecordedDate::Parsed(date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Case {
    pub case_id: CaseId,
    pub employee_id: Option<i64>,
    pub training_program: Option<String>,
    pub certification_earned: Option<bool>,
    pub completion_date: Option<RecordedDate>,
    pub start_date: Option<RecordedDate>,
    pub perceived_skill_improvement: Option<f64>,
    pub training_feedback_score: Option<f64>,
}

impl Case {
    /// Program name, treating an empty name as missing.
    pub fn program(&self) -> Option<&str> {
        self.training_program
            .as_deref()
            .filter(|name| !name.is_empty())
    }

    pub fn is_completed(&self) -> bool {
        self.completion_date.is_some()
    }

    pub fn is_certified(&self) -> bool {
        self.certification_earned.unwrap_or(false)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    Completed,
    Passed,
    Failed,
    Other,
}

impl EventOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, EventOutcome::Completed | EventOutcome::Passed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Event {
    pub event_id: i64,
    pub case_id: Option<CaseId>,
    pub activity: Option<String>,
    pub actor: Option<String>,
    pub completion_status: Option<String>,
    pub score: Option<String>,
    pub skill_category: Option<String>,
    pub timestamp: Option<String>,
}

impl Event {
    pub fn outcome(&self) -> EventOutcome {
        match self.completion_status.as_deref() {
            Some("completed") => EventOutcome::Completed,
            Some("passed") => EventOutcome::Passed,
            Some("failed") => EventOutcome::Failed,
            _ => EventOutcome::Other,
        }
    }

    /// Numeric score read from the leading number in the text, so "85%"
    /// yields 85.
    pub fn numeric_score(&self) -> Option<f64> {
        self.score.as_deref().and_then(leading_number)
    }
}

/// Longest prefix of `raw` (after leading whitespace) that reads as a finite
/// decimal number with an optional exponent.
pub fn leading_number(raw: &str) -> Option<f64> {
    let text = raw.trim_start();
    let bytes = text.as_bytes();
    let mut end = 0;

    if matches!(bytes.first(), Some(b'+') | Some(b'-')) {
        end += 1;
    }
    let int_start = end;
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    let mut digits = end - int_start;

    if bytes.get(end) == Some(&b'.') {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while bytes.get(frac_end).is_some_and(u8::is_ascii_digit) {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }

    if matches!(bytes.get(end), Some(b'e') | Some(b'E')) {
        let mut exp_end = end + 1;
        if matches!(bytes.get(exp_end), Some(b'+') | Some(b'-')) {
            exp_end += 1;
        }
        let exp_digits_start = exp_end;
        while bytes.get(exp_end).is_some_and(u8::is_ascii_digit) {
            exp_end += 1;
        }
        if exp_end > exp_digits_start {
            end = exp_end;
        }
    }

    text[..end]
        .parse::<f64>()
        .ok()
        .filter(|value| value.is_finite())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseWithEvents {
    #[serde(flatten)]
    pub case: Case,
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramEffectiveness {
    pub program: String,
    pub total_cases: usize,
    pub completed: usize,
    pub certified: usize,
    pub success_events: usize,
    pub total_events: usize,
    pub completion_rate: f64,
    pub certification_rate: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct EffectivenessSummary {
    pub programs: Vec<ProgramEffectiveness>,
    pub total_cases: usize,
    pub completion_rate: f64,
    pub certification_rate: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SuccessFactor {
    pub factor: String,
    pub success_rate: f64,
    pub certification_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkillCategoryStat {
    pub category: String,
    pub total_events: usize,
    pub completed: usize,
    pub passed: usize,
    pub failed: usize,
    pub scores: Vec<f64>,
    pub avg_score: f64,
    pub success_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramSpending {
    pub program: String,
    pub participants: usize,
    pub cost_per_participant: f64,
    pub total_cost: f64,
    pub percent_of_budget: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CurrentBudget {
    pub program_spending: Vec<ProgramSpending>,
    pub total_budget: f64,
    pub total_participants: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgramAllocation {
    pub program: String,
    pub participants: usize,
    pub cost_per_participant: f64,
    pub total_cost: f64,
    pub percent_of_budget: f64,
    pub success_rate: f64,
    pub roi: f64,
    pub new_budget: f64,
    pub new_participants: usize,
    pub change: f64,
    pub new_percent_of_budget: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OptimizedBudget {
    pub program_allocation: Vec<ProgramAllocation>,
    pub new_total_budget: f64,
    pub remaining_budget: f64,
    pub total_participants_reduction: usize,
    pub total_participants_remaining: usize,
    pub percent_reduction: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetComparison {
    pub program: String,
    pub current: f64,
    pub optimized: f64,
    pub change: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Quadrant {
    #[serde(rename = "High Priority")]
    High,
    #[serde(rename = "Medium Priority")]
    Medium,
    #[serde(rename = "Low Priority")]
    Low,
    #[serde(rename = "Lowest Priority")]
    Lowest,
}

impl Quadrant {
    pub fn label(self) -> &'static str {
        match self {
            Quadrant::High => "High Priority",
            Quadrant::Medium => "Medium Priority",
            Quadrant::Low => "Low Priority",
            Quadrant::Lowest => "Lowest Priority",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PriorityEntry {
    pub soc_code: SocCode,
    pub name: String,
    pub automation_risk: f64,
    pub reskilling_ease: f64,
    pub priority_score: f64,
    pub quadrant: Quadrant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskBand {
    High,
    Medium,
    Low,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskEntry {
    pub soc_code: SocCode,
    pub name: String,
    pub risk: f64,
    pub band: RiskBand,
}
