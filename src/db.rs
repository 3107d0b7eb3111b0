use anyhow::Context;
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::loader::{Dataset, RawCase, RawEvent, RawOccupation};
use crate::models::{CaseId, Event};

const OCCUPATIONS_QUERY: &str = r#"
    SELECT soc_code::int8 AS soc_code,
           job_title,
           automation_probability::float8 AS automation_probability
    FROM "Job_Risk"
    ORDER BY automation_probability DESC NULLS LAST
"#;

const CASES_QUERY: &str = r#"
    SELECT case_id::int8 AS case_id,
           employee_id::int8 AS employee_id,
           training_program,
           certification_earned,
           completion_date::text AS completion_date,
           start_date::text AS start_date,
           perceived_skill_improvement::float8 AS perceived_skill_improvement,
           training_feedback_score::float8 AS training_feedback_score
    FROM "Employee_Reskilling_cases"
"#;

const EVENTS_QUERY: &str = r#"
    SELECT event_id::int8 AS event_id,
           case_id::int8 AS case_id,
           activity,
           actor,
           completion_status,
           score::text AS score,
           skill_category,
           "timestamp"::text AS "timestamp"
    FROM "WorkforceReskilling_events"
"#;

pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to Postgres")
}

fn occupation_from_row(row: &PgRow) -> Result<RawOccupation, sqlx::Error> {
    Ok(RawOccupation {
        soc_code: row.try_get("soc_code")?,
        job_title: row.try_get("job_title")?,
        automation_probability: row.try_get("automation_probability")?,
    })
}

fn case_from_row(row: &PgRow) -> Result<RawCase, sqlx::Error> {
    Ok(RawCase {
        case_id: row.try_get("case_id")?,
        employee_id: row.try_get("employee_id")?,
        training_program: row.try_get("training_program")?,
        certification_earned: row.try_get("certification_earned")?,
        completion_date: row.try_get("completion_date")?,
        start_date: row.try_get("start_date")?,
        perceived_skill_improvement: row.try_get("perceived_skill_improvement")?,
        training_feedback_score: row.try_get("training_feedback_score")?,
    })
}

fn event_from_row(row: &PgRow) -> Result<RawEvent, sqlx::Error> {
    Ok(RawEvent {
        event_id: row.try_get("event_id")?,
        case_id: row.try_get("case_id")?,
        activity: row.try_get("activity")?,
        actor: row.try_get("actor")?,
        completion_status: row.try_get("completion_status")?,
        score: row.try_get("score")?,
        skill_category: row.try_get("skill_category")?,
        timestamp: row.try_get("timestamp")?,
    })
}

pub async fn fetch_occupations(pool: &PgPool) -> anyhow::Result<Vec<RawOccupation>> {
    let rows = sqlx::query(OCCUPATIONS_QUERY)
        .fetch_all(pool)
        .await
        .context("failed to fetch Job_Risk")?;
    rows.iter()
        .map(occupation_from_row)
        .collect::<Result<_, _>>()
        .context("unexpected Job_Risk row shape")
}

pub async fn fetch_cases(pool: &PgPool) -> anyhow::Result<Vec<RawCase>> {
    let rows = sqlx::query(CASES_QUERY)
        .fetch_all(pool)
        .await
        .context("failed to fetch Employee_Reskilling_cases")?;
    rows.iter()
        .map(case_from_row)
        .collect::<Result<_, _>>()
        .context("unexpected Employee_Reskilling_cases row shape")
}

pub async fn fetch_events(pool: &PgPool) -> anyhow::Result<Vec<RawEvent>> {
    let rows = sqlx::query(EVENTS_QUERY)
        .fetch_all(pool)
        .await
        .context("failed to fetch WorkforceReskilling_events")?;
    rows.iter()
        .map(event_from_row)
        .collect::<Result<_, _>>()
        .context("unexpected WorkforceReskilling_events row shape")
}

pub async fn fetch_events_for_case(pool: &PgPool, case_id: CaseId) -> anyhow::Result<Vec<Event>> {
    let query = format!("{EVENTS_QUERY} WHERE case_id = $1");
    let rows = sqlx::query(&query)
        .bind(case_id)
        .fetch_all(pool)
        .await
        .with_context(|| format!("failed to fetch events for case {case_id}"))?;
    let raw: Vec<RawEvent> = rows
        .iter()
        .map(event_from_row)
        .collect::<Result<_, _>>()
        .context("unexpected WorkforceReskilling_events row shape")?;
    Ok(raw.into_iter().map(Event::from).collect())
}

/// Fetches the three tables concurrently and validates them.
pub async fn fetch_dataset(pool: &PgPool) -> anyhow::Result<Dataset> {
    let (occupations, cases, events) =
        tokio::try_join!(fetch_occupations(pool), fetch_cases(pool), fetch_events(pool))?;
    Ok(Dataset::from_raw(occupations, cases, events)?)
}
