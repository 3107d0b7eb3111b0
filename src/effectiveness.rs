use std::collections::HashMap;

use tracing::debug;

use crate::models::{CaseWithEvents, EffectivenessSummary, ProgramEffectiveness, SuccessFactor};
use crate::rates::percentage;

const UNKNOWN_PROGRAM: &str = "Unknown";

#[derive(Debug, Default)]
struct ProgramTally {
    total_cases: usize,
    completed: usize,
    certified: usize,
    success_events: usize,
    total_events: usize,
}

impl ProgramTally {
    fn record(&mut self, entry: &CaseWithEvents) {
        self.total_cases += 1;
        if entry.case.is_completed() {
            self.completed += 1;
        }
        if entry.case.is_certified() {
            self.certified += 1;
        }
        self.total_events += entry.events.len();
        self.success_events += entry
            .events
            .iter()
            .filter(|event| event.outcome().is_success())
            .count();
    }
}

/// Groups tallies by key, keeping keys in first-seen order.
fn tally_by<'a, F>(cases_with_events: &'a [CaseWithEvents], key: F) -> Vec<(String, ProgramTally)>
where
    F: Fn(&'a CaseWithEvents) -> Option<&'a str>,
{
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut groups: Vec<(String, ProgramTally)> = Vec::new();

    for entry in cases_with_events {
        let Some(name) = key(entry) else {
            continue;
        };
        let slot = *index.entry(name).or_insert_with(|| {
            groups.push((name.to_string(), ProgramTally::default()));
            groups.len() - 1
        });
        groups[slot].1.record(entry);
    }

    groups
}

/// Completion, certification and event success rates per training program.
///
/// Cases without a program are left out of the per-program rows but still
/// count toward the overall rates.
pub fn compute_program_effectiveness(cases_with_events: &[CaseWithEvents]) -> EffectivenessSummary {
    let programs: Vec<ProgramEffectiveness> = tally_by(cases_with_events, |entry| entry.case.program())
        .into_iter()
        .map(|(program, tally)| ProgramEffectiveness {
            program,
            completion_rate: percentage(tally.completed, tally.total_cases),
            certification_rate: percentage(tally.certified, tally.total_cases),
            success_rate: percentage(tally.success_events, tally.total_events),
            total_cases: tally.total_cases,
            completed: tally.completed,
            certified: tally.certified,
            success_events: tally.success_events,
            total_events: tally.total_events,
        })
        .collect();

    let mut overall = ProgramTally::default();
    for entry in cases_with_events {
        overall.record(entry);
    }

    debug!(programs = programs.len(), cases = overall.total_cases, "computed program effectiveness");

    EffectivenessSummary {
        programs,
        total_cases: overall.total_cases,
        completion_rate: percentage(overall.completed, overall.total_cases),
        certification_rate: percentage(overall.certified, overall.total_cases),
        success_rate: percentage(overall.success_events, overall.total_events),
    }
}

/// Completion and certification rates per program, with missing programs
/// grouped under "Unknown", sorted by completion rate.
pub fn compute_success_factors(cases_with_events: &[CaseWithEvents]) -> Vec<SuccessFactor> {
    let mut factors: Vec<SuccessFactor> = tally_by(cases_with_events, |entry| {
        Some(entry.case.program().unwrap_or(UNKNOWN_PROGRAM))
    })
    .into_iter()
    .map(|(factor, tally)| SuccessFactor {
        factor,
        success_rate: percentage(tally.completed, tally.total_cases),
        certification_rate: percentage(tally.certified, tally.total_cases),
    })
    .collect();

    factors.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    factors
}
