use std::collections::HashMap;

use tracing::debug;

use crate::models::{CaseWithEvents, EventOutcome, SkillCategoryStat};
use crate::rates::{percentage, safe_ratio};

const UNCATEGORIZED: &str = "Uncategorized";

/// Event outcomes and scores per skill category, across every case.
///
/// Sorted by success rate, highest first. Scores that do not parse as numbers
/// are skipped.
pub fn compute_skill_category_stats(cases_with_events: &[CaseWithEvents]) -> Vec<SkillCategoryStat> {
    let mut index: HashMap<&str, usize> = HashMap::new();
    let mut stats: Vec<SkillCategoryStat> = Vec::new();

    for event in cases_with_events.iter().flat_map(|entry| entry.events.iter()) {
        let category = event
            .skill_category
            .as_deref()
            .filter(|name| !name.is_empty())
            .unwrap_or(UNCATEGORIZED);
        let slot = *index.entry(category).or_insert_with(|| {
            stats.push(SkillCategoryStat {
                category: category.to_string(),
                total_events: 0,
                completed: 0,
                passed: 0,
                failed: 0,
                scores: Vec::new(),
                avg_score: 0.0,
                success_rate: 0.0,
            });
            stats.len() - 1
        });

        let entry = &mut stats[slot];
        entry.total_events += 1;
        match event.outcome() {
            EventOutcome::Completed => entry.completed += 1,
            EventOutcome::Passed => entry.passed += 1,
            EventOutcome::Failed => entry.failed += 1,
            EventOutcome::Other => {}
        }
        if let Some(score) = event.numeric_score() {
            entry.scores.push(score);
        }
    }

    for entry in stats.iter_mut() {
        entry.avg_score = safe_ratio(entry.scores.iter().sum(), entry.scores.len() as f64);
        entry.success_rate = percentage(entry.completed + entry.passed, entry.total_events);
    }

    stats.sort_by(|a, b| b.success_rate.total_cmp(&a.success_rate));
    debug!(categories = stats.len(), "computed skill category stats");
    stats
}
