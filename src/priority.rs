use tracing::debug;

use crate::models::{
    CaseWithEvents, Occupation, PriorityEntry, Quadrant, RiskBand, RiskEntry, SocCode,
};

const EASE_BASE: i64 = 20;
const EASE_MULTIPLIER: i64 = 17;
const EASE_SPAN: i64 = 60;
const RISK_WEIGHT: f64 = 0.6;
const EASE_WEIGHT: f64 = 0.4;
const RISK_THRESHOLD: f64 = 0.5;
const EASE_THRESHOLD: f64 = 50.0;

pub const DEFAULT_TOP_ROLES: usize = 10;

/// Placeholder ease-of-reskilling figure in `[20, 79]` derived from the SOC
/// code.
pub fn reskilling_ease(soc_code: SocCode) -> i64 {
    EASE_BASE + (soc_code.rem_euclid(EASE_SPAN) * EASE_MULTIPLIER).rem_euclid(EASE_SPAN)
}

pub fn quadrant(automation_probability: f64, ease: f64) -> Quadrant {
    let at_risk = automation_probability > RISK_THRESHOLD;
    let easy = ease > EASE_THRESHOLD;
    match (at_risk, easy) {
        (true, true) => Quadrant::High,
        (true, false) => Quadrant::Medium,
        (false, true) => Quadrant::Low,
        (false, false) => Quadrant::Lowest,
    }
}

/// Scores every occupation with a known automation probability, highest
/// priority first.
///
/// Training history does not feed the score yet; the cases are accepted so
/// callers pass the same snapshot to every derivation.
pub fn compute_prioritization(
    occupations: &[Occupation],
    _cases_with_events: &[CaseWithEvents],
) -> Vec<PriorityEntry> {
    let mut entries: Vec<PriorityEntry> = occupations
        .iter()
        .filter_map(|occupation| {
            let probability = occupation.automation_probability?;
            let ease = reskilling_ease(occupation.soc_code) as f64;
            let automation_risk = probability * 100.0;
            Some(PriorityEntry {
                soc_code: occupation.soc_code,
                name: occupation.display_name(),
                automation_risk,
                reskilling_ease: ease,
                priority_score: automation_risk * RISK_WEIGHT + ease * EASE_WEIGHT,
                quadrant: quadrant(probability, ease),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.priority_score.total_cmp(&a.priority_score));
    debug!(
        scored = entries.len(),
        skipped = occupations.len() - entries.len(),
        "computed role prioritization"
    );
    entries
}

/// First `limit` entries in the High Priority quadrant.
pub fn top_priority_roles(entries: &[PriorityEntry], limit: usize) -> Vec<&PriorityEntry> {
    entries
        .iter()
        .filter(|entry| entry.quadrant == Quadrant::High)
        .take(limit)
        .collect()
}

pub fn risk_band(risk_percent: f64) -> RiskBand {
    if risk_percent > 70.0 {
        RiskBand::High
    } else if risk_percent > 40.0 {
        RiskBand::Medium
    } else {
        RiskBand::Low
    }
}

/// Occupations most exposed to automation.
pub fn top_risk_occupations(occupations: &[Occupation], limit: usize) -> Vec<RiskEntry> {
    let mut entries: Vec<RiskEntry> = occupations
        .iter()
        .filter_map(|occupation| {
            let risk = occupation.automation_probability? * 100.0;
            Some(RiskEntry {
                soc_code: occupation.soc_code,
                name: occupation.display_name(),
                risk,
                band: risk_band(risk),
            })
        })
        .collect();

    entries.sort_by(|a, b| b.risk.total_cmp(&a.risk));
    entries.truncate(limit);
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn occupation(soc_code: SocCode, probability: Option<f64>) -> Occupation {
        Occupation {
            soc_code,
            job_title: Some(format!("Role {soc_code}")),
            automation_probability: probability,
        }
    }

    #[test]
    fn scores_a_medium_priority_role() {
        let entries = compute_prioritization(&[occupation(100, Some(0.8))], &[]);
        assert_eq!(entries.len(), 1);
        let entry = &entries[0];
        assert_eq!(entry.reskilling_ease, 40.0);
        assert!((entry.automation_risk - 80.0).abs() < 1e-9);
        assert!((entry.priority_score - 64.0).abs() < 1e-9);
        assert_eq!(entry.quadrant, Quadrant::Medium);
        assert_eq!(entry.quadrant.label(), "Medium Priority");
    }

    #[test]
    fn occupations_without_probability_are_excluded() {
        let entries = compute_prioritization(
            &[occupation(7, None), occupation(100, Some(0.0))],
            &[],
        );
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].soc_code, 100);
        assert_eq!(entries[0].quadrant, Quadrant::Lowest);
    }

    #[test]
    fn zero_probability_with_easy_reskilling_is_low_priority() {
        // soc 101 -> ease 57
        let entries = compute_prioritization(&[occupation(101, Some(0.0))], &[]);
        assert_eq!(entries[0].reskilling_ease, 57.0);
        assert_eq!(entries[0].quadrant, Quadrant::Low);
    }

    #[test]
    fn quadrants_split_on_thresholds() {
        assert_eq!(quadrant(0.9, 60.0), Quadrant::High);
        assert_eq!(quadrant(0.9, 50.0), Quadrant::Medium);
        assert_eq!(quadrant(0.5, 51.0), Quadrant::Low);
        assert_eq!(quadrant(0.5, 50.0), Quadrant::Lowest);
    }

    #[test]
    fn results_sorted_by_priority_score() {
        let input: Vec<Occupation> = (1..30)
            .map(|code| occupation(code, Some((code % 10) as f64 / 10.0)))
            .collect();
        let entries = compute_prioritization(&input, &[]);
        assert!(entries
            .windows(2)
            .all(|pair| pair[0].priority_score >= pair[1].priority_score));
    }

    #[test]
    fn top_priority_roles_takes_only_high_quadrant() {
        // soc 2 -> ease 54, soc 100 -> ease 40
        let input = vec![
            occupation(2, Some(0.9)),
            occupation(100, Some(0.99)),
            occupation(3, Some(0.7)),
        ];
        let entries = compute_prioritization(&input, &[]);
        let top = top_priority_roles(&entries, 10);
        assert!(top.iter().all(|entry| entry.quadrant == Quadrant::High));
        assert!(top.iter().all(|entry| entry.soc_code != 100));
        assert_eq!(top_priority_roles(&entries, 1).len(), 1);
    }

    #[test]
    fn risk_leaderboard_orders_and_bands() {
        let input = vec![
            occupation(1, Some(0.3)),
            occupation(2, Some(0.95)),
            occupation(3, None),
            Occupation {
                soc_code: 4,
                job_title: None,
                automation_probability: Some(0.5),
            },
        ];
        let leaders = top_risk_occupations(&input, 2);
        assert_eq!(leaders.len(), 2);
        assert_eq!(leaders[0].soc_code, 2);
        assert_eq!(leaders[0].band, RiskBand::High);
        assert_eq!(leaders[1].name, "Occupation 4");
        assert_eq!(leaders[1].band, RiskBand::Medium);
    }

    proptest! {
        #[test]
        fn ease_stays_in_range(soc_code in any::<i64>()) {
            let ease = reskilling_ease(soc_code);
            prop_assert!((20..=79).contains(&ease));
        }

        #[test]
        fn prioritization_is_deterministic(
            rows in prop::collection::vec((0i64..1_000_000, 0.0f64..=1.0), 0..50)
        ) {
            let input: Vec<Occupation> = rows
                .iter()
                .map(|(code, p)| occupation(*code, Some(*p)))
                .collect();
            let first = compute_prioritization(&input, &[]);
            let second = compute_prioritization(&input, &[]);
            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(second.iter()) {
                prop_assert_eq!(a.priority_score.to_bits(), b.priority_score.to_bits());
                prop_assert_eq!(a.quadrant, b.quadrant);
            }
        }
    }
}
