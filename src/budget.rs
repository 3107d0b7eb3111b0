use std::collections::HashMap;

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::models::{
    BudgetComparison, CaseWithEvents, CurrentBudget, Occupation, OptimizedBudget,
    ProgramAllocation, ProgramSpending,
};
use crate::rates::safe_ratio;

pub const DEFAULT_BUDGET_CUT: f64 = 30.0;
pub const MIN_BUDGET_CUT: f64 = 10.0;
pub const MAX_BUDGET_CUT: f64 = 50.0;

const BASE_COST: u64 = 1000;
const COST_STEP: u64 = 1000;
const COST_MODULUS: u64 = 4001;
const COST_NORMALIZER: f64 = 1000.0;
const ROI_AMPLIFICATION: f64 = 1.5;
const INSIGHT_COUNT: usize = 3;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetModel {
    pub current: CurrentBudget,
    /// Absent when no programs or no occupations were loaded.
    pub optimized: Option<OptimizedBudget>,
    pub comparison: Vec<BudgetComparison>,
}

/// Synthetic unit cost for the program discovered at `index`.
pub fn cost_per_participant(index: usize) -> f64 {
    (BASE_COST + (index as u64 * COST_STEP) % COST_MODULUS) as f64
}

/// Distinct programs in first-seen order with their synthetic unit cost.
pub fn program_costs(cases_with_events: &[CaseWithEvents]) -> Vec<(String, f64)> {
    let mut seen: Vec<&str> = Vec::new();
    for entry in cases_with_events {
        if let Some(program) = entry.case.program() {
            if !seen.contains(&program) {
                seen.push(program);
            }
        }
    }

    seen.into_iter()
        .enumerate()
        .map(|(index, program)| (program.to_string(), cost_per_participant(index)))
        .collect()
}

#[derive(Debug, Default, Clone, Copy)]
struct Enrollment {
    participants: usize,
    certified: usize,
}

fn enrollments(cases_with_events: &[CaseWithEvents]) -> HashMap<&str, Enrollment> {
    let mut map: HashMap<&str, Enrollment> = HashMap::new();
    for entry in cases_with_events {
        let Some(program) = entry.case.program() else {
            continue;
        };
        let enrollment = map.entry(program).or_default();
        enrollment.participants += 1;
        if entry.case.is_certified() {
            enrollment.certified += 1;
        }
    }
    map
}

/// Current spend per program, most expensive first.
pub fn compute_current_budget(cases_with_events: &[CaseWithEvents]) -> CurrentBudget {
    let counts = enrollments(cases_with_events);

    let mut program_spending: Vec<ProgramSpending> = program_costs(cases_with_events)
        .into_iter()
        .map(|(program, cost)| {
            let participants = counts
                .get(program.as_str())
                .map_or(0, |enrollment| enrollment.participants);
            ProgramSpending {
                program,
                participants,
                cost_per_participant: cost,
                total_cost: cost * participants as f64,
                percent_of_budget: 0.0,
            }
        })
        .collect();

    let total_budget: f64 = program_spending.iter().map(|item| item.total_cost).sum();
    let total_participants = program_spending.iter().map(|item| item.participants).sum();

    for item in program_spending.iter_mut() {
        item.percent_of_budget = safe_ratio(item.total_cost, total_budget) * 100.0;
    }
    program_spending.sort_by(|a, b| b.total_cost.total_cmp(&a.total_cost));

    CurrentBudget {
        program_spending,
        total_budget,
        total_participants,
    }
}

/// Reallocates a cut budget across programs in proportion to their ROI.
///
/// Each program receives at most its current spend. Money freed by that cap
/// is not handed to other programs, so the new budget can be left partly
/// unspent.
pub fn optimize_budget(
    cases_with_events: &[CaseWithEvents],
    current: &CurrentBudget,
    cut_percentage: f64,
) -> OptimizedBudget {
    let cut = cut_percentage.clamp(0.0, 100.0);
    let new_total_budget = current.total_budget * (1.0 - cut / 100.0);
    let counts = enrollments(cases_with_events);

    let mut ranked: Vec<(ProgramSpending, f64, f64)> = current
        .program_spending
        .iter()
        .map(|item| {
            let success = counts
                .get(item.program.as_str())
                .map_or(0.0, |enrollment| {
                    safe_ratio(enrollment.certified as f64, enrollment.participants as f64)
                });
            let roi = safe_ratio(success, item.cost_per_participant / COST_NORMALIZER);
            (item.clone(), success, roi)
        })
        .collect();
    ranked.sort_by(|a, b| b.2.total_cmp(&a.2));

    let roi_total: f64 = ranked.iter().map(|(_, _, roi)| roi).sum();
    let mut remaining_budget = new_total_budget;

    let mut program_allocation: Vec<ProgramAllocation> = ranked
        .into_iter()
        .map(|(item, success, roi)| {
            let proportional = new_total_budget * safe_ratio(roi, roi_total) * ROI_AMPLIFICATION;
            let new_budget = item.total_cost.min(proportional);
            if proportional > item.total_cost {
                warn!(program = %item.program, "allocation capped at current spend");
            }
            remaining_budget -= new_budget;

            let new_participants = safe_ratio(new_budget, item.cost_per_participant).floor() as usize;
            ProgramAllocation {
                success_rate: success * 100.0,
                roi,
                new_budget,
                new_participants,
                change: safe_ratio(new_budget - item.total_cost, item.total_cost) * 100.0,
                new_percent_of_budget: safe_ratio(new_budget, new_total_budget) * 100.0,
                program: item.program,
                participants: item.participants,
                cost_per_participant: item.cost_per_participant,
                total_cost: item.total_cost,
                percent_of_budget: item.percent_of_budget,
            }
        })
        .collect();
    program_allocation.sort_by(|a, b| b.new_budget.total_cmp(&a.new_budget));

    let total_participants_remaining: usize = program_allocation
        .iter()
        .map(|allocation| allocation.new_participants)
        .sum();
    let total_participants_reduction = current
        .total_participants
        .saturating_sub(total_participants_remaining);

    OptimizedBudget {
        program_allocation,
        new_total_budget,
        remaining_budget,
        total_participants_reduction,
        total_participants_remaining,
        percent_reduction: safe_ratio(
            total_participants_reduction as f64,
            current.total_participants as f64,
        ) * 100.0,
    }
}

/// Current spend next to the optimized allocation, in current-spend order.
pub fn compare_budgets(current: &CurrentBudget, optimized: &OptimizedBudget) -> Vec<BudgetComparison> {
    current
        .program_spending
        .iter()
        .map(|item| {
            let matched = optimized
                .program_allocation
                .iter()
                .find(|allocation| allocation.program == item.program);
            match matched {
                Some(allocation) => BudgetComparison {
                    program: item.program.clone(),
                    current: item.total_cost,
                    optimized: allocation.new_budget,
                    change: safe_ratio(allocation.new_budget - item.total_cost, item.total_cost)
                        * 100.0,
                },
                None => BudgetComparison {
                    program: item.program.clone(),
                    current: item.total_cost,
                    optimized: 0.0,
                    change: -100.0,
                },
            }
        })
        .collect()
}

pub fn compute_budget_model(
    cases_with_events: &[CaseWithEvents],
    occupations: &[Occupation],
    cut_percentage: f64,
) -> BudgetModel {
    let current = compute_current_budget(cases_with_events);

    if current.program_spending.is_empty() || occupations.is_empty() {
        debug!(
            programs = current.program_spending.len(),
            occupations = occupations.len(),
            "skipping budget optimization"
        );
        return BudgetModel {
            current,
            optimized: None,
            comparison: Vec::new(),
        };
    }

    let optimized = optimize_budget(cases_with_events, &current, cut_percentage);
    let comparison = compare_budgets(&current, &optimized);
    info!(
        cut_percentage,
        new_total_budget = optimized.new_total_budget,
        participants_remaining = optimized.total_participants_remaining,
        "optimized training budget"
    );

    BudgetModel {
        current,
        optimized: Some(optimized),
        comparison,
    }
}

impl OptimizedBudget {
    /// Best funded programs after the cut.
    pub fn programs_to_prioritize(&self) -> Vec<&ProgramAllocation> {
        self.program_allocation.iter().take(INSIGHT_COUNT).collect()
    }

    /// Least funded programs after the cut, lowest first.
    pub fn programs_to_reduce(&self) -> Vec<&ProgramAllocation> {
        self.program_allocation
            .iter()
            .rev()
            .take(INSIGHT_COUNT)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Case;
    use proptest::prelude::*;

    fn case(case_id: i64, program: &str, certified: bool) -> CaseWithEvents {
        CaseWithEvents {
            case: Case {
                case_id,
                training_program: Some(program.to_string()),
                certification_earned: Some(certified),
                ..Case::default()
            },
            events: Vec::new(),
        }
    }

    fn occupation() -> Vec<Occupation> {
        vec![Occupation {
            soc_code: 100,
            job_title: Some("Data Entry Keyer".to_string()),
            automation_probability: Some(0.9),
        }]
    }

    /// A: 10 cases at 1000, 2 certified. B: 5 cases at 2000, all certified.
    fn two_programs() -> Vec<CaseWithEvents> {
        let mut input: Vec<CaseWithEvents> = (0..10).map(|id| case(id, "A", id < 2)).collect();
        input.extend((10..15).map(|id| case(id, "B", true)));
        input
    }

    #[test]
    fn costs_follow_discovery_order() {
        let input = vec![case(1, "A", false), case(2, "B", false), case(3, "A", true)];
        let costs = program_costs(&input);
        assert_eq!(costs, vec![("A".to_string(), 1000.0), ("B".to_string(), 2000.0)]);
    }

    #[test]
    fn unit_costs_wrap_within_range() {
        assert_eq!(cost_per_participant(4), 5000.0);
        assert_eq!(cost_per_participant(5), 1999.0);
        for index in 0..50 {
            let cost = cost_per_participant(index);
            assert!((1000.0..=5000.0).contains(&cost));
        }
    }

    #[test]
    fn current_budget_sums_spend() {
        let current = compute_current_budget(&two_programs());
        assert_eq!(current.total_budget, 20000.0);
        assert_eq!(current.total_participants, 15);
        assert_eq!(current.program_spending[0].program, "A");
        assert_eq!(current.program_spending[0].percent_of_budget, 50.0);
    }

    #[test]
    fn optimization_weights_by_roi_and_caps_at_current_spend() {
        let model = compute_budget_model(&two_programs(), &occupation(), 50.0);
        let optimized = model.optimized.expect("optimized budget");

        assert_eq!(optimized.new_total_budget, 10000.0);
        let b = &optimized.program_allocation[0];
        assert_eq!(b.program, "B");
        assert_eq!(b.success_rate, 100.0);
        assert!((b.roi - 0.5).abs() < 1e-12);
        assert_eq!(b.new_budget, 10000.0);
        assert_eq!(b.new_participants, 5);
        assert_eq!(b.change, 0.0);

        let a = &optimized.program_allocation[1];
        assert!((a.roi - 0.2).abs() < 1e-12);
        let expected = 10000.0 * (0.2 / 0.7) * 1.5;
        assert!((a.new_budget - expected).abs() < 1e-6);
        assert_eq!(a.new_participants, 4);
        assert!((a.change - (expected - 10000.0) / 100.0).abs() < 1e-6);

        assert_eq!(optimized.total_participants_remaining, 9);
        assert_eq!(optimized.total_participants_reduction, 6);
        assert!((optimized.percent_reduction - 40.0).abs() < 1e-9);
        assert!((optimized.remaining_budget - (10000.0 - 10000.0 - expected)).abs() < 1e-6);
    }

    #[test]
    fn comparison_rows_follow_current_order() {
        let model = compute_budget_model(&two_programs(), &occupation(), 50.0);
        let programs: Vec<&str> = model.comparison.iter().map(|row| row.program.as_str()).collect();
        assert_eq!(programs, vec!["A", "B"]);
        assert_eq!(model.comparison[1].change, 0.0);
        assert_eq!(model.comparison[0].current, 10000.0);
    }

    #[test]
    fn zero_roi_everywhere_allocates_nothing() {
        let input = vec![case(1, "A", false), case(2, "B", false)];
        let optimized = compute_budget_model(&input, &occupation(), 30.0)
            .optimized
            .expect("optimized budget");

        assert!(optimized
            .program_allocation
            .iter()
            .all(|allocation| allocation.new_budget == 0.0 && allocation.change == -100.0));
        assert_eq!(optimized.percent_reduction, 100.0);
    }

    #[test]
    fn insights_split_best_and_worst_funded() {
        let input: Vec<CaseWithEvents> = ["A", "B", "C", "D"]
            .iter()
            .enumerate()
            .map(|(idx, program)| case(idx as i64, program, true))
            .collect();
        let optimized = compute_budget_model(&input, &occupation(), 30.0)
            .optimized
            .expect("optimized budget");

        assert_eq!(optimized.programs_to_prioritize().len(), 3);
        let reduce = optimized.programs_to_reduce();
        assert_eq!(reduce.len(), 3);
        assert_eq!(
            reduce[0].program,
            optimized.program_allocation[3].program
        );
    }

    #[test]
    fn missing_programs_or_occupations_skip_optimization() {
        assert!(compute_budget_model(&[], &occupation(), 30.0).optimized.is_none());

        let model = compute_budget_model(&two_programs(), &[], 30.0);
        assert!(model.optimized.is_none());
        assert!(model.comparison.is_empty());
        assert_eq!(model.current.total_budget, 20000.0);
    }

    proptest! {
        #[test]
        fn allocations_never_exceed_caps(
            rows in prop::collection::vec((0u8..5, any::<bool>()), 1..60),
            cut in 10u32..=50
        ) {
            let names = ["A", "B", "C", "D", "E"];
            let input: Vec<CaseWithEvents> = rows
                .iter()
                .enumerate()
                .map(|(idx, (program, certified))| case(idx as i64, names[*program as usize], *certified))
                .collect();

            let optimized = compute_budget_model(&input, &occupation(), cut as f64)
                .optimized
                .expect("optimized budget");
            let roi_total: f64 = optimized.program_allocation.iter().map(|a| a.roi).sum();

            for allocation in &optimized.program_allocation {
                prop_assert!(allocation.new_budget <= allocation.total_cost);
                let share = if roi_total == 0.0 { 0.0 } else { allocation.roi / roi_total };
                prop_assert!(allocation.new_budget <= optimized.new_total_budget * share * 1.5 + 1e-6);
                prop_assert!(allocation.new_participants <= allocation.participants);
            }
        }
    }
}
