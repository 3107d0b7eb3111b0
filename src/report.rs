use std::fmt::Write;

use serde::Serialize;

use crate::budget::{compute_budget_model, BudgetModel};
use crate::effectiveness::{compute_program_effectiveness, compute_success_factors};
use crate::join::join_cases_with_events;
use crate::loader::Dataset;
use crate::models::{EffectivenessSummary, PriorityEntry, RiskEntry, SkillCategoryStat, SuccessFactor};
use crate::priority::{compute_prioritization, top_risk_occupations, DEFAULT_TOP_ROLES};
use crate::skills::compute_skill_category_stats;

/// Every derivation computed from one dataset snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct DashboardSnapshot {
    pub budget_cut_percentage: f64,
    pub effectiveness: EffectivenessSummary,
    pub success_factors: Vec<SuccessFactor>,
    pub skill_categories: Vec<SkillCategoryStat>,
    pub budget: BudgetModel,
    pub prioritization: Vec<PriorityEntry>,
    pub top_risk: Vec<RiskEntry>,
}

pub fn build_snapshot(dataset: &Dataset, budget_cut_percentage: f64) -> DashboardSnapshot {
    let cases_with_events = join_cases_with_events(&dataset.cases, &dataset.events);

    DashboardSnapshot {
        budget_cut_percentage,
        effectiveness: compute_program_effectiveness(&cases_with_events),
        success_factors: compute_success_factors(&cases_with_events),
        skill_categories: compute_skill_category_stats(&cases_with_events),
        budget: compute_budget_model(&cases_with_events, &dataset.occupations, budget_cut_percentage),
        prioritization: compute_prioritization(&dataset.occupations, &cases_with_events),
        top_risk: top_risk_occupations(&dataset.occupations, DEFAULT_TOP_ROLES),
    }
}

pub fn build_report(snapshot: &DashboardSnapshot) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Workforce Reskilling Report");
    let _ = writeln!(
        output,
        "Generated for {} training cases with a {}% budget cut scenario",
        snapshot.effectiveness.total_cases, snapshot.budget_cut_percentage
    );

    write_effectiveness(&mut output, &snapshot.effectiveness);
    write_skills(&mut output, &snapshot.skill_categories);
    write_budget(&mut output, snapshot.budget_cut_percentage, &snapshot.budget);
    write_priorities(&mut output, &snapshot.prioritization);

    let _ = writeln!(output);
    let _ = writeln!(output, "## Highest Automation Risk");
    if snapshot.top_risk.is_empty() {
        let _ = writeln!(output, "No occupations with automation risk data.");
    } else {
        for entry in &snapshot.top_risk {
            let _ = writeln!(output, "- {}: {:.1}%", entry.name, entry.risk);
        }
    }

    output
}

fn write_effectiveness(output: &mut String, summary: &EffectivenessSummary) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Training Program Effectiveness");
    let _ = writeln!(
        output,
        "Overall completion {:.1}%, certification {:.1}%, event success {:.1}%",
        summary.completion_rate, summary.certification_rate, summary.success_rate
    );

    if summary.programs.is_empty() {
        let _ = writeln!(output, "No training programs recorded.");
        return;
    }

    for program in &summary.programs {
        let _ = writeln!(
            output,
            "- {}: {} cases, completion {:.1}%, certification {:.1}%, event success {:.1}%",
            program.program,
            program.total_cases,
            program.completion_rate,
            program.certification_rate,
            program.success_rate
        );
    }
}

fn write_skills(output: &mut String, skills: &[SkillCategoryStat]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Skill Categories");

    if skills.is_empty() {
        let _ = writeln!(output, "No training events recorded.");
        return;
    }

    for skill in skills {
        let _ = writeln!(
            output,
            "- {}: {} events, success {:.1}% (avg score {:.1})",
            skill.category, skill.total_events, skill.success_rate, skill.avg_score
        );
    }
}

fn write_budget(output: &mut String, cut: f64, budget: &BudgetModel) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Budget Impact");
    let _ = writeln!(
        output,
        "Current spend {:.0} across {} participants",
        budget.current.total_budget, budget.current.total_participants
    );

    let Some(optimized) = budget.optimized.as_ref() else {
        let _ = writeln!(output, "Not enough data to model a budget cut.");
        return;
    };

    let _ = writeln!(
        output,
        "A {}% cut ({:.0} remaining) reduces capacity by {:.1}%, affecting {} participants.",
        cut,
        optimized.new_total_budget,
        optimized.percent_reduction,
        optimized.total_participants_reduction
    );

    for allocation in &optimized.program_allocation {
        let _ = writeln!(
            output,
            "- {}: {:.0} -> {:.0} ({:+.1}%), {} -> {} participants, ROI {:.2}",
            allocation.program,
            allocation.total_cost,
            allocation.new_budget,
            allocation.change,
            allocation.participants,
            allocation.new_participants,
            allocation.roi
        );
    }

    let prioritize: Vec<&str> = optimized
        .programs_to_prioritize()
        .iter()
        .map(|allocation| allocation.program.as_str())
        .collect();
    let reduce: Vec<&str> = optimized
        .programs_to_reduce()
        .iter()
        .map(|allocation| allocation.program.as_str())
        .collect();
    let _ = writeln!(output, "Programs to prioritize: {}", prioritize.join(", "));
    let _ = writeln!(output, "Programs to reduce: {}", reduce.join(", "));
}

fn write_priorities(output: &mut String, entries: &[PriorityEntry]) {
    let _ = writeln!(output);
    let _ = writeln!(output, "## Roles To Prioritize");

    if entries.is_empty() {
        let _ = writeln!(output, "No occupations with automation risk data.");
        return;
    }

    for entry in entries.iter().take(DEFAULT_TOP_ROLES) {
        let _ = writeln!(
            output,
            "- {} [{}]: score {:.1} (risk {:.1}%, ease {:.0}%)",
            entry.name,
            entry.quadrant.label(),
            entry.priority_score,
            entry.automation_risk,
            entry.reskilling_ease
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Case, Event, Occupation, RecordedDate};
    use chrono::NaiveDate;

    fn dataset() -> Dataset {
        Dataset {
            occupations: vec![Occupation {
                soc_code: 100,
                job_title: Some("Bookkeeping Clerk".to_string()),
                automation_probability: Some(0.8),
            }],
            cases: vec![
                Case {
                    case_id: 1,
                    training_program: Some("Data Analytics".to_string()),
                    certification_earned: Some(true),
                    completion_date: NaiveDate::from_ymd_opt(2023, 1, 1).map(RecordedDate::from),
                    ..Case::default()
                },
                Case {
                    case_id: 2,
                    training_program: Some("Cloud Basics".to_string()),
                    certification_earned: Some(false),
                    ..Case::default()
                },
            ],
            events: vec![Event {
                event_id: 1,
                case_id: Some(1),
                completion_status: Some("passed".to_string()),
                score: Some("88".to_string()),
                skill_category: Some("Analytics".to_string()),
                ..Event::default()
            }],
        }
    }

    #[test]
    fn snapshot_runs_every_derivation() {
        let snapshot = build_snapshot(&dataset(), 30.0);
        assert_eq!(snapshot.effectiveness.programs.len(), 2);
        assert_eq!(snapshot.skill_categories.len(), 1);
        assert!(snapshot.budget.optimized.is_some());
        assert_eq!(snapshot.prioritization.len(), 1);
        assert_eq!(snapshot.top_risk.len(), 1);
    }

    #[test]
    fn report_lists_sections() {
        let report = build_report(&build_snapshot(&dataset(), 30.0));
        assert!(report.starts_with("# Workforce Reskilling Report"));
        assert!(report.contains("## Training Program Effectiveness"));
        assert!(report.contains("- Analytics: 1 events, success 100.0% (avg score 88.0)"));
        assert!(report.contains("A 30% cut"));
        assert!(report.contains("Bookkeeping Clerk [Medium Priority]: score 64.0"));
    }

    #[test]
    fn empty_dataset_reports_gracefully() {
        let report = build_report(&build_snapshot(&Dataset::default(), 30.0));
        assert!(report.contains("No training programs recorded."));
        assert!(report.contains("Not enough data to model a budget cut."));
        assert!(report.contains("No training events recorded."));
    }

    #[test]
    fn snapshot_serializes_quadrant_labels() {
        let json = serde_json::to_value(build_snapshot(&dataset(), 30.0)).expect("serializes");
        assert_eq!(json["prioritization"][0]["quadrant"], "Medium Priority");
        assert_eq!(json["budget"]["current"]["total_participants"], 2);
    }
}
