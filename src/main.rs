use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand, ValueEnum};
use sqlx::PgPool;
use tracing::info;

use reskilling_insights::budget::compute_budget_model;
use reskilling_insights::config::{parse_budget_cut, AppConfig};
use reskilling_insights::db;
use reskilling_insights::effectiveness::{compute_program_effectiveness, compute_success_factors};
use reskilling_insights::join::{events_for_case, join_cases_with_events};
use reskilling_insights::loader::Dataset;
use reskilling_insights::models::{CaseId, Event};
use reskilling_insights::priority::{compute_prioritization, top_priority_roles, top_risk_occupations};
use reskilling_insights::report;
use reskilling_insights::skills::compute_skill_category_stats;
use reskilling_insights::telemetry;

#[derive(Parser)]
#[command(name = "reskilling-insights")]
#[command(about = "Workforce reskilling analytics over occupations, training cases and events", long_about = None)]
struct Cli {
    /// Read occupations.csv, cases.csv and events.csv from this directory instead of Postgres
    #[arg(long, global = true)]
    csv_dir: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Completion, certification and event success per training program
    Effectiveness,
    /// Event outcomes and scores per skill category
    Skills,
    /// Completion and certification rates per program, including unknown programs
    SuccessFactors,
    /// Model a budget cut and the ROI-weighted reallocation
    Budget {
        /// Budget cut percentage (10-50)
        #[arg(long, value_parser = parse_cut)]
        cut: Option<f64>,
    },
    /// Rank occupations by automation risk and reskilling ease
    Prioritize {
        #[arg(long, default_value_t = 10)]
        limit: usize,
        /// Only list roles in the High Priority quadrant
        #[arg(long)]
        high_only: bool,
    },
    /// Occupations most exposed to automation
    Risk {
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Events recorded for one training case
    Case {
        #[arg(long)]
        id: CaseId,
    },
    /// Write every derivation as a markdown or JSON report
    Report {
        #[arg(long, value_parser = parse_cut)]
        cut: Option<f64>,
        #[arg(long, value_enum, default_value_t = ReportFormat::Markdown)]
        format: ReportFormat,
        /// Output file; prints to stdout when omitted
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum ReportFormat {
    Markdown,
    Json,
}

fn parse_cut(raw: &str) -> Result<f64, String> {
    parse_budget_cut(raw).ok_or_else(|| format!("'{raw}' is not a budget cut between 10 and 50"))
}

async fn connect_pool(config: &AppConfig) -> anyhow::Result<PgPool> {
    let database_url = config
        .database_url
        .as_deref()
        .context("DATABASE_URL must be set when --csv-dir is not given")?;
    db::connect(database_url, config.max_connections).await
}

async fn load_dataset(cli: &Cli, config: &AppConfig) -> anyhow::Result<Dataset> {
    if let Some(dir) = cli.csv_dir.as_deref() {
        info!(dir = %dir.display(), "loading CSV snapshot");
        return Dataset::from_csv_dir(dir);
    }

    let pool = connect_pool(config).await?;
    db::fetch_dataset(&pool).await
}

async fn load_case_events(cli: &Cli, config: &AppConfig, case_id: CaseId) -> anyhow::Result<Vec<Event>> {
    if let Some(dir) = cli.csv_dir.as_deref() {
        let dataset = Dataset::from_csv_dir(dir)?;
        return Ok(events_for_case(&dataset.events, case_id));
    }

    let pool = connect_pool(config).await?;
    db::fetch_events_for_case(&pool, case_id).await
}

fn print_case_events(case_id: CaseId, events: &[Event]) {
    if events.is_empty() {
        println!("No events recorded for case {case_id}.");
        return;
    }

    println!("Case {case_id}: {} events", events.len());
    for event in events {
        println!(
            "- #{} {} [{}] by {}, status {}, score {}, at {}",
            event.event_id,
            event.activity.as_deref().unwrap_or("-"),
            event.skill_category.as_deref().unwrap_or("Uncategorized"),
            event.actor.as_deref().unwrap_or("-"),
            event.completion_status.as_deref().unwrap_or("-"),
            event.score.as_deref().unwrap_or("-"),
            event.timestamp.as_deref().unwrap_or("-")
        );
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load()?;
    telemetry::init(&config.log_level)?;

    if let Commands::Case { id } = cli.command {
        let events = load_case_events(&cli, &config, id).await?;
        print_case_events(id, &events);
        return Ok(());
    }

    let dataset = load_dataset(&cli, &config).await?;
    let cases_with_events = join_cases_with_events(&dataset.cases, &dataset.events);

    match cli.command {
        Commands::Effectiveness => {
            let summary = compute_program_effectiveness(&cases_with_events);
            println!(
                "Overall: {} cases, completion {:.1}%, certification {:.1}%, event success {:.1}%",
                summary.total_cases,
                summary.completion_rate,
                summary.certification_rate,
                summary.success_rate
            );
            for program in &summary.programs {
                println!(
                    "- {} ({} cases): completion {:.1}%, certification {:.1}%, event success {:.1}% of {} events",
                    program.program,
                    program.total_cases,
                    program.completion_rate,
                    program.certification_rate,
                    program.success_rate,
                    program.total_events
                );
            }
        }
        Commands::Skills => {
            let stats = compute_skill_category_stats(&cases_with_events);
            if stats.is_empty() {
                println!("No training events found.");
                return Ok(());
            }
            for skill in &stats {
                println!(
                    "- {}: {} events ({} completed, {} passed, {} failed), success {:.1}%, avg score {:.1}",
                    skill.category,
                    skill.total_events,
                    skill.completed,
                    skill.passed,
                    skill.failed,
                    skill.success_rate,
                    skill.avg_score
                );
            }
        }
        Commands::SuccessFactors => {
            for factor in compute_success_factors(&cases_with_events) {
                println!(
                    "- {}: completion {:.1}%, certification {:.1}%",
                    factor.factor, factor.success_rate, factor.certification_rate
                );
            }
        }
        Commands::Budget { cut } => {
            let cut = cut.unwrap_or(config.budget_cut);
            let model = compute_budget_model(&cases_with_events, &dataset.occupations, cut);
            println!(
                "Current spend {:.0} across {} participants",
                model.current.total_budget, model.current.total_participants
            );
            for item in &model.current.program_spending {
                println!(
                    "- {}: {} x {:.0} = {:.0} ({:.1}% of budget)",
                    item.program,
                    item.participants,
                    item.cost_per_participant,
                    item.total_cost,
                    item.percent_of_budget
                );
            }

            let Some(optimized) = model.optimized else {
                println!("Not enough data to model a budget cut.");
                return Ok(());
            };

            println!(
                "\nAfter a {cut}% cut: {:.0} budget, {} participants ({} fewer, {:.1}% reduction)",
                optimized.new_total_budget,
                optimized.total_participants_remaining,
                optimized.total_participants_reduction,
                optimized.percent_reduction
            );
            for allocation in &optimized.program_allocation {
                println!(
                    "- {}: ROI {:.2}, {:.0} -> {:.0} ({:+.1}%), capacity {} -> {}",
                    allocation.program,
                    allocation.roi,
                    allocation.total_cost,
                    allocation.new_budget,
                    allocation.change,
                    allocation.participants,
                    allocation.new_participants
                );
            }
        }
        Commands::Prioritize { limit, high_only } => {
            let entries = compute_prioritization(&dataset.occupations, &cases_with_events);
            let selected: Vec<_> = if high_only {
                top_priority_roles(&entries, limit)
            } else {
                entries.iter().take(limit).collect()
            };

            if selected.is_empty() {
                println!("No occupations to prioritize.");
                return Ok(());
            }
            for entry in selected {
                println!(
                    "- {} [{}]: score {:.1}, risk {:.1}%, ease {:.0}%",
                    entry.name,
                    entry.quadrant.label(),
                    entry.priority_score,
                    entry.automation_risk,
                    entry.reskilling_ease
                );
            }
        }
        Commands::Risk { limit } => {
            for entry in top_risk_occupations(&dataset.occupations, limit) {
                println!("- {} ({}): {:.1}% {:?}", entry.name, entry.soc_code, entry.risk, entry.band);
            }
        }
        Commands::Case { id } => print_case_events(id, &events_for_case(&dataset.events, id)),
        Commands::Report { cut, format, out } => {
            let snapshot = report::build_snapshot(&dataset, cut.unwrap_or(config.budget_cut));
            let rendered = match format {
                ReportFormat::Markdown => report::build_report(&snapshot),
                ReportFormat::Json => serde_json::to_string_pretty(&snapshot)?,
            };

            match out {
                Some(path) => {
                    std::fs::write(&path, rendered)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    println!("Report written to {}.", path.display());
                }
                None => println!("{rendered}"),
            }
        }
    }

    Ok(())
}
