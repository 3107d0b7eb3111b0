pub mod budget;
pub mod config;
pub mod db;
pub mod effectiveness;
pub mod join;
pub mod loader;
pub mod models;
pub mod priority;
pub mod rates;
pub mod report;
pub mod skills;
pub mod telemetry;

pub use budget::compute_budget_model;
pub use effectiveness::compute_program_effectiveness;
pub use join::join_cases_with_events;
pub use priority::compute_prioritization;
pub use skills::compute_skill_category_stats;
