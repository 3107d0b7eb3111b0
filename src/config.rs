use std::env;

use thiserror::Error;

use crate::budget::{DEFAULT_BUDGET_CUT, MAX_BUDGET_CUT, MIN_BUDGET_CUT};

const DEFAULT_LOG_LEVEL: &str = "info";
const DEFAULT_MAX_CONNECTIONS: u32 = 5;

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: Option<String>,
    pub log_level: String,
    pub budget_cut: f64,
    pub max_connections: u32,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("RESKILL_BUDGET_CUT must be a number between 10 and 50, got '{0}'")]
    InvalidBudgetCut(String),
    #[error("RESKILL_DB_MAX_CONNECTIONS must be a positive integer, got '{0}'")]
    InvalidMaxConnections(String),
}

impl AppConfig {
    /// Reads settings from the environment after loading `.env`, if present.
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = lookup("DATABASE_URL").filter(|url| !url.trim().is_empty());
        let log_level = lookup("RESKILL_LOG_LEVEL").unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string());

        let budget_cut = match lookup("RESKILL_BUDGET_CUT") {
            Some(raw) => parse_budget_cut(&raw).ok_or(ConfigError::InvalidBudgetCut(raw))?,
            None => DEFAULT_BUDGET_CUT,
        };

        let max_connections = match lookup("RESKILL_DB_MAX_CONNECTIONS") {
            Some(raw) => raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or(ConfigError::InvalidMaxConnections(raw))?,
            None => DEFAULT_MAX_CONNECTIONS,
        };

        Ok(Self {
            database_url,
            log_level,
            budget_cut,
            max_connections,
        })
    }
}

pub fn parse_budget_cut(raw: &str) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|value| (MIN_BUDGET_CUT..=MAX_BUDGET_CUT).contains(value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_env_missing() {
        let config = AppConfig::from_lookup(lookup_from(&[])).expect("defaults load");
        assert_eq!(config.database_url, None);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.budget_cut, 30.0);
        assert_eq!(config.max_connections, 5);
    }

    #[test]
    fn reads_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("DATABASE_URL", "postgres://localhost/reskilling"),
            ("RESKILL_LOG_LEVEL", "debug"),
            ("RESKILL_BUDGET_CUT", "45"),
            ("RESKILL_DB_MAX_CONNECTIONS", "2"),
        ]))
        .expect("config loads");
        assert_eq!(config.database_url.as_deref(), Some("postgres://localhost/reskilling"));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.budget_cut, 45.0);
        assert_eq!(config.max_connections, 2);
    }

    #[test]
    fn rejects_budget_cut_outside_range() {
        let err = AppConfig::from_lookup(lookup_from(&[("RESKILL_BUDGET_CUT", "75")]))
            .expect_err("cut rejected");
        assert_eq!(err, ConfigError::InvalidBudgetCut("75".to_string()));
        assert!(parse_budget_cut("ten").is_none());
        assert_eq!(parse_budget_cut(" 10 "), Some(10.0));
    }

    #[test]
    fn rejects_zero_connections() {
        let err = AppConfig::from_lookup(lookup_from(&[("RESKILL_DB_MAX_CONNECTIONS", "0")]))
            .expect_err("zero rejected");
        assert_eq!(err, ConfigError::InvalidMaxConnections("0".to_string()));
    }
}
