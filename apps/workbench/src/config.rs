//! # Workbench Configuration
//!
//! Loaded from `ATELIER_*` environment variables with fallback to defaults.
//!
//! | Variable                  | Default              |
//! |---------------------------|----------------------|
//! | `ATELIER_DATABASE_PATH`   | `./atelier.db`       |
//! | `ATELIER_TAX_RATE`        | `21` (percent)       |
//! | `ATELIER_SPECIAL_CLIENT`  | `AUSTRAL SPORT S.A.` |
//! | `ATELIER_OVERDUE_DAYS`    | `30` (0 to 3650)     |
//! | `ATELIER_MAX_CONNECTIONS` | `5`                  |
//! | `ATELIER_USER_NAME`       | `Workbench`          |
//! | `ATELIER_USER_ROLE`       | `user`               |
//!
//! The user variables describe the default session; a request may act as
//! another user.

use std::env;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use atelier_core::validation::validate_tax_percent;
use atelier_core::{Rate, Role, DEFAULT_SPECIAL_CLIENT_NAME, OVERDUE_AFTER_DAYS};
use atelier_db::{DbConfig, ReconcilerConfig};

/// Longest overdue window accepted, ten years.
pub const MAX_OVERDUE_DAYS: i64 = 3_650;

/// Workbench configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkbenchConfig {
    /// SQLite file, or `:memory:`.
    pub database_path: PathBuf,

    /// Tax rate applied when a request does not override it.
    pub tax_rate: Rate,

    /// Client name that triggers the small-quantity surcharge.
    pub special_client_name: String,

    /// Days after the document date before an unpaid document is overdue.
    pub overdue_after_days: i64,

    pub max_connections: u32,

    /// Name stamped on entries and deliveries by default.
    pub user_name: String,

    pub user_role: Role,
}

impl Default for WorkbenchConfig {
    fn default() -> Self {
        WorkbenchConfig {
            database_path: PathBuf::from("./atelier.db"),
            tax_rate: atelier_core::DEFAULT_TAX_RATE,
            special_client_name: DEFAULT_SPECIAL_CLIENT_NAME.to_string(),
            overdue_after_days: OVERDUE_AFTER_DAYS,
            max_connections: 5,
            user_name: "Workbench".to_string(),
            user_role: Role::User,
        }
    }
}

impl WorkbenchConfig {
    /// Loads configuration from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration from any key lookup (the environment, a map in
    /// tests).
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = WorkbenchConfig::default();
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let tax_rate = match var("ATELIER_TAX_RATE") {
            Some(raw) => {
                let pct: f64 = raw
                    .parse()
                    .map_err(|_| ConfigError::InvalidValue("ATELIER_TAX_RATE".to_string()))?;
                validate_tax_percent(pct)
                    .map_err(|_| ConfigError::InvalidValue("ATELIER_TAX_RATE".to_string()))?;
                Rate::from_percentage(pct)
            }
            None => defaults.tax_rate,
        };

        let overdue_after_days = match var("ATELIER_OVERDUE_DAYS") {
            Some(raw) => raw
                .parse::<i64>()
                .ok()
                .filter(|days| (0..=MAX_OVERDUE_DAYS).contains(days))
                .ok_or_else(|| ConfigError::InvalidValue("ATELIER_OVERDUE_DAYS".to_string()))?,
            None => defaults.overdue_after_days,
        };

        let max_connections = match var("ATELIER_MAX_CONNECTIONS") {
            Some(raw) => raw
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or_else(|| ConfigError::InvalidValue("ATELIER_MAX_CONNECTIONS".to_string()))?,
            None => defaults.max_connections,
        };

        let user_role = match var("ATELIER_USER_ROLE") {
            Some(raw) => parse_role(&raw)
                .ok_or_else(|| ConfigError::InvalidValue("ATELIER_USER_ROLE".to_string()))?,
            None => defaults.user_role,
        };

        Ok(WorkbenchConfig {
            database_path: var("ATELIER_DATABASE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.database_path),
            tax_rate,
            special_client_name: var("ATELIER_SPECIAL_CLIENT").unwrap_or(defaults.special_client_name),
            overdue_after_days,
            max_connections,
            user_name: var("ATELIER_USER_NAME").unwrap_or(defaults.user_name),
            user_role,
        })
    }

    pub fn db_config(&self) -> DbConfig {
        if self.database_path.as_os_str() == ":memory:" {
            return DbConfig::in_memory();
        }
        DbConfig::new(&self.database_path).max_connections(self.max_connections)
    }

    pub fn reconciler_config(&self) -> ReconcilerConfig {
        ReconcilerConfig {
            tax_rate: self.tax_rate,
            special_client_name: self.special_client_name.clone(),
            overdue_after_days: self.overdue_after_days,
        }
    }
}

fn parse_role(raw: &str) -> Option<Role> {
    match raw.to_ascii_lowercase().as_str() {
        "admin" => Some(Role::Admin),
        "manager" => Some(Role::Manager),
        "user" => Some(Role::User),
        _ => None,
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(pairs: &[(&str, &str)]) -> Result<WorkbenchConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        WorkbenchConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.database_path, PathBuf::from("./atelier.db"));
        assert_eq!(config.tax_rate.bps(), 2100);
        assert_eq!(config.special_client_name, "AUSTRAL SPORT S.A.");
        assert_eq!(config.overdue_after_days, 30);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.user_role, Role::User);
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("ATELIER_DATABASE_PATH", "/tmp/workshop.db"),
            ("ATELIER_TAX_RATE", "10.5"),
            ("ATELIER_SPECIAL_CLIENT", "ACME"),
            ("ATELIER_OVERDUE_DAYS", "45"),
            ("ATELIER_MAX_CONNECTIONS", "8"),
            ("ATELIER_USER_NAME", "Marta"),
            ("ATELIER_USER_ROLE", "Admin"),
        ])
        .unwrap();

        assert_eq!(config.database_path, PathBuf::from("/tmp/workshop.db"));
        assert_eq!(config.tax_rate.bps(), 1050);
        assert_eq!(config.special_client_name, "ACME");
        assert_eq!(config.overdue_after_days, 45);
        assert_eq!(config.db_config().max_connections, 8);
        assert_eq!(config.user_name, "Marta");
        assert_eq!(config.user_role, Role::Admin);

        let reconciler = config.reconciler_config();
        assert_eq!(reconciler.tax_rate.bps(), 1050);
        assert_eq!(reconciler.overdue_after_days, 45);
    }

    #[test]
    fn test_invalid_values() {
        for (key, value) in [
            ("ATELIER_TAX_RATE", "abc"),
            ("ATELIER_TAX_RATE", "150"),
            ("ATELIER_OVERDUE_DAYS", "-1"),
            ("ATELIER_OVERDUE_DAYS", "3651"),
            ("ATELIER_OVERDUE_DAYS", "9223372036854775807"),
            ("ATELIER_MAX_CONNECTIONS", "0"),
            ("ATELIER_USER_ROLE", "root"),
        ] {
            let err = load(&[(key, value)]).unwrap_err();
            assert_eq!(err.to_string(), format!("Invalid value for {}", key));
        }
    }

    #[test]
    fn test_memory_database() {
        let config = load(&[("ATELIER_DATABASE_PATH", ":memory:")]).unwrap();
        assert!(config.db_config().is_in_memory());
    }
}
