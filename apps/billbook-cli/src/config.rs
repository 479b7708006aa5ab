//! # CLI Configuration
//!
//! Configuration is loaded from environment variables with fallback to defaults.
//!
//! | variable                          | default         |
//! |-----------------------------------|-----------------|
//! | `BILLBOOK_DB_PATH`                | `./billbook.db` |
//! | `BILLBOOK_OWNER_ID`               | `demo`          |
//! | `BILLBOOK_ACTOR_ID`               | `admin`         |
//! | `BILLBOOK_ROLE`                   | `ADMIN`         |
//! | `BILLBOOK_MAX_CONNECTIONS`        | `5`             |
//! | `BILLBOOK_CHECKOUT_TIMEOUT_SECS`  | `30`            |
//!
//! The owner and actor stand in for an authenticated session: the identity
//! collaborator is expected to set them.

use std::env;
use std::path::PathBuf;
use std::time::Duration;

use billbook_db::{CheckoutConfig, DbConfig};

use crate::auth::Role;

/// Runtime configuration for one CLI invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub owner_id: String,
    pub actor_id: String,
    pub role: Role,
    pub max_connections: u32,
    pub checkout_timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let owner_id = get("BILLBOOK_OWNER_ID").unwrap_or_else(|| "demo".to_string());
        let actor_id = get("BILLBOOK_ACTOR_ID").unwrap_or_else(|| "admin".to_string());

        let role = match get("BILLBOOK_ROLE") {
            Some(raw) => raw
                .parse::<Role>()
                .map_err(|_| ConfigError::InvalidValue("BILLBOOK_ROLE".to_string()))?,
            None => Role::Admin,
        };

        let max_connections: u32 = get("BILLBOOK_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BILLBOOK_MAX_CONNECTIONS".to_string()))?;
        if max_connections == 0 {
            return Err(ConfigError::InvalidValue("BILLBOOK_MAX_CONNECTIONS".to_string()));
        }

        let timeout_secs: u64 = get("BILLBOOK_CHECKOUT_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("BILLBOOK_CHECKOUT_TIMEOUT_SECS".to_string()))?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("BILLBOOK_CHECKOUT_TIMEOUT_SECS".to_string()));
        }

        Ok(AppConfig {
            db_path: PathBuf::from(get("BILLBOOK_DB_PATH").unwrap_or_else(|| "./billbook.db".to_string())),
            owner_id,
            actor_id,
            role,
            max_connections,
            checkout_timeout: Duration::from_secs(timeout_secs),
        })
    }

    pub fn db_config(&self) -> DbConfig {
        DbConfig::new(&self.db_path).max_connections(self.max_connections)
    }

    pub fn checkout_config(&self) -> CheckoutConfig {
        CheckoutConfig::new().timeout(self.checkout_timeout)
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

    fn load(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.db_path, PathBuf::from("./billbook.db"));
        assert_eq!(config.owner_id, "demo");
        assert_eq!(config.role, Role::Admin);
        assert_eq!(config.max_connections, 5);
        assert_eq!(config.checkout_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_overrides() {
        let config = load(&[
            ("BILLBOOK_OWNER_ID", "shop-42"),
            ("BILLBOOK_ROLE", "staff"),
            ("BILLBOOK_CHECKOUT_TIMEOUT_SECS", "5"),
        ])
        .unwrap();
        assert_eq!(config.owner_id, "shop-42");
        assert_eq!(config.role, Role::Staff);
        assert_eq!(config.checkout_config().timeout, Duration::from_secs(5));
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("BILLBOOK_ROLE", "owner")]),
            Err(ConfigError::InvalidValue(key)) if key == "BILLBOOK_ROLE"
        ));
        assert!(load(&[("BILLBOOK_MAX_CONNECTIONS", "0")]).is_err());
        assert!(load(&[("BILLBOOK_CHECKOUT_TIMEOUT_SECS", "soon")]).is_err());
    }
}
