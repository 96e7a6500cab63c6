//! Configuration loading and representation.
//!
//! Values come from environment variables. Parsing goes through a lookup
//! function so tests never touch the process environment.

use std::net::SocketAddr;

use impactline_observability::LogFormat;
use thiserror::Error;
use tracing::warn;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_JWT_SECRET: &str = "dev-secret";
const DEFAULT_MAX_CONNECTIONS: u32 = 10;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} is required{context}")]
    Missing { key: &'static str, context: &'static str },

    #[error("invalid {key} `{value}`: {reason}")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Where planning records live.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreBackend {
    InMemory,
    Postgres {
        database_url: String,
        max_connections: u32,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub jwt_secret: String,
    pub store: StoreBackend,
    pub log_format: LogFormat,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let bind_addr = parse_addr(var("BIND_ADDR"), "BIND_ADDR", DEFAULT_BIND_ADDR)?;

        let jwt_secret = var("JWT_SECRET").unwrap_or_else(|| DEFAULT_JWT_SECRET.to_string());

        let persistent = match var("USE_PERSISTENT_STORES") {
            None => false,
            Some(v) => parse_flag(&v).ok_or_else(|| ConfigError::Invalid {
                key: "USE_PERSISTENT_STORES",
                value: v.clone(),
                reason: "expected true/false".to_string(),
            })?,
        };

        let store = if persistent {
            let database_url = var("DATABASE_URL").ok_or(ConfigError::Missing {
                key: "DATABASE_URL",
                context: " when USE_PERSISTENT_STORES is set",
            })?;
            let max_connections = match var("DATABASE_MAX_CONNECTIONS") {
                None => DEFAULT_MAX_CONNECTIONS,
                Some(v) => v.trim().parse().map_err(|e: std::num::ParseIntError| {
                    ConfigError::Invalid {
                        key: "DATABASE_MAX_CONNECTIONS",
                        value: v.clone(),
                        reason: e.to_string(),
                    }
                })?,
            };
            StoreBackend::Postgres {
                database_url,
                max_connections,
            }
        } else {
            StoreBackend::InMemory
        };

        let log_format = match var("LOG_FORMAT") {
            None => LogFormat::default(),
            Some(v) => v.parse().map_err(|e: impactline_observability::UnknownLogFormat| {
                ConfigError::Invalid {
                    key: "LOG_FORMAT",
                    value: v.clone(),
                    reason: e.to_string(),
                }
            })?,
        };

        Ok(Self {
            bind_addr,
            jwt_secret,
            store,
            log_format,
        })
    }

    /// Still running on the built-in development secret.
    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }

    /// Log settings that deserve attention before serving traffic.
    pub fn warn_on_insecure_defaults(&self) {
        if self.uses_default_secret() {
            warn!("JWT_SECRET not set; using the development secret");
        }
        if self.store == StoreBackend::InMemory {
            warn!("USE_PERSISTENT_STORES not set; planning data lives in memory only");
        }
    }
}

fn parse_addr(value: Option<String>, key: &'static str, default: &str) -> Result<SocketAddr, ConfigError> {
    let raw = value.unwrap_or_else(|| default.to_string());
    raw.trim().parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
        key,
        value: raw.clone(),
        reason: e.to_string(),
    })
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_to_in_memory_dev_setup() {
        let config = load(&[]).unwrap();

        assert_eq!(config.bind_addr, "0.0.0.0:8080".parse().unwrap());
        assert!(config.uses_default_secret());
        assert_eq!(config.store, StoreBackend::InMemory);
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn persistent_store_needs_a_database_url() {
        let err = load(&[("USE_PERSISTENT_STORES", "true")]).unwrap_err();
        assert!(matches!(err, ConfigError::Missing { key: "DATABASE_URL", .. }));
    }

    #[test]
    fn reads_postgres_settings() {
        let config = load(&[
            ("USE_PERSISTENT_STORES", "1"),
            ("DATABASE_URL", "postgres://localhost/impactline"),
            ("DATABASE_MAX_CONNECTIONS", "4"),
            ("JWT_SECRET", "s3cret"),
            ("LOG_FORMAT", "pretty"),
            ("BIND_ADDR", "127.0.0.1:9000"),
        ])
        .unwrap();

        assert_eq!(
            config.store,
            StoreBackend::Postgres {
                database_url: "postgres://localhost/impactline".to_string(),
                max_connections: 4,
            }
        );
        assert!(!config.uses_default_secret());
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert_eq!(config.bind_addr.port(), 9000);
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = load(&[("JWT_SECRET", "  "), ("USE_PERSISTENT_STORES", "")]).unwrap();
        assert!(config.uses_default_secret());
        assert_eq!(config.store, StoreBackend::InMemory);
    }

    #[test]
    fn rejects_malformed_values() {
        assert!(matches!(
            load(&[("BIND_ADDR", "nowhere")]),
            Err(ConfigError::Invalid { key: "BIND_ADDR", .. })
        ));
        assert!(matches!(
            load(&[("USE_PERSISTENT_STORES", "maybe")]),
            Err(ConfigError::Invalid { key: "USE_PERSISTENT_STORES", .. })
        ));
        assert!(matches!(
            load(&[("LOG_FORMAT", "xml")]),
            Err(ConfigError::Invalid { key: "LOG_FORMAT", .. })
        ));
    }
}
