use std::env;

use log::info;
use thiserror::Error;

use crate::catalog::DEFAULT_FEATURED_COUNT;

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{0} must be set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    Mongo,
    Memory,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub backend: StoreBackend,
    pub database_url: Option<String>,
    pub database_name: String,
    pub jwt_secret: String,
    pub bind_addr: String,
    pub featured_count: usize,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let or_default = |key: &str, default: &str| {
            lookup(key).unwrap_or_else(|| {
                info!("{key} not set, using default: {default}");
                default.to_string()
            })
        };

        let backend = match or_default("STORE_BACKEND", "mongo").as_str() {
            "mongo" => StoreBackend::Mongo,
            "memory" => StoreBackend::Memory,
            other => {
                return Err(ConfigError::Invalid {
                    key: "STORE_BACKEND",
                    value: other.to_string(),
                })
            }
        };

        let database_url = lookup("DATABASE_URL");
        if backend == StoreBackend::Mongo && database_url.is_none() {
            return Err(ConfigError::Missing("DATABASE_URL"));
        }

        let jwt_secret = lookup("JWT_SECRET").ok_or(ConfigError::Missing("JWT_SECRET"))?;

        let featured = or_default("FEATURED_COUNT", &DEFAULT_FEATURED_COUNT.to_string());
        let featured_count = featured.parse().map_err(|_| ConfigError::Invalid {
            key: "FEATURED_COUNT",
            value: featured.clone(),
        })?;

        Ok(Config {
            backend,
            database_url,
            database_name: or_default("DATABASE_NAME", "shoes_paradise"),
            jwt_secret,
            bind_addr: or_default("BIND_ADDR", "127.0.0.1:8080"),
            featured_count,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[
            ("DATABASE_URL", "mongodb://localhost:27017"),
            ("JWT_SECRET", "s3cret"),
        ])
        .unwrap();

        assert_eq!(config.backend, StoreBackend::Mongo);
        assert_eq!(config.database_name, "shoes_paradise");
        assert_eq!(config.bind_addr, "127.0.0.1:8080");
        assert_eq!(config.featured_count, 8);
    }

    #[test]
    fn memory_backend_needs_no_database() {
        let config = load(&[("STORE_BACKEND", "memory"), ("JWT_SECRET", "s3cret")]).unwrap();
        assert_eq!(config.backend, StoreBackend::Memory);
        assert_eq!(config.database_url, None);
    }

    #[test]
    fn missing_or_invalid_values_are_errors() {
        assert_eq!(
            load(&[("JWT_SECRET", "s3cret")]).unwrap_err(),
            ConfigError::Missing("DATABASE_URL")
        );
        assert_eq!(
            load(&[("STORE_BACKEND", "memory")]).unwrap_err(),
            ConfigError::Missing("JWT_SECRET")
        );
        assert!(matches!(
            load(&[
                ("STORE_BACKEND", "memory"),
                ("JWT_SECRET", "s3cret"),
                ("FEATURED_COUNT", "many"),
            ]),
            Err(ConfigError::Invalid { key: "FEATURED_COUNT", .. })
        ));
    }
}
