//! Configuration management for the LivFlow store operations server
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with LIVFLOW__ prefix
//!
//! The config file is picked by `LIVFLOW__ENVIRONMENT` (e.g.
//! `LIVFLOW__ENVIRONMENT=production` loads `config/production.toml`), the
//! same variable that overrides the `environment` key. The single-underscore
//! `LIVFLOW_ENVIRONMENT` is still read when the former is unset.

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// `json` for structured logs, anything else for human-readable output
    pub log_format: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// JWT authentication configuration
    pub jwt: JwtConfig,

    /// Recipe image storage
    pub media: MediaConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,

    /// Requests running longer than this are aborted
    pub request_timeout_secs: u64,

    /// Upper bound for request bodies, image uploads included
    pub max_body_bytes: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,

    /// Seconds to wait for a pooled connection
    pub acquire_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct JwtConfig {
    /// Secret key used to verify HS256 bearer tokens
    pub secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct MediaConfig {
    /// Directory uploaded images are written to
    pub root_dir: String,

    /// URL prefix under which `root_dir` is served
    pub public_base_url: String,
}

/// Variables that select the environment, in priority order
const ENVIRONMENT_VARS: [&str; 2] = ["LIVFLOW__ENVIRONMENT", "LIVFLOW_ENVIRONMENT"];

/// Resolve the environment name, defaulting to development
fn environment_name(lookup: impl Fn(&str) -> Option<String>) -> String {
    ENVIRONMENT_VARS
        .iter()
        .filter_map(|key| lookup(*key))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
        .unwrap_or_else(|| "development".into())
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment = environment_name(|key| std::env::var(key).ok());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("log_format", "pretty")?
            .set_default("server.port", 8000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.request_timeout_secs", 30)?
            .set_default("server.max_body_bytes", 10 * 1024 * 1024)?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("database.acquire_timeout_secs", 30)?
            .set_default("media.root_dir", "media")?
            .set_default("media.public_base_url", "/media")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (LIVFLOW__ prefix)
            .add_source(
                Environment::with_prefix("LIVFLOW")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    pub fn is_development(&self) -> bool {
        self.environment == "development"
    }

    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_environment_defaults_to_development() {
        assert_eq!(environment_name(lookup(&[])), "development");
        assert_eq!(environment_name(lookup(&[("LIVFLOW__ENVIRONMENT", " ")])), "development");
    }

    #[test]
    fn test_environment_uses_prefixed_variable() {
        assert_eq!(
            environment_name(lookup(&[("LIVFLOW__ENVIRONMENT", "production")])),
            "production"
        );
        assert_eq!(
            environment_name(lookup(&[
                ("LIVFLOW__ENVIRONMENT", "production"),
                ("LIVFLOW_ENVIRONMENT", "staging"),
            ])),
            "production"
        );
    }

    #[test]
    fn test_environment_legacy_variable_still_read() {
        assert_eq!(
            environment_name(lookup(&[("LIVFLOW_ENVIRONMENT", "production")])),
            "production"
        );
    }
}
