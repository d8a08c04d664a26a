//! Configuration loading from disk and environment.
//!
//! The loader is the only place that reads process environment variables;
//! everything downstream receives an explicit [`AppConfig`].

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::{AppConfig, Environment};
use crate::config::validation::{validate_config, InvalidSetting};

/// Environment variable selecting the deployment environment.
pub const ENV_ENVIRONMENT: &str = "SECURE_API_ENV";
/// Environment variable overriding the listener port.
pub const ENV_PORT: &str = "PORT";
/// Environment variable overriding the full bind address.
pub const ENV_BIND: &str = "SECURE_API_BIND";
/// Environment variable overriding the log level.
pub const ENV_LOG_LEVEL: &str = "SECURE_API_LOG_LEVEL";
/// Environment variable overriding the per-window request budget.
pub const ENV_RATE_LIMIT_MAX: &str = "SECURE_API_RATE_LIMIT_MAX";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {reason}")]
    Env { var: &'static str, reason: String },

    #[error("Validation failed: {}", join(.0))]
    Validation(Vec<InvalidSetting>),
}

fn join(errors: &[InvalidSetting]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from an optional TOML file, then apply
/// overrides from the process environment.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    let mut config = match path {
        Some(path) => parse_config(&fs::read_to_string(path)?)?,
        None => AppConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document into a configuration without validating it.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply environment overrides using `lookup` to resolve variables.
pub fn apply_env_overrides<F>(config: &mut AppConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(value) = lookup(ENV_ENVIRONMENT) {
        config.environment = value
            .parse::<Environment>()
            .map_err(|reason| ConfigError::Env { var: ENV_ENVIRONMENT, reason })?;
    }

    if let Some(bind) = lookup(ENV_BIND) {
        config.listener.bind_address = bind;
    } else if let Some(port) = lookup(ENV_PORT) {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_PORT,
            reason: format!("'{}' is not a port number", port),
        })?;
        let host = config
            .listener
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host.to_string())
            .unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host, port);
    }

    if let Some(level) = lookup(ENV_LOG_LEVEL) {
        config.observability.log_level = level;
    }

    if let Some(max) = lookup(ENV_RATE_LIMIT_MAX) {
        let max: u32 = max.trim().parse().map_err(|_| ConfigError::Env {
            var: ENV_RATE_LIMIT_MAX,
            reason: format!("'{}' is not a positive integer", max),
        })?;
        config.rate_limit.max_requests = Some(max);
    }

    Ok(())
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
    fn test_env_overrides() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[
                (ENV_ENVIRONMENT, "production"),
                (ENV_PORT, "8443"),
                (ENV_RATE_LIMIT_MAX, "42"),
            ]),
        )
        .unwrap();

        assert_eq!(config.environment, Environment::Production);
        assert_eq!(config.listener.bind_address, "0.0.0.0:8443");
        assert_eq!(config.rate_limit.max_requests, Some(42));
    }

    #[test]
    fn test_bind_wins_over_port() {
        let mut config = AppConfig::default();
        apply_env_overrides(
            &mut config,
            lookup(&[(ENV_BIND, "127.0.0.1:9000"), (ENV_PORT, "1")]),
        )
        .unwrap();
        assert_eq!(config.listener.bind_address, "127.0.0.1:9000");
    }

    #[test]
    fn test_bad_port_is_rejected() {
        let mut config = AppConfig::default();
        let err = apply_env_overrides(&mut config, lookup(&[(ENV_PORT, "http")])).unwrap_err();
        assert!(matches!(err, ConfigError::Env { var: ENV_PORT, .. }));
    }

    #[test]
    fn test_parse_config_rejects_malformed_toml() {
        assert!(matches!(
            parse_config("rate_limit = ["),
            Err(ConfigError::Parse(_))
        ));
    }
}
