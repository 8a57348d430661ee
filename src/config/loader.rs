//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {var}: {value}")]
    Env { var: &'static str, value: String },

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (or defaults), then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<ServiceConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => ServiceConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok())?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment variables onto a config.
///
/// `lookup` abstracts `std::env::var` so overrides can be tested without
/// touching process state.
pub fn apply_env_overrides<F>(config: &mut ServiceConfig, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(port) = non_empty("PORT") {
        let port: u16 = port.trim().parse().map_err(|_| ConfigError::Env {
            var: "PORT",
            value: port.clone(),
        })?;
        let host = non_empty("HOST").unwrap_or_else(|| "0.0.0.0".to_string());
        config.listener.bind_address = format!("{}:{}", host.trim(), port);
    }

    // CLIENT_URL takes precedence over ALLOWED_ORIGINS.
    if let Some(raw) = non_empty("CLIENT_URL").or_else(|| non_empty("ALLOWED_ORIGINS")) {
        config.cors.allowed_origins = split_origin_list(&raw);
    }

    let env_mode = non_empty("NODE_ENV").or_else(|| non_empty("APP_ENV"));
    if let Some(mode) = env_mode {
        config.cors.dev_mode = mode.trim().eq_ignore_ascii_case("development");
    }

    if let Some(secret) = non_empty("JWT_SECRET") {
        config.auth.jwt_secret = secret;
    }

    if let Some(timeout) = non_empty("RELAY_TIMEOUT_SECS") {
        let secs: u64 = timeout.trim().parse().map_err(|_| ConfigError::Env {
            var: "RELAY_TIMEOUT_SECS",
            value: timeout.clone(),
        })?;
        config.relay.timeout_secs = Some(secs);
    }

    if let Some(path) = non_empty("DATA_FILE") {
        config.storage.data_file = Some(path);
    }

    Ok(())
}

/// Split a comma-separated origin list, dropping blanks.
pub fn split_origin_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
