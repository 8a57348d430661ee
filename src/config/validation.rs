//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, size caps > 0)
//! - Check that every allow-list entry compiles
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ServiceConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;

use crate::config::schema::ServiceConfig;
use crate::security::origin::OriginEntry;

/// A single semantic problem with a configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("listener.bind_address '{0}' is not a socket address")]
    BindAddress(String),

    #[error("cors.allowed_origins entry '{entry}': {reason}")]
    OriginEntry { entry: String, reason: String },

    #[error("relay.timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("{0} must be greater than zero")]
    ZeroLimit(&'static str),

    #[error("auth.jwt_secret must not be empty")]
    EmptySecret,

    #[error("observability.metrics_address '{0}' is not a socket address")]
    MetricsAddress(String),
}

/// Validate a loaded configuration.
pub fn validate_config(config: &ServiceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }

    for entry in &config.cors.allowed_origins {
        if let Err(e) = OriginEntry::parse(entry) {
            errors.push(ValidationError::OriginEntry {
                entry: entry.clone(),
                reason: e.to_string(),
            });
        }
    }

    if config.relay.timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.relay.max_response_bytes == 0 {
        errors.push(ValidationError::ZeroLimit("relay.max_response_bytes"));
    }
    if config.security.max_body_size == 0 {
        errors.push(ValidationError::ZeroLimit("security.max_body_size"));
    }

    if config.auth.jwt_secret.is_empty() {
        errors.push(ValidationError::EmptySecret);
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
