//! Configuration validation.
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: SiteConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::SiteConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("rate_limit.window_ms must be greater than zero")]
    ZeroWindow,

    #[error("rate_limit.max_requests must be greater than zero")]
    ZeroQuota,

    #[error("timeouts.request_secs must be greater than zero")]
    ZeroRequestTimeout,

    #[error("content.root must not be empty")]
    EmptyContentRoot,

    #[error("content.index_file must not be empty")]
    EmptyIndexFile,

    #[error("observability.metrics_address {0:?} is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration for semantic errors.
pub fn validate_config(config: &SiteConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.rate_limit.window_ms == 0 {
        errors.push(ValidationError::ZeroWindow);
    }
    if config.rate_limit.max_requests == 0 {
        errors.push(ValidationError::ZeroQuota);
    }
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }
    if config.content.root.as_os_str().is_empty() {
        errors.push(ValidationError::EmptyContentRoot);
    }
    if config.content.index_file.trim().is_empty() {
        errors.push(ValidationError::EmptyIndexFile);
    }
    if config.observability.metrics_enabled
        && config
            .observability
            .metrics_address
            .parse::<SocketAddr>()
            .is_err()
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
