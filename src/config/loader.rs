//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::SiteConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the listening port.
pub const PORT_ENV: &str = "PORT";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid {var} value {value:?}: expected a port number")]
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

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<SiteConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: SiteConfig = toml::from_str(&content)?;

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Apply overrides from the process environment.
pub fn apply_env_overrides(config: SiteConfig) -> Result<SiteConfig, ConfigError> {
    apply_overrides_from(config, |key| std::env::var(key).ok())
}

/// Apply overrides using an arbitrary variable lookup.
pub fn apply_overrides_from<F>(mut config: SiteConfig, lookup: F) -> Result<SiteConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(raw) = lookup(PORT_ENV) {
        let trimmed = raw.trim();
        if !trimmed.is_empty() {
            config.listener.port = trimmed.parse().map_err(|_| ConfigError::Env {
                var: PORT_ENV,
                value: raw.clone(),
            })?;
        }
    }
    Ok(config)
}
