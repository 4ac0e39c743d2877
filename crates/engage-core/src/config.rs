//! Configuration management for Engage.
//!
//! Loads configuration from ${ENGAGE_HOME}/config.toml with sensible
//! defaults. The backend base URL can always be overridden with the
//! `ENGAGE_BASE_URL` environment variable.

use std::fs;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default backend base URL (local development server).
pub const DEFAULT_BASE_URL: &str = "http://localhost:3000";

/// Backend connection configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    pub base_url: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub backend: BackendConfig,
}

impl Config {
    /// Loads configuration from ${ENGAGE_HOME}/config.toml.
    ///
    /// A missing file yields defaults. The resolved base URL (env >
    /// config > default) is validated before use.
    pub fn load() -> Result<Self> {
        let path = paths::config_path();
        let mut config = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read config at {}", path.display()))?;
            toml::from_str(&raw)
                .with_context(|| format!("parse config at {}", path.display()))?
        } else {
            Self::default()
        };
        config.backend.base_url = resolve_base_url(&config.backend.base_url)?;
        Ok(config)
    }
}

/// Resolves the backend base URL with precedence: env > config > default.
fn resolve_base_url(config_url: &str) -> Result<String> {
    if let Ok(env_url) = std::env::var("ENGAGE_BASE_URL") {
        let trimmed = env_url.trim();
        if !trimmed.is_empty() {
            validate_url(trimmed)?;
            return Ok(trimmed.trim_end_matches('/').to_string());
        }
    }

    let trimmed = config_url.trim();
    if trimmed.is_empty() {
        return Ok(DEFAULT_BASE_URL.to_string());
    }
    validate_url(trimmed)?;
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn validate_url(url: &str) -> Result<()> {
    url::Url::parse(url).with_context(|| format!("Invalid backend base URL: {url}"))?;
    Ok(())
}

pub mod paths {
    //! Path resolution for Engage configuration.
    //!
    //! ENGAGE_HOME resolution order:
    //! 1. ENGAGE_HOME environment variable (if set)
    //! 2. ~/.config/engage (default)

    use std::path::PathBuf;

    /// Returns the Engage home directory.
    pub fn engage_home() -> PathBuf {
        if let Ok(home) = std::env::var("ENGAGE_HOME") {
            return PathBuf::from(home);
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("engage"))
            .expect("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    pub fn config_path() -> PathBuf {
        engage_home().join("config.toml")
    }
}
