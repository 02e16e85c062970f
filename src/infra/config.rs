// src/infra/config.rs — Configuration loading (TOML)

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::infra::paths;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub provider: ProviderConfig,

    #[serde(default)]
    pub refine: RefineConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelsConfig {
    /// Model used by agents that do not name one.
    pub default: String,
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            default: "gemini-2.5-flash-lite".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    /// Environment variable holding the API key (checked before the built-in names).
    pub api_key_env: Option<String>,
    pub base_url: Option<String>,
    pub timeout_seconds: u64,
    #[serde(default)]
    pub retry: RetryOptions,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            api_key_env: None,
            base_url: None,
            timeout_seconds: 120,
            retry: RetryOptions::default(),
        }
    }
}

/// HTTP retry options for model calls.
///
/// `attempts` counts the first call, so `attempts = 5` means up to four retries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryOptions {
    pub attempts: u32,
    pub exp_base: f64,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub http_status_codes: Vec<u16>,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            attempts: 5,
            exp_base: 7.0,
            initial_delay_ms: 1_000,
            max_delay_ms: 60_000,
            http_status_codes: vec![429, 500, 503, 504],
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RefineConfig {
    /// Round budget for `agentlab refine`. Signed so a bad value is reported, not wrapped.
    pub max_rounds: i64,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self { max_rounds: 3 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

impl Config {
    /// Load config from the default location, falling back to defaults.
    pub fn load() -> anyhow::Result<Self> {
        match paths::config_file_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }
}
