// src/provider/resolver.rs — Provider resolution from environment and config

use std::sync::Arc;
use std::time::Duration;

use super::google::GoogleProvider;
use super::retry::{RetryConfig, RetryProvider};
use super::ModelProvider;
use crate::infra::config::ProviderConfig;
use crate::infra::errors::AgentLabError;

/// Built-in environment variables searched for a Gemini API key, in order.
const KEY_ENV_VARS: &[&str] = &["GOOGLE_API_KEY", "GEMINI_API_KEY"];

/// Find the API key: the configured variable first, then the built-in names.
pub fn resolve_api_key(config: &ProviderConfig) -> Option<String> {
    resolve_api_key_with(config, |name| std::env::var(name).ok())
}

fn resolve_api_key_with(
    config: &ProviderConfig,
    lookup: impl Fn(&str) -> Option<String>,
) -> Option<String> {
    config
        .api_key_env
        .as_deref()
        .into_iter()
        .chain(KEY_ENV_VARS.iter().copied())
        .filter_map(|name| lookup(name))
        .map(|key| key.trim().to_string())
        .find(|key| !key.is_empty())
}

/// Build the Gemini provider, wrapped with retry, from environment and config.
///
/// A `.env` file in the working directory is loaded first when present.
pub fn resolve_provider(config: &ProviderConfig) -> Result<Arc<dyn ModelProvider>, AgentLabError> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }

    let api_key = resolve_api_key(config).ok_or(AgentLabError::NoProvider)?;

    let mut google = GoogleProvider::new(api_key)
        .with_timeout(Duration::from_secs(config.timeout_seconds))?;
    if let Some(ref url) = config.base_url {
        google = google.with_base_url(url.clone());
    }

    let retry = RetryConfig::from(&config.retry);
    tracing::debug!(
        provider = google.id(),
        max_retries = retry.max_retries,
        "Provider resolved",
    );
    Ok(Arc::new(RetryProvider::with_config(Arc::new(google), retry)))
}
