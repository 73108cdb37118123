//! Backend implementations for autoclaw.
//!
//! All providers implement the `autoclaw_core::Provider` trait.
//! [`build_from_config`] picks and configures the one the CLI runs with.

pub mod openai_compat;

use std::sync::Arc;
use autoclaw_config::AppConfig;
use autoclaw_core::Provider;
use autoclaw_core::error::ProviderError;

pub use openai_compat::OpenAiCompatProvider;

/// Build the configured backend.
///
/// Fails with [`ProviderError::NotConfigured`] when no API key is available.
pub fn build_from_config(config: &AppConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let api_key = config.api_key.as_deref().ok_or_else(|| {
        ProviderError::NotConfigured("no API key (set AUTOCLAW_API_KEY or OPENAI_API_KEY)".into())
    })?;
    let name = if config.base_url.contains("api.openai.com") { "openai" } else { "custom" };
    Ok(Arc::new(OpenAiCompatProvider::new(name, &config.base_url, api_key)))
}
