//! LLM integration.
//!
//! Uses the rig-core crate for HTTP transport and the `RigAdapter` to bridge
//! rig's `CompletionModel` trait to our `LlmProvider` trait. When no key is
//! configured, [`UnavailableProvider`] stands in.

pub mod provider;
mod rig_adapter;

pub use provider::*;
pub use rig_adapter::RigAdapter;

use std::sync::Arc;

use rig::client::CompletionClient;
use secrecy::ExposeSecret;

use crate::error::LlmError;

/// Configuration for creating an LLM provider.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// `None` means generation is disabled.
    pub api_key: Option<secrecy::SecretString>,
    pub model: String,
}

/// Create an LLM provider from configuration.
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>, LlmError> {
    match config.api_key {
        Some(ref key) => create_openai_provider(key, &config.model),
        None => {
            tracing::info!("No OpenAI key configured, drafts will use the template");
            Ok(Arc::new(UnavailableProvider))
        }
    }
}

fn create_openai_provider(
    api_key: &secrecy::SecretString,
    model: &str,
) -> Result<Arc<dyn LlmProvider>, LlmError> {
    use rig::providers::openai;

    let client: rig::client::Client<openai::client::OpenAIResponsesExt> =
        openai::Client::new(api_key.expose_secret()).map_err(|e| LlmError::RequestFailed {
            provider: "openai".to_string(),
            reason: format!("Failed to create OpenAI client: {}", e),
        })?;

    let completion_model = client.completion_model(model);
    tracing::info!("Using OpenAI (model: {})", model);
    Ok(Arc::new(RigAdapter::new(completion_model, model)))
}
