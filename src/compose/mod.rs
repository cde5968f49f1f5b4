//! Composer: turns the research context into an email draft.
//!
//! A configured model writes the body when the research found something to
//! write about; otherwise, or when the model fails, the deterministic template
//! is used.

pub mod prompts;
pub mod template;

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::ApplicantProfile;
use crate::error::LlmError;
use crate::llm::provider::{ChatMessage, CompletionRequest, LlmProvider};
use crate::research::ResearchContext;

pub use template::compose_template;

/// Subject line of every draft.
pub const SUBJECT: &str = "PhD Opportunity - Interest in Your Research";

/// Who wrote the body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DraftOrigin {
    Model,
    Template,
    /// Rewritten by the operator at the approval gate.
    Edited,
}

/// Subject and body of the outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Draft {
    subject: String,
    body: String,
    origin: DraftOrigin,
}

impl Draft {
    pub fn new(subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self::with_origin(subject, body, DraftOrigin::Template)
    }

    pub fn with_origin(
        subject: impl Into<String>,
        body: impl Into<String>,
        origin: DraftOrigin,
    ) -> Self {
        Self {
            subject: subject.into(),
            body: body.into(),
            origin,
        }
    }

    pub fn subject(&self) -> &str {
        &self.subject
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn origin(&self) -> DraftOrigin {
        self.origin
    }

    /// Replace the body wholesale. Only the approval gate edits drafts.
    pub(crate) fn replace_body(&mut self, body: String) {
        self.body = body;
        self.origin = DraftOrigin::Edited;
    }
}

/// Generation parameters.
#[derive(Debug, Clone)]
pub struct ComposerConfig {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 500,
        }
    }
}

/// Chooses between model and template composition.
pub struct Composer {
    llm: Arc<dyn LlmProvider>,
    config: ComposerConfig,
}

impl Composer {
    pub fn new(llm: Arc<dyn LlmProvider>) -> Self {
        Self::with_config(llm, ComposerConfig::default())
    }

    pub fn with_config(llm: Arc<dyn LlmProvider>, config: ComposerConfig) -> Self {
        Self { llm, config }
    }

    /// Compose a draft. Never fails.
    pub async fn compose(&self, profile: &ApplicantProfile, context: &ResearchContext) -> Draft {
        let interests = template::interests(context);
        let titles = template::titles(context);
        let has_signal = !interests.is_empty() || !titles.is_empty();

        if self.llm.is_available() && has_signal {
            info!(model = self.llm.model_name(), "Generating draft with model");
            match self.generate(profile, &interests, &titles).await {
                Ok(body) => return Draft::with_origin(SUBJECT, body, DraftOrigin::Model),
                Err(e) => warn!(error = %e, "Model generation failed, falling back to template"),
            }
        } else if !has_signal {
            info!("No research signal, using template");
        }

        compose_template(profile, context)
    }

    async fn generate(
        &self,
        profile: &ApplicantProfile,
        interests: &[&str],
        titles: &[&str],
    ) -> Result<String, LlmError> {
        let request = CompletionRequest::new(vec![
            ChatMessage::system(prompts::SYSTEM_PROMPT),
            ChatMessage::user(prompts::generation_prompt(profile, interests, titles)),
        ])
        .with_temperature(self.config.temperature)
        .with_max_tokens(self.config.max_tokens);

        let response = self.llm.complete(request).await?;
        info!(
            input_tokens = response.input_tokens,
            output_tokens = response.output_tokens,
            "Model draft received"
        );
        let body = response.content.trim();
        if body.is_empty() {
            return Err(LlmError::InvalidResponse {
                provider: self.llm.model_name().to_string(),
                reason: "empty completion".to_string(),
            });
        }
        Ok(body.to_string())
    }
}
