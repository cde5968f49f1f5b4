//! Dispatcher: one delivery attempt for an approved draft.

use std::sync::Arc;

use async_trait::async_trait;
use secrecy::SecretString;
use tracing::{info, warn};

use crate::compose::Draft;
use crate::config::SenderSettings;
use crate::error::MailError;

/// A fully addressed message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery capability.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn deliver(&self, mail: &OutgoingMail, password: &SecretString) -> Result<(), MailError>;
}

/// Result of a dispatch attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Failed(String),
}

/// Hands approved drafts to a [`MailTransport`].
pub struct Dispatcher {
    transport: Arc<dyn MailTransport>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn MailTransport>) -> Self {
        Self { transport }
    }

    /// Send `draft` from `sender` to `recipient`. Never retries, never errors:
    /// every failure comes back as [`DispatchOutcome::Failed`].
    pub async fn send(
        &self,
        draft: &Draft,
        sender: &SenderSettings,
        recipient: &str,
    ) -> DispatchOutcome {
        let mail = OutgoingMail {
            from: sender.address.clone(),
            to: recipient.to_string(),
            subject: draft.subject().to_string(),
            body: draft.body().to_string(),
        };

        match self.transport.deliver(&mail, &sender.password).await {
            Ok(()) => {
                info!(to = recipient, "Draft delivered");
                DispatchOutcome::Sent
            }
            Err(e) => {
                warn!(to = recipient, error = %e, "Delivery failed");
                DispatchOutcome::Failed(e.reason())
            }
        }
    }
}
