//! Email transport: SMTP over implicit TLS via lettre.

use async_trait::async_trait;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Message, SmtpTransport, Transport};
use secrecy::{ExposeSecret, SecretString};

use crate::dispatch::{MailTransport, OutgoingMail};
use crate::error::MailError;

/// Mail submission endpoint.
pub const SMTP_HOST: &str = "smtp.gmail.com";
/// SMTPS (implicit TLS) port.
pub const SMTP_PORT: u16 = 465;

/// Sends mail through a fixed SMTP relay.
#[derive(Debug, Clone)]
pub struct SmtpMailer {
    host: String,
    port: u16,
}

impl SmtpMailer {
    pub fn new() -> Self {
        Self {
            host: SMTP_HOST.to_string(),
            port: SMTP_PORT,
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl Default for SmtpMailer {
    fn default() -> Self {
        Self::new()
    }
}

/// Build the RFC 5322 message for `mail`.
pub fn build_message(mail: &OutgoingMail) -> Result<Message, MailError> {
    let from = mail.from.parse().map_err(|e| MailError::InvalidAddress {
        address: mail.from.clone(),
        reason: format!("{e}"),
    })?;
    let to = mail.to.parse().map_err(|e| MailError::InvalidAddress {
        address: mail.to.clone(),
        reason: format!("{e}"),
    })?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(mail.subject.as_str())
        .body(mail.body.clone())
        .map_err(|e| MailError::Other(format!("Failed to build email: {e}")))
}

/// Sort a lettre SMTP error into auth / connection / other.
fn classify(error: lettre::transport::smtp::Error) -> MailError {
    let reason = error.to_string();
    match error.status() {
        Some(code) if code.to_string().starts_with("53") => MailError::Auth(reason),
        Some(_) => MailError::Other(reason),
        None => MailError::Connection(reason),
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn deliver(&self, mail: &OutgoingMail, password: &SecretString) -> Result<(), MailError> {
        let email = build_message(mail)?;
        let creds = Credentials::new(mail.from.clone(), password.expose_secret().to_string());

        let transport = SmtpTransport::relay(&self.host)
            .map_err(|e| MailError::Connection(format!("SMTP relay error: {e}")))?
            .port(self.port)
            .credentials(creds)
            .build();

        let to = mail.to.clone();
        tokio::task::spawn_blocking(move || transport.send(&email))
            .await
            .map_err(|e| MailError::Other(format!("SMTP task failed: {e}")))?
            .map_err(classify)?;

        tracing::info!("Email sent to {to}");
        Ok(())
    }
}
