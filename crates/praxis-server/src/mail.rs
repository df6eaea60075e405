//! Outgoing transactional mail.

use std::sync::{Arc, Mutex};

use praxis_config::MailConfig;
use serde::Serialize;

#[derive(Debug, thiserror::Error)]
pub enum MailError {
    #[error("mail API request failed: {0}")]
    Request(String),
    #[error("mail API returned HTTP {0}")]
    Status(u16),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutgoingMail {
    pub to: String,
    pub subject: String,
    pub text: String,
}

/// Delivery backend.
///
/// `Disabled` swallows messages with a log line so that an unconfigured
/// install keeps working; `Memory` collects them for assertions.
#[derive(Clone)]
pub enum Mailer {
    Http {
        client: reqwest::Client,
        config: Arc<MailConfig>,
    },
    Disabled,
    Memory(Arc<Mutex<Vec<OutgoingMail>>>),
}

impl Mailer {
    #[must_use]
    pub fn from_config(client: reqwest::Client, config: &MailConfig) -> Self {
        if config.is_configured() {
            Self::Http {
                client,
                config: Arc::new(config.clone()),
            }
        } else {
            tracing::info!("mail API not configured; outgoing mail is disabled");
            Self::Disabled
        }
    }

    #[must_use]
    pub fn memory() -> Self {
        Self::Memory(Arc::new(Mutex::new(Vec::new())))
    }

    /// Messages captured by a `Memory` mailer.
    #[must_use]
    pub fn outbox(&self) -> Vec<OutgoingMail> {
        match self {
            Self::Memory(outbox) => outbox.lock().map(|o| o.clone()).unwrap_or_default(),
            _ => Vec::new(),
        }
    }

    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns `MailError` when the HTTP API call fails or is rejected.
    pub async fn send(&self, mail: OutgoingMail) -> Result<(), MailError> {
        match self {
            Self::Http { client, config } => {
                let resp = client
                    .post(&config.api_url)
                    .bearer_auth(&config.api_key)
                    .json(&serde_json::json!({
                        "from": config.sender(),
                        "to": [mail.to],
                        "subject": mail.subject,
                        "text": mail.text,
                    }))
                    .send()
                    .await
                    .map_err(|e| MailError::Request(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(MailError::Status(resp.status().as_u16()));
                }
                tracing::debug!(subject = %mail.subject, "mail sent");
                Ok(())
            }
            Self::Disabled => {
                tracing::debug!(to = %mail.to, subject = %mail.subject, "mail disabled; dropping message");
                Ok(())
            }
            Self::Memory(outbox) => {
                if let Ok(mut outbox) = outbox.lock() {
                    outbox.push(mail);
                }
                Ok(())
            }
        }
    }
}
