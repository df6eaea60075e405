//! Transactional mail API configuration.

use serde::{Deserialize, Serialize};

fn default_from_name() -> String {
    "Praxis".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MailConfig {
    /// Endpoint accepting `POST` JSON messages (e.g. `https://api.resend.com/emails`).
    #[serde(default)]
    pub api_url: String,

    /// Bearer token for the mail API.
    #[serde(default)]
    pub api_key: String,

    /// Sender address.
    #[serde(default)]
    pub from_address: String,

    #[serde(default = "default_from_name")]
    pub from_name: String,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: String::new(),
            api_key: String::new(),
            from_address: String::new(),
            from_name: default_from_name(),
        }
    }
}

impl MailConfig {
    pub fn is_configured(&self) -> bool {
        !self.api_url.is_empty() && !self.api_key.is_empty() && !self.from_address.is_empty()
    }

    /// `From` header value: `Name <address>`.
    pub fn sender(&self) -> String {
        format!("{} <{}>", self.from_name, self.from_address)
    }
}
