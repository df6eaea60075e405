//! Google Calendar OAuth configuration.

use serde::{Deserialize, Serialize};

fn default_auth_url() -> String {
    "https://accounts.google.com/o/oauth2/v2/auth".to_string()
}

fn default_token_url() -> String {
    "https://oauth2.googleapis.com/token".to_string()
}

fn default_api_base() -> String {
    "https://www.googleapis.com/calendar/v3".to_string()
}

fn default_scope() -> String {
    "https://www.googleapis.com/auth/calendar.events".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CalendarConfig {
    #[serde(default)]
    pub client_id: String,

    #[serde(default)]
    pub client_secret: String,

    /// OAuth redirect URI. Empty means `{server.public_url}/api/calendar/callback`.
    #[serde(default)]
    pub redirect_url: String,

    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Base URL of the Calendar REST API.
    #[serde(default = "default_api_base")]
    pub api_base: String,

    #[serde(default = "default_scope")]
    pub scope: String,
}

impl Default for CalendarConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_url: String::new(),
            auth_url: default_auth_url(),
            token_url: default_token_url(),
            api_base: default_api_base(),
            scope: default_scope(),
        }
    }
}

impl CalendarConfig {
    pub fn is_configured(&self) -> bool {
        !self.client_id.is_empty() && !self.client_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_points_at_google() {
        let config = CalendarConfig::default();
        assert!(!config.is_configured());
        assert!(config.auth_url.starts_with("https://accounts.google.com/"));
        assert!(config.token_url.starts_with("https://oauth2.googleapis.com/"));
    }
}
