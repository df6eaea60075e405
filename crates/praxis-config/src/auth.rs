//! Session and password-reset settings.

use serde::{Deserialize, Serialize};

const fn default_session_ttl_hours() -> i64 {
    720
}

const fn default_reset_token_ttl_minutes() -> i64 {
    60
}

fn default_cookie_name() -> String {
    "praxis_session".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AuthConfig {
    /// Lifetime of a login session.
    #[serde(default = "default_session_ttl_hours")]
    pub session_ttl_hours: i64,

    /// Lifetime of a password reset token.
    #[serde(default = "default_reset_token_ttl_minutes")]
    pub reset_token_ttl_minutes: i64,

    #[serde(default = "default_cookie_name")]
    pub cookie_name: String,

    /// Adds the `Secure` attribute to the session cookie.
    #[serde(default)]
    pub cookie_secure: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl_hours: default_session_ttl_hours(),
            reset_token_ttl_minutes: default_reset_token_ttl_minutes(),
            cookie_name: default_cookie_name(),
            cookie_secure: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl_hours, 720);
        assert_eq!(config.reset_token_ttl_minutes, 60);
        assert_eq!(config.cookie_name, "praxis_session");
        assert!(!config.cookie_secure);
    }
}
