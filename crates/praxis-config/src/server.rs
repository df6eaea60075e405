//! HTTP server configuration.

use serde::{Deserialize, Serialize};

fn default_bind() -> String {
    "127.0.0.1:3000".to_string()
}

fn default_public_url() -> String {
    "http://localhost:3000".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Socket address the server listens on.
    #[serde(default = "default_bind")]
    pub bind: String,

    /// Externally visible base URL, used for links in mails and OAuth
    /// redirects.
    #[serde(default = "default_public_url")]
    pub public_url: String,

    /// Origins allowed by CORS. Empty allows any origin.
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            public_url: default_public_url(),
            cors_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Absolute URL for `path` under the public base URL.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.public_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = ServerConfig::default();
        assert_eq!(config.bind, "127.0.0.1:3000");
        assert_eq!(config.public_url, "http://localhost:3000");
        assert!(config.cors_origins.is_empty());
    }

    #[test]
    fn url_for_joins_single_slash() {
        let config = ServerConfig {
            public_url: "https://praxis.example/".into(),
            ..Default::default()
        };
        assert_eq!(config.url_for("/p/dr-ana"), "https://praxis.example/p/dr-ana");
        assert_eq!(config.url_for("i/x"), "https://praxis.example/i/x");
    }
}
