//! Payment provider webhook configuration.

use serde::{Deserialize, Serialize};

const fn default_tolerance_secs() -> i64 {
    300
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PaymentsConfig {
    /// Shared secret used to sign webhook payloads.
    #[serde(default)]
    pub webhook_secret: String,

    /// Maximum age of a signed webhook timestamp.
    #[serde(default = "default_tolerance_secs")]
    pub tolerance_secs: i64,
}

impl Default for PaymentsConfig {
    fn default() -> Self {
        Self {
            webhook_secret: String::new(),
            tolerance_secs: default_tolerance_secs(),
        }
    }
}

impl PaymentsConfig {
    pub fn is_configured(&self) -> bool {
        !self.webhook_secret.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_correct() {
        let config = PaymentsConfig::default();
        assert!(!config.is_configured());
        assert_eq!(config.tolerance_secs, 300);
    }
}
