//! General application configuration.

use serde::{Deserialize, Serialize};

/// Default page size for list endpoints.
const fn default_limit() -> u32 {
    50
}

/// Upper bound for a client-supplied `limit`.
const fn default_max_limit() -> u32 {
    200
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GeneralConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,

    #[serde(default = "default_max_limit")]
    pub max_limit: u32,

    /// Emit logs as JSON lines instead of human-readable text.
    #[serde(default)]
    pub log_json: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
            log_json: false,
        }
    }
}

impl GeneralConfig {
    /// Resolve a client-supplied limit against the configured bounds.
    pub fn clamp_limit(&self, requested: Option<u32>) -> u32 {
        requested
            .unwrap_or(self.default_limit)
            .clamp(1, self.max_limit.max(1))
    }
}
