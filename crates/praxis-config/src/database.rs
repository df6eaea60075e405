//! Database location.

use serde::{Deserialize, Serialize};

fn default_path() -> String {
    "praxis.db".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Path of the libSQL database file. `:memory:` keeps everything in RAM.
    #[serde(default = "default_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
        }
    }
}

impl DatabaseConfig {
    pub fn is_in_memory(&self) -> bool {
        self.path == ":memory:"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_file_in_cwd() {
        let config = DatabaseConfig::default();
        assert_eq!(config.path, "praxis.db");
        assert!(!config.is_in_memory());
    }
}
