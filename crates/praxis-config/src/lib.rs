//! # praxis-config
//!
//! Layered configuration loading for Praxis using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`PRAXIS_*` prefix, `__` as separator)
//! 2. Project-level `.praxis/config.toml`
//! 3. User-level `~/.config/praxis/config.toml`
//! 4. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `PRAXIS_MAIL__API_KEY` -> `mail.api_key`,
//! `PRAXIS_SERVER__BIND` -> `server.bind`, etc.
//!
//! # Usage
//!
//! ```no_run
//! use praxis_config::PraxisConfig;
//!
//! let config = PraxisConfig::load_with_dotenv().expect("config");
//!
//! if config.mail.is_configured() {
//!     println!("Mail via {}", config.mail.api_url);
//! }
//! ```

mod auth;
mod calendar;
mod database;
mod error;
mod general;
mod llm;
mod mail;
mod payments;
mod server;
mod tracking;

pub use auth::AuthConfig;
pub use calendar::CalendarConfig;
pub use database::DatabaseConfig;
pub use error::ConfigError;
pub use general::GeneralConfig;
pub use llm::LlmConfig;
pub use mail::MailConfig;
pub use payments::PaymentsConfig;
pub use server::ServerConfig;
pub use tracking::TrackingConfig;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PraxisConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub mail: MailConfig,
    #[serde(default)]
    pub calendar: CalendarConfig,
    #[serde(default)]
    pub payments: PaymentsConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub tracking: TrackingConfig,
    #[serde(default)]
    pub general: GeneralConfig,
}

impl PraxisConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Figment` if a source is malformed, and
    /// `ConfigError::InvalidValue` if a loaded value is out of range.
    pub fn load() -> Result<Self, ConfigError> {
        let config: Self = Self::figment().extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_with_dotenv() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::load()
    }

    /// Load defaults, then the TOML file at `path`, then environment variables.
    ///
    /// Used by `praxis --config PATH`; the user and project files are skipped.
    ///
    /// # Errors
    ///
    /// Same as [`Self::load`].
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PRAXIS_").split("__"))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Build the figment provider chain.
    ///
    /// This is public so tests can inspect the figment directly or add
    /// additional providers on top.
    pub fn figment() -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Layer 1: User-global config
        if let Some(global_path) = Self::global_config_path()
            && global_path.exists()
        {
            figment = figment.merge(Toml::file(global_path));
        }

        // Layer 2: Project-local config
        let local_path = PathBuf::from(".praxis/config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        // Layer 3: Environment variables (highest priority)
        figment.merge(Env::prefixed("PRAXIS_").split("__"))
    }

    /// Reject values that would break the server at runtime.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.auth.session_ttl_hours <= 0 {
            return Err(invalid("auth.session_ttl_hours", "must be positive"));
        }
        if self.auth.reset_token_ttl_minutes <= 0 {
            return Err(invalid("auth.reset_token_ttl_minutes", "must be positive"));
        }
        if self.auth.cookie_name.is_empty() {
            return Err(invalid("auth.cookie_name", "must not be empty"));
        }
        if self.payments.tolerance_secs < 0 {
            return Err(invalid("payments.tolerance_secs", "must not be negative"));
        }
        if self.general.default_limit > self.general.max_limit {
            return Err(invalid(
                "general.default_limit",
                "must not exceed general.max_limit",
            ));
        }
        Ok(())
    }

    /// Redirect URI registered with the calendar OAuth provider.
    pub fn calendar_redirect_url(&self) -> String {
        if self.calendar.redirect_url.is_empty() {
            self.server.url_for("/api/calendar/callback")
        } else {
            self.calendar.redirect_url.clone()
        }
    }

    /// Path to the user-global config file.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("praxis").join("config.toml"))
    }
}

fn invalid(field: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}
