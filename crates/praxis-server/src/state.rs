//! Shared handler state.

use std::sync::Arc;

use praxis_config::PraxisConfig;
use praxis_core::tracking::TrackingRules;
use praxis_db::service::PraxisService;

use crate::llm::LlmClient;
use crate::mail::Mailer;

/// Resources shared by every handler. Cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PraxisService>,
    pub config: Arc<PraxisConfig>,
    pub http: reqwest::Client,
    pub mailer: Mailer,
    pub llm: LlmClient,
    /// `None` when tracking is disabled in config.
    pub tracking: Option<Arc<TrackingRules>>,
}

impl AppState {
    /// Build state from an opened service and loaded config.
    ///
    /// # Errors
    ///
    /// Returns an error if the tracking rules fail to compile.
    pub fn new(service: PraxisService, config: PraxisConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("praxis/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let mailer = Mailer::from_config(http.clone(), &config.mail);
        let llm = LlmClient::new(http.clone(), config.llm.clone());
        let tracking = if config.tracking.enabled {
            Some(Arc::new(TrackingRules::standard()?))
        } else {
            None
        };

        Ok(Self {
            service: Arc::new(service),
            config: Arc::new(config),
            http,
            mailer,
            llm,
            tracking,
        })
    }

    /// Replace the mailer (tests use the in-memory outbox).
    #[must_use]
    pub fn with_mailer(mut self, mailer: Mailer) -> Self {
        self.mailer = mailer;
        self
    }

    /// Clamp a client-supplied page size to the configured bounds.
    #[must_use]
    pub fn limit(&self, requested: Option<u32>) -> u32 {
        self.config.general.clamp_limit(requested)
    }
}
