//! Application wiring: turns a [`Config`] into the shared server state.

use crate::ai::{ModelService, ResponsesClient};
use crate::analysis::{AnalysisSettings, Analyzer};
use crate::config::Config;
use crate::Result;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

/// Read-only state shared by every request handler.
pub struct AppState {
    analyzer: Analyzer,
    static_root: PathBuf,
}

impl AppState {
    /// Build state from concrete dependencies.
    ///
    /// This is primarily useful for integration tests that need to inject a
    /// mock model service.
    pub fn new(analyzer: Analyzer, static_root: PathBuf) -> Self {
        Self {
            analyzer,
            static_root,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()?;
        let models: Arc<dyn ModelService> = Arc::new(
            ResponsesClient::new_with_client(http_client, config.request_timeout)
                .with_base_url(config.api_base_url.clone()),
        );

        match (&config.api_key, &config.vision_model) {
            (Some(_), Some(vision)) => info!(
                "Vision model: {}, reasoning model: {}",
                vision,
                config.thinking_model.as_deref().unwrap_or(vision)
            ),
            _ => warn!("AI_API_KEY or VISION_MODEL not set; analysis requests will be rejected"),
        }
        info!(
            "Analysis mode: {} ({}-{} images, vision concurrency {}, timeout {:?})",
            config.mode,
            config.image_bounds.min(),
            config.image_bounds.max(),
            config.vision_concurrency,
            config.request_timeout
        );

        let analyzer = Analyzer::new(models, AnalysisSettings::from(config));
        Ok(Self::new(analyzer, config.static_dir.clone()))
    }

    pub fn analyzer(&self) -> &Analyzer {
        &self.analyzer
    }

    pub fn static_root(&self) -> &Path {
        &self.static_root
    }
}
