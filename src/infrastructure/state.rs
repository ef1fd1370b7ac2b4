//! Shared application state

use std::sync::Arc;

use crate::application::services::{PipelineConfig, StructuredClient};
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::textgen::TextGenClient;

/// Shared application state
pub struct AppState {
    pub config: AppConfig,
    /// Structured client over the text-generation service; shared by all
    /// concurrent runs so the in-flight bound applies process-wide
    pub client: Arc<StructuredClient<TextGenClient>>,
    pub pipeline_config: PipelineConfig,
}

impl AppState {
    pub fn new(config: AppConfig) -> Self {
        let textgen = TextGenClient::new(
            &config.textgen_base_url,
            config.request_timeout_secs,
            config.max_inflight_requests,
        );
        let client = Arc::new(StructuredClient::new(textgen));
        let pipeline_config = config.pipeline_config();

        Self {
            config,
            client,
            pipeline_config,
        }
    }
}
