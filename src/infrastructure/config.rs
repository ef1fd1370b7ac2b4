//! Application configuration

use std::env;

use anyhow::{Context, Result};

use crate::application::services::{PipelineConfig, StageSettings};

/// Application configuration loaded from environment
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Text-generation service base URL
    pub textgen_base_url: String,
    /// HTTP server port
    pub server_port: u16,

    /// Sampling temperature for the narrative stages
    pub narrative_temperature: f32,
    /// Sampling temperature for the evaluation stage
    pub evaluation_temperature: f32,
    /// Token ceiling per narrative generation call
    pub narrative_max_tokens: u32,
    /// Token ceiling per evaluation call
    pub evaluation_max_tokens: u32,
    /// Regeneration ceiling per scene after a failed evaluation
    pub max_regenerations: u8,
    /// Chapters a planted seed may stay unresolved before it counts as stale
    pub seed_staleness_window: u32,

    /// Per-call timeout for generation requests, in seconds
    pub request_timeout_secs: u64,
    /// Bound on concurrent in-flight generation requests
    pub max_inflight_requests: usize,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            textgen_base_url: env::var("TEXTGEN_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8000".to_string()),
            server_port: env::var("SERVER_PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()
                .context("SERVER_PORT must be a valid port number")?,

            narrative_temperature: env::var("NARRATIVE_TEMPERATURE")
                .unwrap_or_else(|_| "0.7".to_string())
                .parse()
                .context("NARRATIVE_TEMPERATURE must be a number")?,
            evaluation_temperature: env::var("EVALUATION_TEMPERATURE")
                .unwrap_or_else(|_| "0.3".to_string())
                .parse()
                .context("EVALUATION_TEMPERATURE must be a number")?,
            narrative_max_tokens: env::var("NARRATIVE_MAX_TOKENS")
                .unwrap_or_else(|_| "4096".to_string())
                .parse()
                .context("NARRATIVE_MAX_TOKENS must be a token count")?,
            evaluation_max_tokens: env::var("EVALUATION_MAX_TOKENS")
                .unwrap_or_else(|_| "1024".to_string())
                .parse()
                .context("EVALUATION_MAX_TOKENS must be a token count")?,
            max_regenerations: env::var("MAX_REGENERATIONS")
                .unwrap_or_else(|_| "2".to_string())
                .parse()
                .context("MAX_REGENERATIONS must be a small integer")?,
            seed_staleness_window: env::var("CONTINUITY_SEED_STALENESS")
                .unwrap_or_else(|_| "5".to_string())
                .parse()
                .context("CONTINUITY_SEED_STALENESS must be a chapter count")?,

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "120".to_string())
                .parse()
                .context("REQUEST_TIMEOUT_SECS must be a number of seconds")?,
            max_inflight_requests: env::var("MAX_INFLIGHT_REQUESTS")
                .unwrap_or_else(|_| "4".to_string())
                .parse()
                .context("MAX_INFLIGHT_REQUESTS must be a positive integer")?,
        })
    }

    /// Pipeline configuration derived from the environment
    pub fn pipeline_config(&self) -> PipelineConfig {
        let mut narrative = StageSettings::narrative_default();
        narrative.temperature = self.narrative_temperature;
        narrative.max_tokens = self.narrative_max_tokens;
        let mut evaluation = StageSettings::evaluation_default();
        evaluation.temperature = self.evaluation_temperature;
        evaluation.max_tokens = self.evaluation_max_tokens;

        PipelineConfig {
            narrative,
            evaluation,
            max_regenerations: self.max_regenerations,
            seed_staleness_window: self.seed_staleness_window,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pipeline_config_threads_every_stage_setting() {
        let config = AppConfig {
            textgen_base_url: "http://localhost:8000".into(),
            server_port: 3000,
            narrative_temperature: 0.8,
            evaluation_temperature: 0.2,
            narrative_max_tokens: 8192,
            evaluation_max_tokens: 512,
            max_regenerations: 1,
            seed_staleness_window: 7,
            request_timeout_secs: 60,
            max_inflight_requests: 2,
        };

        let pipeline = config.pipeline_config();
        assert!((pipeline.narrative.temperature - 0.8).abs() < 1e-6);
        assert!((pipeline.evaluation.temperature - 0.2).abs() < 1e-6);
        assert_eq!(pipeline.narrative.max_tokens, 8192);
        assert_eq!(pipeline.evaluation.max_tokens, 512);
        assert_eq!(pipeline.max_regenerations, 1);
        assert_eq!(pipeline.seed_staleness_window, 7);
    }
}
