//! Text-generation port - The external completion service boundary
//!
//! The generation service is opaque: a prompt goes out over the network,
//! free-form text comes back. The wire shape mirrors the AI server's
//! text-generation endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Port for the external text-generation service
///
/// Implementations must apply their own backpressure (bounded in-flight
/// requests) and per-call timeouts; callers never retry the network call
/// themselves.
#[async_trait]
pub trait TextGenPort: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Issue a single generation call. No automatic retries.
    async fn generate(&self, request: GenerationRequest)
        -> Result<GenerationResponse, Self::Error>;
}

/// A single request to the text-generation service
#[derive(Debug, Clone, Serialize)]
pub struct GenerationRequest {
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stop_sequences: Option<Vec<String>>,
}

impl GenerationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            max_tokens: 2048,
            temperature: 0.7,
            top_p: 0.9,
            stop_sequences: None,
        }
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_top_p(mut self, top_p: f32) -> Self {
        self.top_p = top_p;
        self
    }
}

/// Response from the text-generation service
#[derive(Debug, Clone, Deserialize)]
pub struct GenerationResponse {
    pub text: String,
    pub model: String,
    pub tokens_used: u32,
    pub finish_reason: String,
}
