//! HTTP client for the text-generation service
//!
//! Applies the engine's backpressure and timeout policy at the boundary: a
//! semaphore bounds concurrent in-flight requests, and every call carries a
//! hard timeout. Callers never retry the network call themselves.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tokio::sync::Semaphore;

use crate::application::ports::outbound::{GenerationRequest, GenerationResponse, TextGenPort};

/// Client for the text-generation API
pub struct TextGenClient {
    client: Client,
    base_url: String,
    timeout: Duration,
    inflight: Arc<Semaphore>,
}

impl TextGenClient {
    pub fn new(base_url: &str, timeout_secs: u64, max_inflight: usize) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(timeout_secs),
            inflight: Arc::new(Semaphore::new(max_inflight.max(1))),
        }
    }

    async fn call(&self, request: &GenerationRequest) -> Result<GenerationResponse, TextGenError> {
        let response = self
            .client
            .post(format!("{}/api/v1/text/generate", self.base_url))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(TextGenError::ApiError(error_text));
        }

        let generation: GenerationResponse = response.json().await?;
        Ok(generation)
    }
}

#[async_trait]
impl TextGenPort for TextGenClient {
    type Error = TextGenError;

    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, Self::Error> {
        let _permit = self
            .inflight
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| TextGenError::Unavailable)?;

        match tokio::time::timeout(self.timeout, self.call(&request)).await {
            Ok(result) => result,
            Err(_) => Err(TextGenError::Timeout {
                secs: self.timeout.as_secs(),
            }),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TextGenError {
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),
    #[error("API error: {0}")]
    ApiError(String),
    #[error("generation request timed out after {secs}s")]
    Timeout { secs: u64 },
    #[error("generation service unavailable")]
    Unavailable,
}
