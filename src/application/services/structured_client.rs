//! Structured generation client
//!
//! Wraps a single call to the text-generation service and coerces the
//! free-form response into a typed payload. Models wrap JSON in prose,
//! fence it in markdown, or emit it bare; extraction tries, in order:
//!
//! 1. fenced-block extraction (```json ... ```)
//! 2. first-opening-to-last-closing bracket span
//! 3. raw parse of the whole response
//!
//! If all three fail the caller gets a [`ParseFailure`] carrying the raw
//! text. This client never retries the underlying network call; retry
//! policy belongs to the orchestrator, scoped per stage.

use serde::de::DeserializeOwned;

use crate::application::ports::outbound::{GenerationRequest, TextGenPort};

/// Client for structured generation against an opaque completion service
pub struct StructuredClient<L: TextGenPort> {
    textgen: L,
}

impl<L: TextGenPort> StructuredClient<L> {
    pub fn new(textgen: L) -> Self {
        Self { textgen }
    }

    /// Raw generation: one network call, the response text as-is
    pub async fn generate(&self, request: GenerationRequest) -> Result<String, ClientError> {
        let response = self
            .textgen
            .generate(request)
            .await
            .map_err(|e| ClientError::Generation(e.to_string()))?;
        Ok(response.text)
    }

    /// Structured generation: one network call, response coerced to `T`
    pub async fn generate_structured<T: DeserializeOwned>(
        &self,
        request: GenerationRequest,
    ) -> Result<T, ClientError> {
        let text = self.generate(request).await?;
        extract_structured(&text).map_err(ClientError::Parse)
    }
}

/// Extract a typed payload from free-form model output
pub fn extract_structured<T: DeserializeOwned>(raw: &str) -> Result<T, ParseFailure> {
    // Strategy 1: fenced block
    if let Some(block) = extract_fenced_block(raw) {
        if let Ok(value) = serde_json::from_str::<T>(block) {
            return Ok(value);
        }
    }

    // Strategy 2: outermost bracket span; the type that opens first is
    // tried first, then the other
    for span in bracket_spans(raw) {
        if let Ok(value) = serde_json::from_str::<T>(span) {
            return Ok(value);
        }
    }

    // Strategy 3: the whole response, trimmed
    match serde_json::from_str::<T>(raw.trim()) {
        Ok(value) => Ok(value),
        Err(e) => Err(ParseFailure {
            expected: std::any::type_name::<T>(),
            cause: e.to_string(),
            raw_output: raw.to_string(),
        }),
    }
}

/// Content of the first fenced code block, language tag stripped
fn extract_fenced_block(text: &str) -> Option<&str> {
    let start = text.find("```")?;
    let after_fence = &text[start + 3..];
    // Skip the language tag line (```json, ```JSON, or bare ```)
    let body_start = after_fence.find('\n').map(|i| i + 1).unwrap_or(0);
    let body = &after_fence[body_start..];
    let end = body.find("```")?;
    Some(body[..end].trim())
}

/// Candidate spans from the first opening bracket to the last matching
/// closer, ordered by which bracket type opens first
fn bracket_spans(text: &str) -> Vec<&str> {
    let pairs: &[(char, char)] = match (text.find('{'), text.find('[')) {
        (Some(b), Some(k)) if k < b => &[('[', ']'), ('{', '}')],
        (Some(_), Some(_)) => &[('{', '}'), ('[', ']')],
        (Some(_), None) => &[('{', '}')],
        (None, Some(_)) => &[('[', ']')],
        (None, None) => &[],
    };

    pairs
        .iter()
        .filter_map(|&(open, close)| {
            let start = text.find(open)?;
            let end = text.rfind(close)?;
            (start < end).then(|| &text[start..=end])
        })
        .collect()
}

/// Model output that could not be coerced to the expected structure
///
/// Carries the full raw output so the failure can be diagnosed after the
/// fact. Callers must not retry indefinitely on this.
#[derive(Debug, Clone, thiserror::Error)]
#[error("could not parse model output as {expected}: {cause}")]
pub struct ParseFailure {
    /// Type the caller asked for
    pub expected: &'static str,
    /// What the final parse attempt reported
    pub cause: String,
    /// The raw model output, preserved for diagnostics
    pub raw_output: String,
}

/// Errors from the structured client
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The underlying generation call failed (network, timeout, service)
    #[error("text generation failed: {0}")]
    Generation(String),
    /// All extraction strategies failed
    #[error(transparent)]
    Parse(#[from] ParseFailure),
}
