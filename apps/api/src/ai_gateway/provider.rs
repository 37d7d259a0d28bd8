//! Provider seam: one trait, implemented once per hosted AI backend.

use async_trait::async_trait;
use thiserror::Error;

/// A single failed attempt against one provider.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    /// Timeout, rate limit, 5xx, connection failure or unusable output.
    /// Retried once, then the next provider is tried.
    #[error("transient failure: {0}")]
    Transient(String),

    /// Invalid key or malformed request. Never retried, never falls back.
    #[error("request rejected (status {status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ProviderError {
    /// Classifies a non-success HTTP status.
    pub fn from_status(status: u16, message: String) -> Self {
        if status == 408 || status == 429 || status >= 500 {
            ProviderError::Transient(format!("status {status}: {message}"))
        } else {
            ProviderError::Rejected { status, message }
        }
    }
}

/// The request URL is dropped before the error is rendered; it may carry credentials.
impl From<reqwest::Error> for ProviderError {
    fn from(e: reqwest::Error) -> Self {
        let e = e.without_url();
        if e.is_builder() {
            return ProviderError::Rejected {
                status: 0,
                message: e.to_string(),
            };
        }
        match e.status() {
            Some(status) => ProviderError::from_status(status.as_u16(), e.to_string()),
            None => ProviderError::Transient(e.to_string()),
        }
    }
}

/// Provider-agnostic completion request.
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the backend for a JSON-only response where it supports that.
    pub json: bool,
}

/// A hosted text-generation backend. Implementations return the raw text of the
/// first candidate; normalization happens in the gateway.
#[async_trait]
pub trait AiProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Strips ```json ... ``` or ``` ... ``` code fences from model output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strip_json_fences_with_json_tag() {
        let input = "```json\n{\"score\": 80}\n```";
        assert_eq!(strip_json_fences(input), "{\"score\": 80}");
    }

    #[test]
    fn test_strip_json_fences_no_fences() {
        assert_eq!(strip_json_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    fn transient(e: &ProviderError) -> bool {
        matches!(e, ProviderError::Transient(_))
    }

    #[test]
    fn test_status_classification() {
        assert!(transient(&ProviderError::from_status(429, "slow down".into())));
        assert!(transient(&ProviderError::from_status(503, "overloaded".into())));
        assert!(transient(&ProviderError::from_status(408, "timeout".into())));
        assert!(!transient(&ProviderError::from_status(401, "bad key".into())));
        assert!(!transient(&ProviderError::from_status(400, "bad request".into())));
    }

    #[tokio::test]
    async fn test_connection_error_drops_request_url() {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(2))
            .build()
            .unwrap();
        let err = client
            .get("http://127.0.0.1:1/models?key=SECRET_KEY_123")
            .send()
            .await
            .unwrap_err();

        let converted = ProviderError::from(err);

        assert!(transient(&converted));
        assert!(!converted.to_string().contains("SECRET_KEY_123"));
    }
}
