//! Ollama-backed extraction oracle using the `/api/generate` endpoint.
//!
//! Non-streaming, with the JSON format hint so the model emits a bare JSON
//! object. Request building and response parsing are plain functions so the
//! wire format is testable without a running server.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{check_http_response, Oracle, OracleError};

/// Default Ollama API base URL.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

// ---------------------------------------------------------------------------
// Wire types (pub for integration testing)
// ---------------------------------------------------------------------------

/// Ollama generate API request body.
#[doc(hidden)]
#[derive(Debug, Serialize)]
pub struct GenerateRequest {
    /// Model name.
    pub model: String,
    /// The full prompt text.
    pub prompt: String,
    /// Disable streaming; the caller wants one complete reply.
    pub stream: bool,
    /// Output format hint (`"json"`).
    pub format: String,
}

/// Ollama generate API response body. Unrecognized fields are ignored.
#[doc(hidden)]
#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    /// Generated reply text.
    pub response: String,
}

/// Build a generate request for one extraction prompt.
#[doc(hidden)]
pub fn build_request(model: &str, prompt: &str) -> GenerateRequest {
    GenerateRequest {
        model: model.to_owned(),
        prompt: prompt.to_owned(),
        stream: false,
        format: "json".to_owned(),
    }
}

/// Parse a generate response body into the raw reply text.
///
/// # Errors
///
/// Returns [`OracleError::Parse`] if the body cannot be deserialized.
#[doc(hidden)]
pub fn parse_response(body: &str) -> Result<String, OracleError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| OracleError::Parse(e.to_string()))?;
    Ok(parsed.response)
}

// ---------------------------------------------------------------------------
// Oracle implementation
// ---------------------------------------------------------------------------

/// Extraction oracle served by a local Ollama instance.
#[derive(Debug, Clone)]
pub struct OllamaOracle {
    /// Base URL of the Ollama API.
    #[doc(hidden)]
    pub base_url: String,
    /// Model name passed on every request.
    #[doc(hidden)]
    pub model: String,
    client: reqwest::Client,
}

impl OllamaOracle {
    /// Create an oracle for `model` served at `base_url`.
    pub fn new(base_url: &str, model: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_owned(),
            model: model.to_owned(),
            client: reqwest::Client::new(),
        }
    }

    /// Check whether the Ollama server answers at all.
    pub async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.base_url);
        self.client.get(&url).send().await.is_ok()
    }
}

#[async_trait]
impl Oracle for OllamaOracle {
    async fn generate(&self, prompt: &str) -> Result<String, OracleError> {
        let api_request = build_request(&self.model, prompt);

        let url = format!("{}/api/generate", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("content-type", "application/json")
            .json(&api_request)
            .send()
            .await?;

        let payload = check_http_response(response).await?;
        parse_response(&payload)
    }
}
