//! The extraction oracle abstraction.
//!
//! The oracle is an opaque natural-language service: free-text prompt in, raw
//! reply text out. Interpretation of the reply lives on this side of the
//! seam. The helpers below locate the JSON object a model embeds in its
//! reply and read expected fields out of it; a missing or empty field maps to
//! `None` ("not present"), while a reply with no parseable object at all is
//! an [`OracleError::Parse`].

pub mod ollama;

use async_trait::async_trait;
use serde_json::Value;

/// Errors from extraction oracle calls.
#[derive(Debug, thiserror::Error)]
pub enum OracleError {
    /// HTTP transport failure.
    #[error("oracle request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The oracle responded with a non-success status.
    #[error("oracle returned non-success status {status}: {body}")]
    HttpStatus {
        /// HTTP status code.
        status: u16,
        /// Truncated response body.
        body: String,
    },

    /// The reply did not contain the expected structure.
    #[error("oracle reply parse error: {0}")]
    Parse(String),
}

/// Opaque extraction oracle: prompt in, raw reply text out.
#[async_trait]
pub trait Oracle: Send + Sync {
    /// Run one prompt against the oracle and return the raw reply text.
    ///
    /// # Errors
    ///
    /// Returns [`OracleError`] on transport, status, or decode failure.
    async fn generate(&self, prompt: &str) -> Result<String, OracleError>;
}

/// Locate the JSON object embedded in a model reply.
///
/// Models often wrap the requested object in prose; this takes the span from
/// the first `{` to the last `}`.
pub fn extract_json_object(reply: &str) -> Option<&str> {
    let start = reply.find('{')?;
    let end = reply.rfind('}')?;
    if end < start {
        return None;
    }
    reply.get(start..=end)
}

fn parse_reply_object(reply: &str) -> Result<serde_json::Map<String, Value>, OracleError> {
    let json = extract_json_object(reply)
        .ok_or_else(|| OracleError::Parse("no JSON object in oracle reply".to_owned()))?;
    let value: Value =
        serde_json::from_str(json).map_err(|e| OracleError::Parse(e.to_string()))?;
    match value {
        Value::Object(map) => Ok(map),
        other => Err(OracleError::Parse(format!(
            "oracle reply is not an object: {other}"
        ))),
    }
}

/// Read an optional string field from an oracle reply.
///
/// Returns `None` when the field is missing, null, or empty after trimming.
/// That is the oracle's "not present" signal and never an error.
///
/// # Errors
///
/// Returns [`OracleError::Parse`] when the reply holds no parseable JSON
/// object or the field's value is not a string.
pub fn read_text_field(reply: &str, field: &str) -> Result<Option<String>, OracleError> {
    let object = parse_reply_object(reply)?;
    match object.get(field) {
        Some(Value::String(text)) => {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                Ok(None)
            } else {
                Ok(Some(trimmed.to_owned()))
            }
        }
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(OracleError::Parse(format!(
            "field {field:?} is not a string: {other}"
        ))),
    }
}

/// Read an optional boolean field from an oracle reply.
///
/// Accepts JSON booleans and the quoted forms `"true"`/`"false"`; models
/// prompted with a literal `true or false` sometimes quote the value.
/// Missing, null, or empty means `None`.
///
/// # Errors
///
/// Returns [`OracleError::Parse`] when the reply holds no parseable JSON
/// object or the field's value is neither a boolean nor a boolean string.
pub fn read_bool_field(reply: &str, field: &str) -> Result<Option<bool>, OracleError> {
    let object = parse_reply_object(reply)?;
    match object.get(field) {
        Some(Value::Bool(flag)) => Ok(Some(*flag)),
        Some(Value::String(text)) => match text.trim().to_ascii_lowercase().as_str() {
            "true" => Ok(Some(true)),
            "false" => Ok(Some(false)),
            "" => Ok(None),
            other => Err(OracleError::Parse(format!(
                "field {field:?} is not a boolean: {other:?}"
            ))),
        },
        Some(Value::Null) | None => Ok(None),
        Some(other) => Err(OracleError::Parse(format!(
            "field {field:?} is not a boolean: {other}"
        ))),
    }
}

/// Check a response status and return the body text.
///
/// # Errors
///
/// Returns [`OracleError::Request`] if the body cannot be read and
/// [`OracleError::HttpStatus`] with a truncated body on a non-success status.
pub async fn check_http_response(response: reqwest::Response) -> Result<String, OracleError> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(OracleError::HttpStatus {
            status: status.as_u16(),
            body: truncate_error_body(&body),
        });
    }
    Ok(body)
}

/// Collapse whitespace and cap the length of an error body before it lands
/// in logs.
fn truncate_error_body(raw: &str) -> String {
    const MAX_ERROR_BODY_CHARS: usize = 256;

    let collapsed = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.chars().count() > MAX_ERROR_BODY_CHARS {
        let shortened: String = collapsed.chars().take(MAX_ERROR_BODY_CHARS).collect();
        return format!("{shortened}...[truncated]");
    }
    collapsed
}
