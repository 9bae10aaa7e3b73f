//! Model transport errors.

use thiserror::Error;

/// Failure of a single model call.
///
/// Classified so callers can produce a precise message for each kind of
/// transport fault without inspecting strings.
#[derive(Error, Debug, Clone)]
pub enum LlmError {
    /// The API rejected the credentials (HTTP 401).
    #[error("authentication failed: {0}")]
    Auth(String),

    /// The API throttled the request (HTTP 429).
    #[error("rate limited: {0}")]
    RateLimit(String),

    /// Any other non-success response from the API.
    #[error("HTTP {status}: {message}")]
    Api { status: u16, message: String },

    /// The request never completed (connection, DNS, timeout).
    #[error("transport failure: {0}")]
    Transport(String),

    /// The response body could not be decoded.
    #[error("malformed response: {0}")]
    Serialization(String),

    /// The client could not be configured.
    #[error("configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// Whether the fault was reported by, or on the way to, the remote API.
    ///
    /// Decoding and configuration faults are local and return `false`.
    pub fn is_api_fault(&self) -> bool {
        matches!(
            self,
            LlmError::Auth(_)
                | LlmError::RateLimit(_)
                | LlmError::Api { .. }
                | LlmError::Transport(_)
        )
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            LlmError::Serialization(err.to_string())
        } else {
            LlmError::Transport(err.to_string())
        }
    }
}
