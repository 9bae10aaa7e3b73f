//! Anthropic Messages API client.

use super::client::LanguageModel;
use super::error::LlmError;
use super::types::{ModelRequest, ModelResponse};
use async_trait::async_trait;
use reqwest::{header, Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, instrument};

/// Default API base URL.
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Default API version header.
const DEFAULT_API_VERSION: &str = "2023-06-01";

/// Default timeout for model calls (5 minutes).
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Connection settings for the Anthropic API.
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub api_key: String,
    pub base_url: String,
    pub api_version: String,
    pub timeout: Duration,
}

impl AnthropicConfig {
    /// Create a config with the given API key and default endpoint.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }

    /// Read the API key from `ANTHROPIC_API_KEY`.
    pub fn from_env() -> Result<Self, LlmError> {
        match std::env::var("ANTHROPIC_API_KEY") {
            Ok(key) if !key.is_empty() => Ok(Self::new(key)),
            _ => Err(LlmError::Config(
                "ANTHROPIC_API_KEY environment variable not set".to_string(),
            )),
        }
    }

    /// Use a different base URL (proxies, test servers).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// Override the `anthropic-version` header.
    pub fn with_api_version(mut self, version: impl Into<String>) -> Self {
        self.api_version = version.into();
        self
    }

    /// Set the per-call timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Blocking-per-call client for the Anthropic Messages API.
pub struct AnthropicClient {
    http: Client,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a client from its configuration.
    pub fn new(config: AnthropicConfig) -> Result<Self, LlmError> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    async fn read_response(response: Response) -> Result<ModelResponse, LlmError> {
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(classify_failure(status, &body));
        }

        serde_json::from_str(&body).map_err(|e| LlmError::Serialization(e.to_string()))
    }
}

#[async_trait]
impl LanguageModel for AnthropicClient {
    #[instrument(
        skip(self, request),
        fields(
            model = %request.model,
            messages = request.messages.len(),
            tools = request.tools.len()
        )
    )]
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
        let response = self
            .http
            .post(self.messages_url())
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", &self.config.api_version)
            .header(header::CONTENT_TYPE, "application/json")
            .json(&request)
            .send()
            .await?;

        let parsed = Self::read_response(response).await?;
        debug!(
            stop_reason = ?parsed.stop_reason,
            blocks = parsed.content.len(),
            "Model call completed"
        );
        Ok(parsed)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// Map a non-success HTTP response to a transport error kind.
fn classify_failure(status: StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|b| b.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED => LlmError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimit(message),
        _ => LlmError::Api {
            status: status.as_u16(),
            message,
        },
    }
}
