//! The model call seam.

use super::error::LlmError;
use super::types::{ModelRequest, ModelResponse};
use async_trait::async_trait;

/// A remote language model reached through one request/response call.
///
/// Implementations must not retry on their own; a failed call is reported
/// to the caller exactly once.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Issue one call and wait for the complete response.
    async fn call(&self, request: ModelRequest) -> Result<ModelResponse, LlmError>;

    /// Provider name for logging.
    fn name(&self) -> &str;
}

/// Test double that replays queued responses and records every request.
#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct ScriptedModel {
        replies: Mutex<VecDeque<Result<ModelResponse, LlmError>>>,
        requests: Mutex<Vec<ModelRequest>>,
    }

    impl ScriptedModel {
        pub fn new(replies: Vec<Result<ModelResponse, LlmError>>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Script only successful responses.
        pub fn replying(responses: Vec<ModelResponse>) -> Self {
            Self::new(responses.into_iter().map(Ok).collect())
        }

        pub fn requests(&self) -> Vec<ModelRequest> {
            self.requests.lock().unwrap().clone()
        }

        pub fn call_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn call(&self, request: ModelRequest) -> Result<ModelResponse, LlmError> {
            self.requests.lock().unwrap().push(request);
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(LlmError::Transport("script exhausted".to_string())))
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }
}
