//! Language model client.
//!
//! Defines the message types exchanged with the model, the
//! [`LanguageModel`] trait the response generator calls through, and an
//! Anthropic Messages API implementation.

mod anthropic;
mod client;
mod error;
mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::LanguageModel;
pub use error::LlmError;
pub use types::{
    Content, ContentBlock, Message, ModelRequest, ModelResponse, Role, StopReason, ToolChoice,
    ToolDefinition,
};

#[cfg(test)]
pub use client::testing;
