//! Error types for Syllabus.

use crate::llm::LlmError;
use thiserror::Error;

/// Library-level error type for Syllabus operations.
#[derive(Error, Debug)]
pub enum SyllabusError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Model error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Course store error: {0}")]
    Store(String),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Tool error: {0}")]
    Tool(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Result type alias for Syllabus operations.
pub type Result<T> = std::result::Result<T, SyllabusError>;
