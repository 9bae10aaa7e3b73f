//! Pre-flight checks before expensive operations.
//!
//! Validates that required configuration is available before starting
//! operations that would otherwise fail midway.

use crate::error::{Result, SyllabusError};

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Answering needs the model and the embedder.
    Ask,
    /// Indexing the catalog needs the embedder.
    Index,
    /// Showing configuration needs nothing.
    Config,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Ask => {
            check_api_key("ANTHROPIC_API_KEY", "sk-ant-...")?;
            check_api_key("OPENAI_API_KEY", "sk-...")?;
        }
        Operation::Index => {
            check_api_key("OPENAI_API_KEY", "sk-...")?;
        }
        Operation::Config => {}
    }
    Ok(())
}

/// Check that an API key variable is set and non-empty.
fn check_api_key(var: &str, example: &str) -> Result<()> {
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(()),
        Ok(_) => Err(SyllabusError::Config(format!(
            "{} is empty. Set it with: export {}='{}'",
            var, var, example
        ))),
        Err(_) => Err(SyllabusError::Config(format!(
            "{} not set. Set it with: export {}='{}'",
            var, var, example
        ))),
    }
}
