//! Tools the model can call while answering.
//!
//! A [`Tool`] describes itself with a [`ToolDefinition`] and executes
//! against JSON arguments. The [`ToolRegistry`] owns the set of tools,
//! validates arguments against each tool's schema, and turns every
//! execution failure into a text payload for the model.

mod outline;
mod registry;
mod search;

pub use outline::{CourseOutlineTool, OUTLINE_TOOL_NAME};
pub use registry::{Dispatch, DispatchStatus, ToolRegistry};
pub use search::{CourseSearchTool, SEARCH_TOOL_NAME};

use crate::error::Result;
use crate::llm::ToolDefinition;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A citation for content a tool returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    /// Human-readable label, e.g. "Python Basics - Lesson 2".
    pub text: String,
    pub link: Option<String>,
}

/// The result of one tool execution.
///
/// Citations travel with the text they belong to, so concurrent answers
/// sharing a tool never see each other's sources.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolOutput {
    /// Text handed back to the model.
    pub content: String,
    pub sources: Vec<Source>,
}

impl ToolOutput {
    /// Output with no citations.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            sources: Vec::new(),
        }
    }

    /// Output with citations.
    pub fn with_sources(content: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            content: content.into(),
            sources,
        }
    }
}

/// A capability offered to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and argument schema. Must not change between calls.
    fn definition(&self) -> ToolDefinition;

    /// Run the tool.
    ///
    /// Expected domain outcomes such as "no results" are `Ok` with a
    /// descriptive text; `Err` is reserved for unexpected failures.
    async fn execute(&self, arguments: &serde_json::Value) -> Result<ToolOutput>;
}
