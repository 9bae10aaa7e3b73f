//! Tool registry and dispatch.

use super::{Source, Tool};
use crate::error::{Result, SyllabusError};
use crate::llm::ToolDefinition;
use jsonschema::JSONSchema;
use std::sync::Arc;
use tracing::{debug, warn};

/// How a dispatch ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchStatus {
    /// The tool ran and produced output.
    Completed,
    /// No tool with the requested name is registered.
    NotFound,
    /// Arguments were invalid or the tool failed unexpectedly.
    Failed,
}

/// Text payload and citations produced by a dispatch.
#[derive(Debug, Clone)]
pub struct Dispatch {
    pub content: String,
    pub sources: Vec<Source>,
    pub status: DispatchStatus,
}

impl Dispatch {
    fn completed(content: String, sources: Vec<Source>) -> Self {
        Self {
            content,
            sources,
            status: DispatchStatus::Completed,
        }
    }

    fn not_found(name: &str) -> Self {
        Self {
            content: format!("Tool '{}' not found", name),
            sources: Vec::new(),
            status: DispatchStatus::NotFound,
        }
    }

    fn failed(message: impl std::fmt::Display) -> Self {
        Self {
            content: format!("Tool execution error: {}", message),
            sources: Vec::new(),
            status: DispatchStatus::Failed,
        }
    }

    /// Whether the tool failed unexpectedly.
    pub fn is_failure(&self) -> bool {
        self.status == DispatchStatus::Failed
    }
}

struct Registered {
    tool: Arc<dyn Tool>,
    definition: ToolDefinition,
    schema: JSONSchema,
}

/// Registry of tools available to the response generator.
///
/// Tools keep their registration order. The registry is the only layer
/// that converts tool failures into text; callers inspect
/// [`Dispatch::status`] and never see the underlying error.
#[derive(Default)]
pub struct ToolRegistry {
    tools: Vec<Registered>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool.
    pub fn register<T: Tool + 'static>(&mut self, tool: T) -> Result<()> {
        self.register_arc(Arc::new(tool))
    }

    /// Register a shared tool. Fails on a duplicate name or an invalid schema.
    pub fn register_arc(&mut self, tool: Arc<dyn Tool>) -> Result<()> {
        let definition = tool.definition();

        if self.contains(&definition.name) {
            return Err(SyllabusError::Tool(format!(
                "Tool '{}' is already registered",
                definition.name
            )));
        }

        let schema = JSONSchema::compile(&definition.input_schema).map_err(|e| {
            SyllabusError::Tool(format!(
                "Tool '{}' has an invalid input schema: {}",
                definition.name, e
            ))
        })?;

        debug!("Registered tool '{}'", definition.name);
        self.tools.push(Registered {
            tool,
            definition,
            schema,
        });
        Ok(())
    }

    /// Check if a tool exists.
    pub fn contains(&self, name: &str) -> bool {
        self.tools.iter().any(|t| t.definition.name == name)
    }

    /// Tool names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.definition.name.as_str()).collect()
    }

    /// Get the number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Definitions of all tools, in registration order.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools.iter().map(|t| t.definition.clone()).collect()
    }

    /// Run the named tool with the given arguments.
    ///
    /// Never fails: an unknown name, a schema violation or a tool error
    /// is reported through the returned text and status.
    pub async fn dispatch(&self, name: &str, arguments: &serde_json::Value) -> Dispatch {
        let Some(entry) = self.tools.iter().find(|t| t.definition.name == name) else {
            warn!("Model requested unknown tool '{}'", name);
            return Dispatch::not_found(name);
        };

        if let Err(errors) = entry.schema.validate(arguments) {
            let details = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            warn!("Rejected arguments for '{}': {}", name, details);
            return Dispatch::failed(format!("invalid arguments for '{}': {}", name, details));
        }

        match entry.tool.execute(arguments).await {
            Ok(output) => {
                debug!("Tool '{}' returned {} bytes", name, output.content.len());
                Dispatch::completed(output.content, output.sources)
            }
            Err(e) => {
                warn!("Tool '{}' failed: {}", name, e);
                Dispatch::failed(e)
            }
        }
    }
}
