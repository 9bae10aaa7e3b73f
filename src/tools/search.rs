//! Course content search tool.

use super::{Source, Tool, ToolOutput};
use crate::error::{Result, SyllabusError};
use crate::llm::ToolDefinition;
use crate::store::{CourseStore, SearchHit, SearchQuery};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::instrument;

/// Tool name offered to the model.
pub const SEARCH_TOOL_NAME: &str = "search_course_content";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    course_name: Option<String>,
    #[serde(default)]
    lesson_number: Option<u32>,
}

/// Semantic search over indexed course content, with optional course and
/// lesson filters.
pub struct CourseSearchTool {
    store: Arc<dyn CourseStore>,
    max_results: usize,
}

impl CourseSearchTool {
    pub fn new(store: Arc<dyn CourseStore>, max_results: usize) -> Self {
        Self { store, max_results }
    }

    fn format_hits(hits: &[SearchHit]) -> ToolOutput {
        let mut sources = Vec::with_capacity(hits.len());
        let blocks: Vec<String> = hits
            .iter()
            .map(|hit| {
                let label = match hit.lesson_number {
                    Some(n) => format!("{} - Lesson {}", hit.course_title, n),
                    None => hit.course_title.clone(),
                };
                sources.push(Source {
                    text: label.clone(),
                    link: hit.link.clone(),
                });
                format!("[{}]\n{}", label, hit.content)
            })
            .collect();

        ToolOutput::with_sources(blocks.join("\n\n"), sources)
    }
}

/// "No relevant content found" with whatever filters were applied.
fn no_results_message(course_name: Option<&str>, lesson_number: Option<u32>) -> String {
    let mut message = String::from("No relevant content found");
    if let Some(course) = course_name {
        message.push_str(&format!(" in course '{}'", course));
    }
    if let Some(lesson) = lesson_number {
        message.push_str(&format!(" in lesson {}", lesson));
    }
    message.push('.');
    message
}

#[async_trait]
impl Tool for CourseSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            SEARCH_TOOL_NAME,
            "Search course materials with smart course name matching and lesson filtering",
            json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "What to search for in the course content"
                    },
                    "course_name": {
                        "type": "string",
                        "description":
                            "Course title (partial matches work, e.g. 'MCP', 'Introduction')"
                    },
                    "lesson_number": {
                        "type": "integer",
                        "minimum": 0,
                        "description": "Specific lesson number to search within (e.g. 1, 2, 3)"
                    }
                },
                "required": ["query"]
            }),
        )
    }

    #[instrument(skip(self, arguments))]
    async fn execute(&self, arguments: &serde_json::Value) -> Result<ToolOutput> {
        let args: SearchArgs = serde_json::from_value(arguments.clone())
            .map_err(|e| SyllabusError::InvalidInput(format!("search arguments: {}", e)))?;

        let mut query = SearchQuery::new(&args.query, self.max_results);

        if let Some(name) = args.course_name.as_deref() {
            match self.store.resolve_course_name(name).await? {
                Some(title) => query = query.in_course(title),
                None => return Ok(ToolOutput::text(format!("No course found matching '{}'", name))),
            }
        }
        if let Some(lesson) = args.lesson_number {
            query = query.in_lesson(lesson);
        }

        let hits = self.store.search(&query).await?;
        if hits.is_empty() {
            return Ok(ToolOutput::text(no_results_message(
                args.course_name.as_deref(),
                args.lesson_number,
            )));
        }

        Ok(Self::format_hits(&hits))
    }
}
