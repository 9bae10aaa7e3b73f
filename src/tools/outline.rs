//! Course outline tool.

use super::{Source, Tool, ToolOutput};
use crate::error::{Result, SyllabusError};
use crate::llm::ToolDefinition;
use crate::store::{Course, CourseStore};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;

/// Tool name offered to the model.
pub const OUTLINE_TOOL_NAME: &str = "get_course_outline";

#[derive(Debug, Deserialize)]
struct OutlineArgs {
    course_title: String,
}

/// Returns a course's title, link, instructor and numbered lesson list.
pub struct CourseOutlineTool {
    store: Arc<dyn CourseStore>,
}

impl CourseOutlineTool {
    pub fn new(store: Arc<dyn CourseStore>) -> Self {
        Self { store }
    }
}

fn render_outline(course: &Course) -> String {
    let mut lines = vec![format!("Course: {}", course.title)];
    if let Some(link) = &course.link {
        lines.push(format!("Link: {}", link));
    }
    if let Some(instructor) = &course.instructor {
        lines.push(format!("Instructor: {}", instructor));
    }
    lines.push(format!("Lessons ({}):", course.lessons.len()));
    lines.extend(
        course
            .lessons
            .iter()
            .map(|lesson| format!("  Lesson {}: {}", lesson.number, lesson.title)),
    );
    lines.join("\n")
}

#[async_trait]
impl Tool for CourseOutlineTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            OUTLINE_TOOL_NAME,
            "Get the outline of a course: its title, link, instructor \
             and the numbered list of lessons",
            json!({
                "type": "object",
                "properties": {
                    "course_title": {
                        "type": "string",
                        "description":
                            "Course title (partial matches work, e.g. 'MCP', 'Computer Use')"
                    }
                },
                "required": ["course_title"]
            }),
        )
    }

    async fn execute(&self, arguments: &serde_json::Value) -> Result<ToolOutput> {
        let args: OutlineArgs = serde_json::from_value(arguments.clone())
            .map_err(|e| SyllabusError::InvalidInput(format!("outline arguments: {}", e)))?;

        let Some(title) = self.store.resolve_course_name(&args.course_title).await? else {
            return Ok(ToolOutput::text(format!(
                "No course found matching '{}'",
                args.course_title
            )));
        };

        let course = self
            .store
            .course(&title)
            .await?
            .ok_or_else(|| SyllabusError::CourseNotFound(title.clone()))?;

        let source = Source {
            text: course.title.clone(),
            link: course.link.clone(),
        };
        Ok(ToolOutput::with_sources(render_outline(&course), vec![source]))
    }
}
