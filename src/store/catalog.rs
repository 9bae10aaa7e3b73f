//! Pre-chunked course catalog files.
//!
//! A catalog is a JSON document listing courses, their lessons and the
//! text chunks of each lesson, ready to be embedded and indexed.

use crate::error::{Result, SyllabusError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    pub courses: Vec<CatalogCourse>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogCourse {
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub instructor: Option<String>,
    #[serde(default)]
    pub lessons: Vec<CatalogLesson>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogLesson {
    pub number: u32,
    pub title: String,
    #[serde(default)]
    pub link: Option<String>,
    #[serde(default)]
    pub chunks: Vec<String>,
}

impl Catalog {
    /// Load and validate a catalog from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let catalog: Catalog = serde_json::from_str(&content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Course titles must be non-empty and unique; lesson numbers unique per course.
    pub fn validate(&self) -> Result<()> {
        let mut titles = HashSet::new();
        for course in &self.courses {
            if course.title.trim().is_empty() {
                return Err(SyllabusError::InvalidInput(
                    "Catalog contains a course with an empty title".to_string(),
                ));
            }
            if !titles.insert(course.title.as_str()) {
                return Err(SyllabusError::InvalidInput(format!(
                    "Duplicate course title in catalog: {}",
                    course.title
                )));
            }

            let mut numbers = HashSet::new();
            for lesson in &course.lessons {
                if !numbers.insert(lesson.number) {
                    return Err(SyllabusError::InvalidInput(format!(
                        "Duplicate lesson {} in course '{}'",
                        lesson.number, course.title
                    )));
                }
            }
        }
        Ok(())
    }

    /// Total number of content chunks across all courses.
    pub fn chunk_count(&self) -> usize {
        self.courses
            .iter()
            .flat_map(|c| &c.lessons)
            .map(|l| l.chunks.len())
            .sum()
    }
}
