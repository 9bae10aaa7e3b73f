//! Course knowledge base abstraction.
//!
//! Provides a trait-based interface over indexed course material so the
//! search and outline tools can be backed by any store.

mod catalog;
mod memory;

pub use catalog::{Catalog, CatalogCourse, CatalogLesson};
pub use memory::{IndexStats, MemoryCourseStore};

use crate::error::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A lesson within a course.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub number: u32,
    pub title: String,
    pub link: Option<String>,
}

/// Course metadata as indexed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    /// Full course title; unique within a store.
    pub title: String,
    pub link: Option<String>,
    pub instructor: Option<String>,
    /// Lessons ordered by number.
    pub lessons: Vec<Lesson>,
    /// When this course was indexed.
    pub indexed_at: DateTime<Utc>,
}

impl Course {
    /// Look up a lesson by number.
    pub fn lesson(&self, number: u32) -> Option<&Lesson> {
        self.lessons.iter().find(|l| l.number == number)
    }

    /// Link for a lesson, falling back to the course link.
    pub fn link_for(&self, lesson_number: Option<u32>) -> Option<String> {
        lesson_number
            .and_then(|n| self.lesson(n))
            .and_then(|l| l.link.clone())
            .or_else(|| self.link.clone())
    }
}

/// A semantic search request against course content.
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    /// Restrict to this exact (already resolved) course title.
    pub course_title: Option<String>,
    pub lesson_number: Option<u32>,
    pub limit: usize,
}

impl SearchQuery {
    /// Create an unfiltered query.
    pub fn new(text: impl Into<String>, limit: usize) -> Self {
        Self {
            text: text.into(),
            course_title: None,
            lesson_number: None,
            limit,
        }
    }

    /// Restrict results to one course.
    pub fn in_course(mut self, title: impl Into<String>) -> Self {
        self.course_title = Some(title.into());
        self
    }

    /// Restrict results to one lesson number.
    pub fn in_lesson(mut self, number: u32) -> Self {
        self.lesson_number = Some(number);
        self
    }
}

/// A matched chunk of course content with its score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub course_title: String,
    pub lesson_number: Option<u32>,
    pub content: String,
    /// Lesson link, or course link when the lesson has none.
    pub link: Option<String>,
    /// Similarity score (higher is better).
    pub score: f32,
}

/// Trait for course store implementations.
#[async_trait]
pub trait CourseStore: Send + Sync {
    /// Search for chunks similar to the query text.
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>>;

    /// Resolve a possibly partial course name to an indexed course title.
    async fn resolve_course_name(&self, name: &str) -> Result<Option<String>>;

    /// Get a course by exact title.
    async fn course(&self, title: &str) -> Result<Option<Course>>;

    /// All indexed courses, in indexing order.
    async fn courses(&self) -> Result<Vec<Course>>;

    /// Total number of indexed content chunks.
    async fn chunk_count(&self) -> Result<usize>;
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
