//! Courses command implementation.

use super::load_store;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::store::CourseStore;
use anyhow::Result;

/// List the courses in the configured catalog.
pub async fn run_courses(settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Index) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    let store = load_store(&settings).await?;
    let courses = store.courses().await?;

    if courses.is_empty() {
        Output::info("No courses indexed.");
        return Ok(());
    }

    Output::header(&format!("Courses ({})", courses.len()));
    for course in &courses {
        Output::course(&course.title, course.lessons.len(), course.instructor.as_deref());
    }
    println!();
    Output::kv("Chunks", &store.chunk_count().await?.to_string());

    Ok(())
}
