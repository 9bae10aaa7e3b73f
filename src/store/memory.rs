//! In-memory course store.
//!
//! Holds course metadata and embedded content chunks for the lifetime of
//! the process. Suitable for catalogs that fit comfortably in memory.

use super::{
    cosine_similarity, Catalog, CatalogCourse, Course, CourseStore, Lesson, SearchHit, SearchQuery,
};
use crate::embedding::Embedder;
use crate::error::{Result, SyllabusError};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, info, instrument};

/// One embedded chunk of lesson content.
#[derive(Debug, Clone)]
struct Chunk {
    course_title: String,
    lesson_number: Option<u32>,
    content: String,
    embedding: Vec<f32>,
}

#[derive(Debug, Clone)]
struct IndexedCourse {
    course: Course,
    title_embedding: Vec<f32>,
}

#[derive(Default)]
struct State {
    courses: Vec<IndexedCourse>,
    chunks: Vec<Chunk>,
}

/// Counts from an indexing run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IndexStats {
    pub courses: usize,
    pub chunks: usize,
}

/// In-memory course store backed by an embedder.
pub struct MemoryCourseStore {
    embedder: Arc<dyn Embedder>,
    state: RwLock<State>,
}

impl MemoryCourseStore {
    /// Create an empty store.
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self {
            embedder,
            state: RwLock::new(State::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>> {
        self.state
            .read()
            .map_err(|_| SyllabusError::Store("store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>> {
        self.state
            .write()
            .map_err(|_| SyllabusError::Store("store lock poisoned".to_string()))
    }

    /// Embed and index every course in a catalog.
    ///
    /// A course whose title is already indexed is replaced, chunks included.
    #[instrument(skip(self, catalog), fields(courses = catalog.courses.len()))]
    pub async fn index_catalog(&self, catalog: Catalog) -> Result<IndexStats> {
        catalog.validate()?;

        let mut stats = IndexStats::default();
        for course in catalog.courses {
            stats.chunks += self.index_course(course).await?;
            stats.courses += 1;
        }

        info!("Indexed {} courses ({} chunks)", stats.courses, stats.chunks);
        Ok(stats)
    }

    async fn index_course(&self, entry: CatalogCourse) -> Result<usize> {
        // Title first, then every chunk in lesson order, in one batch.
        let mut texts = vec![entry.title.clone()];
        let mut owners = Vec::new();
        for lesson in &entry.lessons {
            for chunk in &lesson.chunks {
                texts.push(chunk.clone());
                owners.push(lesson.number);
            }
        }

        let mut embeddings = self.embedder.embed_batch(&texts).await?.into_iter();
        let title_embedding = embeddings.next().ok_or_else(|| {
            SyllabusError::Embedding("No embedding returned for course title".to_string())
        })?;

        let chunks: Vec<Chunk> = texts
            .into_iter()
            .skip(1)
            .zip(owners)
            .zip(embeddings)
            .map(|((content, lesson_number), embedding)| Chunk {
                course_title: entry.title.clone(),
                lesson_number: Some(lesson_number),
                content,
                embedding,
            })
            .collect();
        let chunk_total = chunks.len();

        let mut lessons: Vec<Lesson> = entry
            .lessons
            .into_iter()
            .map(|l| Lesson {
                number: l.number,
                title: l.title,
                link: l.link,
            })
            .collect();
        lessons.sort_by_key(|l| l.number);

        let course = Course {
            title: entry.title,
            link: entry.link,
            instructor: entry.instructor,
            lessons,
            indexed_at: Utc::now(),
        };

        let mut state = self.write()?;
        state.chunks.retain(|c| c.course_title != course.title);
        state.chunks.extend(chunks);
        match state.courses.iter_mut().find(|c| c.course.title == course.title) {
            Some(existing) => {
                debug!("Replacing indexed course '{}'", course.title);
                *existing = IndexedCourse { course, title_embedding };
            }
            None => state.courses.push(IndexedCourse { course, title_embedding }),
        }

        Ok(chunk_total)
    }

    /// Case-insensitive exact match, then the first title containing the name.
    fn match_title_lexically(state: &State, name: &str) -> Option<String> {
        let needle = name.trim().to_lowercase();
        if needle.is_empty() {
            return None;
        }

        state
            .courses
            .iter()
            .find(|c| c.course.title.to_lowercase() == needle)
            .or_else(|| {
                state
                    .courses
                    .iter()
                    .find(|c| c.course.title.to_lowercase().contains(&needle))
            })
            .map(|c| c.course.title.clone())
    }
}

#[async_trait]
impl CourseStore for MemoryCourseStore {
    #[instrument(
        skip(self, query),
        fields(
            text = %query.text,
            course = ?query.course_title,
            lesson = ?query.lesson_number
        )
    )]
    async fn search(&self, query: &SearchQuery) -> Result<Vec<SearchHit>> {
        let empty = self.read()?.chunks.is_empty();
        if empty || query.limit == 0 {
            return Ok(Vec::new());
        }

        let query_embedding = self.embedder.embed(&query.text).await?;

        let state = self.read()?;
        let mut hits: Vec<SearchHit> = state
            .chunks
            .iter()
            .filter(|c| {
                query
                    .course_title
                    .as_ref()
                    .map_or(true, |title| &c.course_title == title)
            })
            .filter(|c| query.lesson_number.map_or(true, |n| c.lesson_number == Some(n)))
            .map(|c| {
                let link = state
                    .courses
                    .iter()
                    .find(|ic| ic.course.title == c.course_title)
                    .and_then(|ic| ic.course.link_for(c.lesson_number));
                SearchHit {
                    course_title: c.course_title.clone(),
                    lesson_number: c.lesson_number,
                    content: c.content.clone(),
                    link,
                    score: cosine_similarity(&query_embedding, &c.embedding),
                }
            })
            .collect();

        hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        hits.truncate(query.limit);

        debug!("Search returned {} hits", hits.len());
        Ok(hits)
    }

    async fn resolve_course_name(&self, name: &str) -> Result<Option<String>> {
        {
            let state = self.read()?;
            if state.courses.is_empty() {
                return Ok(None);
            }
            if let Some(title) = Self::match_title_lexically(&state, name) {
                return Ok(Some(title));
            }
        }

        let name_embedding = self.embedder.embed(name).await?;

        let state = self.read()?;
        let best = state
            .courses
            .iter()
            .map(|c| (c, cosine_similarity(&name_embedding, &c.title_embedding)))
            .filter(|(_, score)| *score > 0.0)
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(c, _)| c.course.title.clone());

        Ok(best)
    }

    async fn course(&self, title: &str) -> Result<Option<Course>> {
        let state = self.read()?;
        Ok(state
            .courses
            .iter()
            .find(|c| c.course.title == title)
            .map(|c| c.course.clone()))
    }

    async fn courses(&self) -> Result<Vec<Course>> {
        let state = self.read()?;
        Ok(state.courses.iter().map(|c| c.course.clone()).collect())
    }

    async fn chunk_count(&self) -> Result<usize> {
        Ok(self.read()?.chunks.len())
    }
}
