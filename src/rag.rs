//! Course question answering.
//!
//! [`RagSystem`] wires the response generator to the course tools and to
//! per-session conversation history.

use crate::config::{Prompts, Settings};
use crate::error::Result;
use crate::generator::ResponseGenerator;
use crate::llm::LanguageModel;
use crate::session::SessionManager;
use crate::store::CourseStore;
use crate::tools::{CourseOutlineTool, CourseSearchTool, Source, ToolRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// An answer with the sources the tools cited while producing it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RagAnswer {
    pub answer: String,
    pub sources: Vec<Source>,
}

/// Summary of the indexed catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CourseAnalytics {
    pub total_courses: usize,
    pub course_titles: Vec<String>,
}

/// Answers course questions with tool-assisted generation.
pub struct RagSystem {
    generator: ResponseGenerator,
    registry: ToolRegistry,
    store: Arc<dyn CourseStore>,
    sessions: SessionManager,
}

impl RagSystem {
    /// Build a system with the search and outline tools registered.
    pub fn new(
        generator: ResponseGenerator,
        store: Arc<dyn CourseStore>,
        max_results: usize,
        sessions: SessionManager,
    ) -> Result<Self> {
        let mut registry = ToolRegistry::new();
        registry.register(CourseSearchTool::new(store.clone(), max_results))?;
        registry.register(CourseOutlineTool::new(store.clone()))?;

        Ok(Self {
            generator,
            registry,
            store,
            sessions,
        })
    }

    /// Build a system from settings around an existing model and store.
    pub fn from_settings(
        settings: &Settings,
        model: Arc<dyn LanguageModel>,
        store: Arc<dyn CourseStore>,
    ) -> Result<Self> {
        let prompts = Prompts::load(
            settings.prompts.custom_dir.as_deref(),
            Some(&settings.prompts.variables),
        )?;
        let rounds = settings.generator.max_tool_rounds;

        let generator = ResponseGenerator::new(
            model,
            settings.llm.model.clone(),
            prompts.generator_system(rounds),
        )
        .with_max_tokens(settings.llm.max_tokens)
        .with_temperature(settings.llm.temperature)
        .with_max_tool_rounds(rounds);

        Self::new(
            generator,
            store,
            settings.search.max_results,
            SessionManager::new(settings.session.max_history, settings.session.max_sessions),
        )
    }

    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    /// Answer a question, using and then extending the session's history.
    #[instrument(skip(self), fields(query = %query))]
    pub async fn query(&self, query: &str, session_id: Option<&str>) -> RagAnswer {
        info!("Processing question: {}", query);

        let prompt = format!("Answer this question about course materials: {}", query);
        let history = session_id.and_then(|id| self.sessions.conversation_history(id));
        let definitions = self.registry.definitions();

        let generation = self
            .generator
            .generate_detailed(
                &prompt,
                history.as_deref(),
                Some(&definitions),
                Some(&self.registry),
            )
            .await;

        debug!(
            rounds = generation.rounds,
            calls = generation.model_calls,
            "Answered with {} sources",
            generation.sources.len()
        );

        if let Some(id) = session_id {
            self.sessions.add_exchange(id, query, &generation.answer);
        }

        RagAnswer {
            answer: generation.answer,
            sources: generation.sources,
        }
    }

    /// Number and titles of indexed courses.
    pub async fn course_analytics(&self) -> Result<CourseAnalytics> {
        let course_titles: Vec<String> = self
            .store
            .courses()
            .await?
            .into_iter()
            .map(|c| c.title)
            .collect();

        Ok(CourseAnalytics {
            total_courses: course_titles.len(),
            course_titles,
        })
    }
}
