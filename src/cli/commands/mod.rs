//! CLI command implementations.

mod ask;
mod chat;
mod config;
mod courses;
mod serve;

pub use ask::run_ask;
pub use chat::run_chat;
pub use config::run_config;
pub use courses::run_courses;
pub use serve::run_serve;

use crate::cli::Output;
use crate::config::Settings;
use crate::embedding::OpenAIEmbedder;
use crate::llm::{AnthropicClient, AnthropicConfig};
use crate::rag::RagSystem;
use crate::store::{Catalog, MemoryCourseStore};
use anyhow::Result;
use std::sync::Arc;
use tracing::info;

/// Create the course store and index the configured catalog into it.
///
/// A missing catalog leaves the store empty; the assistant then answers
/// from general knowledge only.
pub(crate) async fn load_store(settings: &Settings) -> Result<Arc<MemoryCourseStore>> {
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
    )?);
    let store = Arc::new(MemoryCourseStore::new(embedder));

    let catalog_path = settings.catalog_path();
    if !catalog_path.exists() {
        Output::warning(&format!(
            "No course catalog at {}. Set search.catalog_path in the config.",
            catalog_path.display()
        ));
        return Ok(store);
    }

    let catalog = Catalog::load(&catalog_path)?;
    let spinner = Output::spinner(&format!(
        "Indexing {} courses ({} chunks)...",
        catalog.courses.len(),
        catalog.chunk_count()
    ));
    let indexed = store.index_catalog(catalog).await;
    spinner.finish_and_clear();

    let stats = indexed?;
    info!("Catalog ready: {} courses, {} chunks", stats.courses, stats.chunks);
    Ok(store)
}

/// Build the full question-answering system from settings.
pub(crate) async fn build_system(settings: &Settings) -> Result<RagSystem> {
    let store = load_store(settings).await?;

    let config = AnthropicConfig::from_env()?
        .with_base_url(settings.llm.base_url.as_str())
        .with_api_version(settings.llm.api_version.as_str())
        .with_timeout(settings.llm.timeout());
    let model = Arc::new(AnthropicClient::new(config)?);

    Ok(RagSystem::from_settings(settings, model, store)?)
}
