//! Syllabus - Course Material Assistant
//!
//! Answers questions about course material with a language model that can
//! search the indexed courses and read course outlines before it answers.
//!
//! # Overview
//!
//! A question goes to the model together with the course tools. The model
//! either answers directly or asks for tools; requested tools run in order
//! and their results go back to the model, for a bounded number of rounds.
//! Every path ends in an answer string, failures included.
//!
//! # Architecture
//!
//! - `config` - Settings and prompt templates
//! - `llm` - Model message types, the `LanguageModel` seam, Anthropic client
//! - `tools` - Tool contract, registry and the course search/outline tools
//! - `generator` - The sequential tool-calling response generator
//! - `embedding` - Embedding generation
//! - `store` - Course catalog and the in-memory course store
//! - `session` - Per-session conversation history
//! - `rag` - Ties generator, tools, store and sessions together
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use syllabus::config::Settings;
//! use syllabus::embedding::OpenAIEmbedder;
//! use syllabus::llm::{AnthropicClient, AnthropicConfig};
//! use syllabus::rag::RagSystem;
//! use syllabus::store::{Catalog, MemoryCourseStore};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let store = Arc::new(MemoryCourseStore::new(Arc::new(OpenAIEmbedder::new()?)));
//!     store.index_catalog(Catalog::load(&settings.catalog_path())?).await?;
//!
//!     let model = Arc::new(AnthropicClient::new(AnthropicConfig::from_env()?)?);
//!     let system = RagSystem::from_settings(&settings, model, store)?;
//!
//!     let answer = system.query("What does lesson 1 of the MCP course cover?", None).await;
//!     println!("{}", answer.answer);
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod generator;
pub mod llm;
pub mod openai;
pub mod rag;
pub mod session;
pub mod store;
pub mod tools;

pub use error::{Result, SyllabusError};
