//! Configuration module for Syllabus.
//!
//! Handles loading and managing application settings and prompt templates.

mod prompts;
mod settings;

pub use prompts::{GeneratorPrompts, Prompts};
pub use settings::{
    EmbeddingSettings, GeneralSettings, GeneratorSettings, LlmSettings, PromptSettings,
    SearchSettings, SessionSettings, Settings,
};
