//! CLI module for Syllabus.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Syllabus - Course Material Assistant
///
/// Answers questions about indexed course material, searching the courses
/// and reading their outlines when a question needs it.
#[derive(Parser, Debug)]
#[command(name = "syllabus")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Ask a single question about the course material
    Ask {
        /// The question to ask
        question: String,

        /// Model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,

        /// Maximum tool rounds for this question (0 disables tools)
        #[arg(short = 'r', long)]
        max_rounds: Option<usize>,
    },

    /// Start an interactive chat session
    Chat {
        /// Model to use for answer generation
        #[arg(short, long)]
        model: Option<String>,
    },

    /// List indexed courses
    Courses,

    /// Start HTTP API server
    Serve {
        /// Host to bind to
        #[arg(long, default_value = "127.0.0.1")]
        host: String,

        /// Port to bind to
        #[arg(short, long, default_value = "8000")]
        port: u16,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,
}
