//! Ask command implementation.

use super::build_system;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Run the ask command.
pub async fn run_ask(
    question: &str,
    model: Option<String>,
    max_rounds: Option<usize>,
    mut settings: Settings,
) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }
    if let Some(rounds) = max_rounds {
        settings.generator.max_tool_rounds = rounds;
    }

    let system = build_system(&settings).await?;

    let spinner = Output::spinner("Thinking...");
    let response = system.query(question, None).await;
    spinner.finish_and_clear();

    println!("\n{}\n", response.answer);
    Output::sources(&response.sources);

    Ok(())
}
