//! Interactive chat command.

use super::build_system;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;
use console::style;
use std::io::{self, BufRead, Write};

/// Run the interactive chat command.
///
/// The whole conversation shares one session, so follow-up questions see
/// the most recent exchanges.
pub async fn run_chat(model: Option<String>, mut settings: Settings) -> Result<()> {
    if let Err(e) = preflight::check(Operation::Ask) {
        Output::error(&format!("{}", e));
        return Err(e.into());
    }

    if let Some(model) = model {
        settings.llm.model = model;
    }

    let system = build_system(&settings).await?;
    let session = system.sessions().create_session();

    println!("\n{}", style("Syllabus Chat").bold().cyan());
    println!(
        "{}\n",
        style("Ask about your courses, or 'exit' to quit. Use 'clear' to reset the conversation.")
            .dim()
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("You:").green().bold());
        stdout.flush()?;

        let mut input = String::new();
        if stdin.lock().read_line(&mut input)? == 0 {
            break;
        }

        let input = input.trim();

        if input.is_empty() {
            continue;
        }

        if input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit") {
            Output::info("Goodbye!");
            break;
        }

        if input.eq_ignore_ascii_case("clear") {
            system.sessions().clear_session(&session);
            Output::info("Conversation history cleared.");
            continue;
        }

        let spinner = Output::spinner("Thinking...");
        let response = system.query(input, Some(&session)).await;
        spinner.finish_and_clear();

        println!("\n{} {}", style("Syllabus:").cyan().bold(), response.answer);
        Output::sources(&response.sources);
        println!();
    }

    Ok(())
}
