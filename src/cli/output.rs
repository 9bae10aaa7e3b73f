//! CLI output formatting utilities.

use crate::tools::Source;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    /// Print an info message.
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    /// Print a success message.
    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    /// Print a warning message.
    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    /// Print an error message.
    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print a header.
    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    /// Print a key-value pair.
    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a course line.
    pub fn course(title: &str, lessons: usize, instructor: Option<&str>) {
        let by = instructor.map(|i| format!(", {}", i)).unwrap_or_default();
        println!(
            "  {} {} ({} lessons{})",
            style("*").cyan(),
            style(title).bold(),
            lessons,
            by
        );
    }

    /// Print the sources cited by an answer.
    pub fn sources(sources: &[Source]) {
        if sources.is_empty() {
            return;
        }
        Self::header("Sources");
        for source in sources {
            match &source.link {
                Some(link) => {
                    println!("  {} {} {}", style("*").cyan(), source.text, style(link).dim())
                }
                None => println!("  {} {}", style("*").cyan(), source.text),
            }
        }
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}
