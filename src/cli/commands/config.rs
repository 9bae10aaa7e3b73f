//! Config command implementation.

use crate::cli::ConfigAction;
use crate::config::Settings;
use anyhow::Result;
use std::path::Path;

/// Run the config command.
pub fn run_config(
    action: &ConfigAction,
    settings: &Settings,
    config_path: Option<&Path>,
) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", settings.to_toml()?);
        }

        ConfigAction::Path => {
            let path = config_path
                .map(Path::to_path_buf)
                .unwrap_or_else(Settings::default_config_path);
            println!("{}", path.display());
        }
    }

    Ok(())
}
