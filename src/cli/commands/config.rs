//! Config Command
//!
//! Manage stackscope configuration.
//!
//! Usage:
//!   stackscope config show [-f json]
//!   stackscope config path
//!   stackscope config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::ConfigLoader;
use crate::types::Result;

/// Show the merged effective configuration
pub fn show(format: &str) -> Result<()> {
    ConfigLoader::show_config(format == "json")
}

/// Show configuration paths
pub fn path() -> Result<()> {
    ConfigLoader::show_path();
    Ok(())
}

/// Write a default config file, globally or in the current directory
pub fn init(global: bool, force: bool) -> Result<()> {
    let output = Output::new();
    let result = if global {
        ConfigLoader::init_global(force).map(|dir| ("global", dir))
    } else {
        let root = std::env::current_dir()?;
        ConfigLoader::init_project(&root, force).map(|dir| ("project", dir))
    };

    match result {
        Ok((scope, dir)) => {
            output.success(&format!("Initialized {} configuration", scope));
            output.info(&format!("Config: {}", dir.join("config.toml").display()));
            Ok(())
        }
        Err(e) => {
            output.error("Could not initialize configuration");
            Err(e)
        }
    }
}
