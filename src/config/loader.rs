//! Configuration Loader (Figment-based)
//!
//! Loads and merges configuration from multiple sources using Figment:
//! 1. Built-in defaults (Serialized)
//! 2. Global config (~/.config/stackscope/config.toml)
//! 3. Project config (.stackscope/config.toml)
//! 4. Environment variables (STACKSCOPE_* prefix, `__` separates sections)

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use super::types::Config;
use crate::types::{Result, ScanError};

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with full resolution chain using Figment:
    /// defaults → global → project → env vars
    pub fn load() -> Result<Config> {
        let global = Self::global_config_path();
        let project = Self::project_config_path();
        Self::load_layers(global.as_deref(), Some(&project), true)
    }

    /// Load configuration from a specific file only (no env overrides)
    pub fn load_from_file(path: &Path) -> Result<Config> {
        if !path.exists() {
            return Err(ScanError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        Self::load_layers(None, Some(path), false)
    }

    fn load_layers(global: Option<&Path>, project: Option<&Path>, with_env: bool) -> Result<Config> {
        let mut figment = Figment::new().merge(Serialized::defaults(Config::default()));

        if let Some(global_path) = global
            && global_path.exists()
        {
            debug!("Loading global config from: {}", global_path.display());
            figment = figment.merge(Toml::file(global_path));
        }

        if let Some(project_path) = project
            && project_path.exists()
        {
            debug!("Loading project config from: {}", project_path.display());
            figment = figment.merge(Toml::file(project_path));
        }

        // STACKSCOPE_SCAN__MAX_DEPTH -> scan.max_depth
        if with_env {
            figment = figment.merge(Env::prefixed("STACKSCOPE_").split("__").lowercase(true));
        }

        let config: Config = figment
            .extract()
            .map_err(|e| ScanError::Config(format!("Configuration error: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    // =========================================================================
    // Path Management
    // =========================================================================

    /// Get path to global config directory (~/.config/stackscope/)
    pub fn global_dir() -> Option<PathBuf> {
        env::var("XDG_CONFIG_HOME")
            .ok()
            .map(PathBuf::from)
            .or_else(|| directories::BaseDirs::new().map(|dirs| dirs.config_dir().to_path_buf()))
            .map(|p| p.join("stackscope"))
    }

    /// Get path to global config file
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_dir().map(|dir| dir.join("config.toml"))
    }

    /// Get path to project config file
    pub fn project_config_path() -> PathBuf {
        Self::project_dir().join("config.toml")
    }

    /// Get project data directory
    pub fn project_dir() -> PathBuf {
        PathBuf::from(".stackscope")
    }

    // =========================================================================
    // Config Commands
    // =========================================================================

    /// Show config file paths
    pub fn show_path() {
        println!("Configuration paths:");
        println!();

        if let Some(global) = Self::global_config_path() {
            let exists = if global.exists() { "✓" } else { "✗" };
            println!("  Global:  {} {}", exists, global.display());
        } else {
            println!("  Global:  (not available)");
        }

        let project = Self::project_config_path();
        let exists = if project.exists() { "✓" } else { "✗" };
        println!("  Project: {} {}", exists, project.display());
    }

    /// Show current effective configuration
    pub fn show_config(as_json: bool) -> Result<()> {
        let config = Self::load()?;

        if as_json {
            println!("{}", serde_json::to_string_pretty(&config)?);
        } else {
            println!(
                "{}",
                toml::to_string_pretty(&config).map_err(|e| ScanError::Config(e.to_string()))?
            );
        }

        Ok(())
    }

    // =========================================================================
    // Initialization
    // =========================================================================

    /// Initialize global configuration
    pub fn init_global(force: bool) -> Result<PathBuf> {
        let global_dir = Self::global_dir().ok_or_else(|| {
            ScanError::Config("Cannot determine global config directory".to_string())
        })?;
        let config_path = global_dir.join("config.toml");
        Self::write_default(&config_path, force)?;
        Ok(global_dir)
    }

    /// Initialize project configuration in `base` (usually the current directory)
    pub fn init_project(base: &Path, force: bool) -> Result<PathBuf> {
        let project_dir = base.join(Self::project_dir());
        let config_path = project_dir.join("config.toml");
        Self::write_default(&config_path, force)?;
        Ok(project_dir)
    }

    fn write_default(config_path: &Path, force: bool) -> Result<()> {
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        if !config_path.exists() || force {
            fs::write(config_path, Self::default_config_toml())?;
            info!("Created config: {}", config_path.display());
        } else {
            info!("Config exists: {}", config_path.display());
        }
        Ok(())
    }

    /// Default config content (TOML)
    fn default_config_toml() -> String {
        r#"# stackscope configuration
# Project settings in .stackscope/config.toml override ~/.config/stackscope/config.toml.
# Environment variables override both, e.g. STACKSCOPE_SCAN__MAX_DEPTH=5.

version = "1.0"

[scan]
max_depth = 3
# workers = 8
content_read_limit = 65536
max_files_per_project = 5000
project_timeout_secs = 60
follow_links = false
respect_gitignore = false

[services]
enabled = false

[catalog]
builtin = true
# extra = "signatures.yaml"
"#
        .to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_template_parses() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, ConfigLoader::default_config_toml()).unwrap();

        let config = ConfigLoader::load_from_file(&path).unwrap();
        assert_eq!(config.version, "1.0");
        assert_eq!(config.scan.max_depth, 3);
        assert!(config.catalog.builtin);
    }

    #[test]
    fn test_project_overrides_global() {
        let temp_dir = TempDir::new().unwrap();
        let global = temp_dir.path().join("global.toml");
        let project = temp_dir.path().join("project.toml");
        fs::write(&global, "[scan]\nmax_depth = 7\nworkers = 2\n").unwrap();
        fs::write(&project, "[scan]\nmax_depth = 5\n\n[services]\nenabled = true\n").unwrap();

        let config = ConfigLoader::load_layers(Some(&global), Some(&project), false).unwrap();
        assert_eq!(config.scan.max_depth, 5);
        assert_eq!(config.scan.workers, Some(2));
        assert!(config.services.enabled);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");
        fs::write(&path, "[scan]\ncontent_read_limit = 0\n").unwrap();

        let err = ConfigLoader::load_from_file(&path).unwrap_err();
        assert!(matches!(err, ScanError::Config(_)));
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = ConfigLoader::load_from_file(Path::new("/nonexistent/stackscope.toml"))
            .unwrap_err();
        assert!(err.is_fatal());
    }

    #[test]
    fn test_init_project() {
        let temp_dir = TempDir::new().unwrap();
        let dir = ConfigLoader::init_project(temp_dir.path(), false).unwrap();

        assert!(dir.join("config.toml").exists());
        assert!(ConfigLoader::load_from_file(&dir.join("config.toml")).is_ok());

        fs::write(dir.join("config.toml"), "# edited\n").unwrap();
        ConfigLoader::init_project(temp_dir.path(), false).unwrap();
        assert_eq!(fs::read_to_string(dir.join("config.toml")).unwrap(), "# edited\n");
    }
}
