//! Configuration Types
//!
//! All configuration structures with sensible defaults.
//! Supports global (~/.config/stackscope/) and project (.stackscope/) level configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::constants::{classify, walk, workers};
use crate::types::{Result, ScanError};

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Configuration version
    pub version: String,

    /// Traversal and classification settings
    pub scan: ScanConfig,

    /// Microservice detection settings
    pub services: ServicesConfig,

    /// Signature catalog settings
    pub catalog: CatalogConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
            scan: ScanConfig::default(),
            services: ServicesConfig::default(),
            catalog: CatalogConfig::default(),
        }
    }
}

impl Config {
    /// Validate configuration values are within acceptable ranges.
    /// Returns `ScanError::Config` on validation failure.
    pub fn validate(&self) -> Result<()> {
        if self.scan.max_depth > walk::MAX_DEPTH_LIMIT {
            return Err(ScanError::Config(format!(
                "scan.max_depth must be at most {}, got {}",
                walk::MAX_DEPTH_LIMIT,
                self.scan.max_depth
            )));
        }

        if self.scan.content_read_limit == 0 {
            return Err(ScanError::Config(
                "scan.content_read_limit must be greater than 0".to_string(),
            ));
        }

        if self.scan.max_files_per_project == 0 {
            return Err(ScanError::Config(
                "scan.max_files_per_project must be greater than 0".to_string(),
            ));
        }

        if let Some(n) = self.scan.workers
            && (n == 0 || n > workers::MAX_WORKERS)
        {
            return Err(ScanError::Config(format!(
                "scan.workers must be between 1 and {}, got {}",
                workers::MAX_WORKERS,
                n
            )));
        }

        for pattern in &self.scan.ignore {
            glob::Pattern::new(pattern).map_err(|e| {
                ScanError::Config(format!("Invalid ignore pattern '{}': {}", pattern, e))
            })?;
        }

        if self.scan.roots.is_empty() {
            return Err(ScanError::Config(
                "scan.roots must list at least one directory".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Scan Configuration
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Directories to scan; each produces its own analysis result
    pub roots: Vec<PathBuf>,

    /// Maximum directory depth below a root (root = 0)
    pub max_depth: usize,

    /// Glob patterns matched against directory names and relative paths
    pub ignore: Vec<String>,

    /// Worker pool size (None = available hardware parallelism)
    pub workers: Option<usize>,

    /// Bytes read per candidate file for content rules
    pub content_read_limit: usize,

    /// Maximum files listed per project
    pub max_files_per_project: usize,

    /// Per-project time budget in seconds (0 disables)
    pub project_timeout_secs: u64,

    /// Follow symlinked directories (cycles are still detected)
    pub follow_links: bool,

    /// Additionally honor .gitignore files while walking
    pub respect_gitignore: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            max_depth: walk::DEFAULT_MAX_DEPTH,
            ignore: walk::DEFAULT_IGNORE.iter().map(|s| s.to_string()).collect(),
            workers: None,
            content_read_limit: classify::DEFAULT_CONTENT_READ_LIMIT,
            max_files_per_project: classify::DEFAULT_MAX_FILES_PER_PROJECT,
            project_timeout_secs: classify::DEFAULT_PROJECT_TIMEOUT_SECS,
            follow_links: false,
            respect_gitignore: false,
        }
    }
}

impl ScanConfig {
    /// Effective worker count
    pub fn worker_count(&self) -> usize {
        self.workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(workers::FALLBACK_WORKERS)
        })
    }

    pub fn project_timeout(&self) -> Option<Duration> {
        (self.project_timeout_secs > 0).then(|| Duration::from_secs(self.project_timeout_secs))
    }
}

// =============================================================================
// Services & Catalog
// =============================================================================

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServicesConfig {
    /// Run microservice detection after classification
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct CatalogConfig {
    /// Include the built-in signatures
    pub builtin: bool,

    /// Extra signature file (YAML or TOML); entries override built-ins by id
    pub extra: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            builtin: true,
            extra: None,
        }
    }
}
