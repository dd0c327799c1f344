//! Scan Command
//!
//! Walk one or more roots, classify every project and print the result.
//!
//! Usage:
//!   stackscope scan [PATHS...] [--services] [--format json]

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::cli::progress::{ConsoleRenderer, clear_line};
use crate::cli::ui::{Output, OutputFormat, render_json, render_text};
use crate::cli::util::load_config;
use crate::config::Config;
use crate::engine::Engine;
use crate::types::{AnalysisResult, Result};

/// Command-line overrides applied on top of the loaded configuration
#[derive(Debug, Clone, Default)]
pub struct ScanOptions {
    pub paths: Vec<PathBuf>,
    pub max_depth: Option<usize>,
    /// Added to the configured ignore patterns
    pub ignore: Vec<String>,
    pub workers: Option<usize>,
    pub services: bool,
    pub content_limit: Option<usize>,
    pub timeout_secs: Option<u64>,
    pub catalog: Option<PathBuf>,
    pub follow_links: bool,
    pub gitignore: bool,
    pub format: OutputFormat,
    pub progress: bool,
}

impl ScanOptions {
    pub fn apply(&self, config: &mut Config) {
        if !self.paths.is_empty() {
            config.scan.roots = self.paths.clone();
        }
        if let Some(depth) = self.max_depth {
            config.scan.max_depth = depth;
        }
        for pattern in &self.ignore {
            if !config.scan.ignore.contains(pattern) {
                config.scan.ignore.push(pattern.clone());
            }
        }
        if self.workers.is_some() {
            config.scan.workers = self.workers;
        }
        if self.services {
            config.services.enabled = true;
        }
        if let Some(limit) = self.content_limit {
            config.scan.content_read_limit = limit;
        }
        if let Some(secs) = self.timeout_secs {
            config.scan.project_timeout_secs = secs;
        }
        if self.catalog.is_some() {
            config.catalog.extra = self.catalog.clone();
        }
        config.scan.follow_links |= self.follow_links;
        config.scan.respect_gitignore |= self.gitignore;
    }
}

/// Run the scan; returns false when any run was cancelled
pub async fn run(config_path: Option<&Path>, options: ScanOptions, quiet: bool) -> Result<bool> {
    let mut config = load_config(config_path)?;
    options.apply(&mut config);
    debug!("Effective scan config: {:?}", config.scan);

    let engine = Engine::new(config)?;
    let output = Output::quiet(quiet);

    let cancel = engine.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling scan");
            cancel.cancel();
        }
    });

    let mut completed = true;
    let roots = engine.config().scan.roots.clone();
    for root in &roots {
        let renderer = (options.progress && !quiet)
            .then(|| ConsoleRenderer::new(engine.progress().clone()).start_render_loop());
        let result = engine.scan(root).await;
        if let Some(handle) = renderer {
            handle.abort();
            clear_line();
        }
        let result = result?;

        completed &= !result.is_cancelled();
        print_result(&result, options.format)?;
        report_warnings(&result, &output);
    }
    Ok(completed)
}

fn print_result(result: &AnalysisResult, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => println!("{}", render_json(result)?),
        OutputFormat::Text => print!("{}", render_text(result)),
    }
    Ok(())
}

fn report_warnings(result: &AnalysisResult, output: &Output) {
    let warnings = result.all_warnings().count();
    if result.is_cancelled() {
        output.warning("Scan cancelled before all projects were classified");
    } else if warnings > 0 {
        output.warning(&format!("{} warnings recorded", warnings));
    } else {
        output.success(&format!(
            "Scanned {} projects",
            result.summary.total_projects
        ));
    }
}
