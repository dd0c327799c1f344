//! Project classification
//!
//! Evaluates the signature catalog against one project root and produces a
//! [`ProjectResult`]: ranked framework matches, primary language, project type,
//! file statistics and the service facts the microservice detector consumes.
//!
//! Classification never fails because of individual files. Binary or unreadable
//! files become per-project warnings; only a missing or unreadable project root,
//! an expired time budget or cancellation return an error.

pub mod content;
pub mod facts;
pub mod language;
pub mod matcher;

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::debug;

use crate::analyzer::scanner::{FileScanner, ProjectListing, WalkOptions};
use crate::catalog::Catalog;
use crate::config::ScanConfig;
use crate::constants::classify::{DEFAULT_CONTENT_READ_LIMIT, DEFAULT_MAX_FILES_PER_PROJECT};
use crate::engine::Budget;
use crate::types::{
    Category, ErrorKind, FileStats, ProjectId, ProjectResult, ProjectRoot, Result,
    ScanError, ScanIssue,
};

pub use content::ContentCache;
pub use facts::{extract_facts, is_likely_service_url, normalize_database_url};
pub use language::{language_applies, language_histogram, present_languages, primary_language};
pub use matcher::{MatchContext, compare_matches, confidence, evaluate, rank_matches};

/// Limits and traversal settings for classification
#[derive(Debug, Clone)]
pub struct ClassifyOptions {
    pub content_read_limit: usize,
    pub max_files: usize,
    pub walk: WalkOptions,
    /// Base for ignore patterns; the project root itself when unset
    pub scan_root: Option<PathBuf>,
}

impl Default for ClassifyOptions {
    fn default() -> Self {
        Self {
            content_read_limit: DEFAULT_CONTENT_READ_LIMIT,
            max_files: DEFAULT_MAX_FILES_PER_PROJECT,
            walk: WalkOptions::default(),
            scan_root: None,
        }
    }
}

impl ClassifyOptions {
    pub fn from_config(config: &ScanConfig, scan_root: &Path) -> Result<Self> {
        Ok(Self {
            content_read_limit: config.content_read_limit,
            max_files: config.max_files_per_project,
            walk: WalkOptions::from_config(config)?,
            scan_root: Some(scan_root.to_path_buf()),
        })
    }
}

/// Classifies project roots against one catalog snapshot
pub struct Classifier {
    catalog: Arc<Catalog>,
    options: ClassifyOptions,
}

impl Classifier {
    pub fn new(catalog: Arc<Catalog>, options: ClassifyOptions) -> Self {
        Self { catalog, options }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn classify(&self, root: &ProjectRoot, budget: &Budget) -> Result<ProjectResult> {
        ensure_readable(&root.path)?;
        budget.check(&root.path)?;

        let listing = self.list_files(root, budget)?;
        let mut cache = ContentCache::new(self.options.content_read_limit);
        let mut ctx = MatchContext {
            root: &root.path,
            listing: &listing,
            cache: &mut cache,
            budget,
        };

        // Frameworks and tooling first; the language guess narrows the testing pass
        let mut matches = Vec::new();
        for signature in self.catalog.all_signatures() {
            if signature.category == Category::Testing {
                continue;
            }
            if let Some(m) = evaluate(signature, &mut ctx)? {
                matches.push(m);
            }
        }
        rank_matches(&mut matches);

        let mut stats = file_stats(&listing);
        let primary = primary_language(&matches, &stats);
        let present = present_languages(&stats, primary);

        for signature in self.catalog.by_category(Category::Testing) {
            if !language_applies(signature.language, &present) {
                continue;
            }
            if let Some(m) = evaluate(signature, &mut ctx)? {
                matches.push(m);
            }
        }
        rank_matches(&mut matches);

        let (facts, fact_issues) = extract_facts(&mut ctx)?;
        let project_type =
            language::project_type(root, &matches, &self.catalog, &facts, primary, &listing);

        stats.line_count = cache.line_count();
        stats.skipped_files = cache.skipped();

        let mut issues = listing.issues.clone();
        if listing.truncated {
            issues.push(ScanIssue::at(
                ErrorKind::FileSkipped,
                &root.path,
                format!(
                    "file listing truncated at {} files",
                    self.options.max_files
                ),
            ));
        }
        issues.extend(cache.into_issues());
        issues.extend(fact_issues);

        debug!(
            "Classified {} as {}/{} with {} matches",
            root.relative_path,
            project_type,
            primary,
            matches.len()
        );

        Ok(ProjectResult {
            id: root.id,
            name: root.name(),
            root: root.clone(),
            primary_language: primary,
            project_type,
            matches,
            stats,
            facts,
            issues,
            error: None,
        })
    }

    fn list_files(&self, root: &ProjectRoot, budget: &Budget) -> Result<ProjectListing> {
        let scan_root = self.options.scan_root.as_deref().unwrap_or(&root.path);
        let remaining_depth = self.options.walk.max_depth.saturating_sub(root.depth);
        FileScanner::new(&root.path)
            .with_options(&self.options.walk, scan_root)
            .with_max_files(self.options.max_files)
            .with_nested_depth(remaining_depth)
            .scan(budget)
    }
}

/// Classify one project root with default limits
pub fn classify(
    root: &ProjectRoot,
    catalog: Arc<Catalog>,
    content_read_limit: usize,
) -> Result<ProjectResult> {
    let options = ClassifyOptions {
        content_read_limit,
        ..Default::default()
    };
    Classifier::new(catalog, options).classify(root, &Budget::unlimited())
}

/// Project root for a bare directory, outside of a walk
pub fn project_root_at(path: &Path) -> Result<ProjectRoot> {
    ensure_readable(path)?;
    let markers = crate::analyzer::scanner::marker_files(path)
        .map_err(|e| ScanError::project_unreadable(path, e.to_string()))?;
    Ok(ProjectRoot {
        id: ProjectId::new(0),
        path: path.to_path_buf(),
        relative_path: String::new(),
        markers,
        depth: 0,
    })
}

fn ensure_readable(path: &Path) -> Result<()> {
    if !path.is_dir() {
        return Err(ScanError::project_unreadable(path, "not a directory"));
    }
    std::fs::read_dir(path)
        .map(|_| ())
        .map_err(|e| ScanError::project_unreadable(path, e.to_string()))
}

fn file_stats(listing: &ProjectListing) -> FileStats {
    let mut extensions: BTreeMap<String, usize> = BTreeMap::new();
    for file in &listing.files {
        if let Some(ext) = &file.extension {
            *extensions.entry(ext.clone()).or_insert(0) += 1;
        }
    }
    FileStats {
        file_count: listing.files.len(),
        total_bytes: listing.files.iter().map(|f| f.size).sum(),
        line_count: 0,
        extensions,
        skipped_files: 0,
    }
}
