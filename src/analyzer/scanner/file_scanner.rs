use ignore::WalkBuilder;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use super::ignore_rules::IgnoreMatcher;
use super::walker::{WalkOptions, has_manifest, marker_files};
use crate::engine::Budget;
use crate::types::{ErrorKind, Result, ScanIssue, relative_string};

/// Lists the files that belong to one project
///
/// Ignored entries and the subtrees of nested project roots are excluded. A
/// nested root is a subdirectory with its own manifest that the walker would
/// report separately (within `nested_depth`). Descriptor-only subdirectories
/// stay in the listing.
pub struct FileScanner {
    root: PathBuf,
    scan_root: PathBuf,
    ignore: IgnoreMatcher,
    max_files: usize,
    nested_depth: Option<usize>,
    follow_links: bool,
    respect_gitignore: bool,
}

impl FileScanner {
    pub fn new<P: AsRef<Path>>(root: P) -> Self {
        let root = root.as_ref().to_path_buf();
        Self {
            scan_root: root.clone(),
            root,
            ignore: IgnoreMatcher::default(),
            max_files: usize::MAX,
            nested_depth: None,
            follow_links: false,
            respect_gitignore: false,
        }
    }

    /// Apply walk options; ignore patterns match paths relative to `scan_root`
    pub fn with_options(mut self, options: &WalkOptions, scan_root: &Path) -> Self {
        self.ignore = options.ignore.clone();
        self.follow_links = options.follow_links;
        self.respect_gitignore = options.respect_gitignore;
        self.scan_root = scan_root.to_path_buf();
        self
    }

    pub fn with_max_files(mut self, max_files: usize) -> Self {
        self.max_files = max_files;
        self
    }

    /// Exclude nested project roots up to this many levels below the project
    pub fn with_nested_depth(mut self, depth: usize) -> Self {
        self.nested_depth = Some(depth);
        self
    }

    pub fn scan(&self, budget: &Budget) -> Result<ProjectListing> {
        let nested: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .require_git(false)
            .follow_links(self.follow_links)
            .sort_by_file_name(|a, b| a.cmp(b));

        let matcher = self.ignore.clone();
        let scan_root = self.scan_root.clone();
        let project_root = self.root.clone();
        let nested_depth = self.nested_depth;
        let nested_sink = Arc::clone(&nested);
        builder.filter_entry(move |entry| {
            if entry.depth() == 0 {
                return true;
            }
            let name = entry.file_name().to_string_lossy();
            if matcher.is_ignored(&name, &relative_string(entry.path(), &scan_root)) {
                return false;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir
                && nested_depth.is_some_and(|limit| entry.depth() <= limit)
                && marker_files(entry.path()).is_ok_and(|m| has_manifest(&m))
            {
                let rel = relative_string(entry.path(), &project_root);
                debug!("Excluding nested project: {}", rel);
                nested_sink
                    .lock()
                    .unwrap_or_else(|poisoned| poisoned.into_inner())
                    .push(rel);
                return false;
            }
            true
        });

        let mut listing = ProjectListing::default();
        for result in builder.build() {
            budget.check(&self.root)?;

            let entry = match result {
                Ok(entry) => entry,
                Err(err) => {
                    listing
                        .issues
                        .push(ScanIssue::new(ErrorKind::FileSkipped, err.to_string()));
                    continue;
                }
            };
            if entry.depth() == 0 {
                continue;
            }

            let relative = relative_string(entry.path(), &self.root);
            let file_type = entry.file_type();
            if file_type.is_some_and(|t| t.is_dir()) {
                listing.dirs.push(relative);
                continue;
            }
            if !file_type.is_some_and(|t| t.is_file()) {
                continue;
            }

            if listing.files.len() >= self.max_files {
                listing.truncated = true;
                debug!(
                    "File cap {} reached in {}",
                    self.max_files,
                    self.root.display()
                );
                break;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            listing.files.push(ScannedFile {
                path: entry.path().to_path_buf(),
                extension: entry
                    .path()
                    .extension()
                    .and_then(|e| e.to_str())
                    .map(|e| e.to_ascii_lowercase()),
                relative,
                size,
            });
        }

        listing.nested_roots = nested
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();
        Ok(listing)
    }
}

#[derive(Debug, Clone)]
pub struct ScannedFile {
    pub path: PathBuf,
    /// Path relative to the project root, `/`-separated
    pub relative: String,
    pub size: u64,
    /// Lowercase extension without the dot
    pub extension: Option<String>,
}

impl ScannedFile {
    pub fn name(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(&self.relative)
    }
}

/// Files and directories of one project
#[derive(Debug, Clone, Default)]
pub struct ProjectListing {
    pub files: Vec<ScannedFile>,
    /// Relative directory paths (for path-substring rules)
    pub dirs: Vec<String>,
    /// Nested project roots whose subtrees were excluded
    pub nested_roots: Vec<String>,
    /// True when the file cap cut the listing short
    pub truncated: bool,
    pub issues: Vec<ScanIssue>,
}

impl ProjectListing {
    pub fn has_file(&self, name: &str) -> bool {
        self.files.iter().any(|f| f.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScanError;
    use std::fs;
    use std::time::Duration;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    fn names(listing: &ProjectListing) -> Vec<&str> {
        listing.files.iter().map(|f| f.relative.as_str()).collect()
    }

    #[test]
    fn test_lists_files_in_name_order() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "package.json");
        touch(temp.path(), "src/index.js");
        touch(temp.path(), "src/App.JSX");

        let listing = FileScanner::new(temp.path())
            .scan(&Budget::unlimited())
            .unwrap();
        assert_eq!(names(&listing), vec!["package.json", "src/App.JSX", "src/index.js"]);
        assert_eq!(listing.dirs, vec!["src"]);
        assert_eq!(listing.files[1].extension.as_deref(), Some("jsx"));
        assert!(listing.has_file("index.js"));
    }

    #[test]
    fn test_excludes_nested_roots_and_ignored() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "package.json");
        touch(temp.path(), "packages/ui/package.json");
        touch(temp.path(), "packages/ui/src/button.js");
        touch(temp.path(), "node_modules/react/index.js");
        touch(temp.path(), "lib/util.js");

        let options = WalkOptions {
            max_depth: 3,
            ignore: IgnoreMatcher::new(&["node_modules"]).unwrap(),
            follow_links: false,
            respect_gitignore: false,
        };
        let listing = FileScanner::new(temp.path())
            .with_options(&options, temp.path())
            .with_nested_depth(3)
            .scan(&Budget::unlimited())
            .unwrap();

        assert_eq!(names(&listing), vec!["lib/util.js", "package.json"]);
        assert_eq!(listing.nested_roots, vec!["packages/ui"]);
    }

    #[test]
    fn test_descriptor_subdirectory_stays_in_listing() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "package.json");
        touch(temp.path(), "docker/Dockerfile");
        touch(temp.path(), "worker/go.mod");

        let listing = FileScanner::new(temp.path())
            .with_nested_depth(3)
            .scan(&Budget::unlimited())
            .unwrap();

        assert_eq!(names(&listing), vec!["docker/Dockerfile", "package.json"]);
        assert_eq!(listing.nested_roots, vec!["worker"]);
        assert!(listing.has_file("Dockerfile"));
    }

    #[test]
    fn test_file_cap_truncates() {
        let temp = TempDir::new().unwrap();
        for i in 0..5 {
            touch(temp.path(), &format!("f{}.txt", i));
        }
        let listing = FileScanner::new(temp.path())
            .with_max_files(3)
            .scan(&Budget::unlimited())
            .unwrap();
        assert_eq!(listing.files.len(), 3);
        assert!(listing.truncated);
    }

    #[test]
    fn test_expired_budget_aborts() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a.txt");
        let budget = Budget::new(Some(Duration::ZERO), Default::default());
        let err = FileScanner::new(temp.path()).scan(&budget).unwrap_err();
        assert!(matches!(err, ScanError::ClassificationTimeout { .. }));
    }
}
