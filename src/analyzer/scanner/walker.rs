//! Project root discovery
//!
//! Lazily walks the scan root and yields every directory that contains a marker
//! file. Traversal is single-threaded, ordered by file name and bounded by depth.

use ignore::{DirEntry, Walk, WalkBuilder};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, LazyLock, Mutex};

use tracing::{debug, warn};

use super::ignore_rules::IgnoreMatcher;
use crate::config::ScanConfig;
use crate::constants::walk::{
    DEFAULT_IGNORE, DEFAULT_MAX_DEPTH, DESCRIPTOR_MARKERS, MARKER_FILES, MARKER_GLOBS,
};
use crate::engine::CancelToken;
use crate::types::{ProjectId, ProjectRoot, Result, ScanError, ScanIssue, relative_string};

static MARKER_PATTERNS: LazyLock<Vec<glob::Pattern>> = LazyLock::new(|| {
    MARKER_GLOBS
        .iter()
        .filter_map(|g| glob::Pattern::new(g).ok())
        .collect()
});

/// True when a file name identifies a project manifest or descriptor
pub fn is_marker_file(name: &str) -> bool {
    MARKER_FILES.contains(&name) || MARKER_PATTERNS.iter().any(|p| p.matches(name))
}

/// True when at least one marker is a package manifest, not a container descriptor
pub fn has_manifest<S: AsRef<str>>(markers: &[S]) -> bool {
    markers
        .iter()
        .any(|m| !DESCRIPTOR_MARKERS.contains(&m.as_ref()))
}

/// Sorted marker file names present directly in `dir`
pub fn marker_files(dir: &Path) -> std::io::Result<Vec<String>> {
    let mut markers = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().to_string();
        if is_marker_file(&name) && entry.path().is_file() {
            markers.push(name);
        }
    }
    markers.sort();
    Ok(markers)
}

// =============================================================================
// Options
// =============================================================================

/// Traversal settings shared by the walker and the project file listing
#[derive(Debug, Clone)]
pub struct WalkOptions {
    pub max_depth: usize,
    pub ignore: IgnoreMatcher,
    pub follow_links: bool,
    pub respect_gitignore: bool,
}

impl Default for WalkOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            ignore: IgnoreMatcher::new(DEFAULT_IGNORE).unwrap_or_default(),
            follow_links: false,
            respect_gitignore: false,
        }
    }
}

impl WalkOptions {
    pub fn from_config(config: &ScanConfig) -> Result<Self> {
        Ok(Self {
            max_depth: config.max_depth,
            ignore: IgnoreMatcher::new(&config.ignore)?,
            follow_links: config.follow_links,
            respect_gitignore: config.respect_gitignore,
        })
    }

    /// Directory-only walk below `root`
    ///
    /// Ignored names and already visited canonical paths are pruned with their
    /// subtrees.
    fn dir_walker(&self, root: &Path) -> Walk {
        let mut builder = WalkBuilder::new(root);
        builder
            .hidden(false)
            .parents(false)
            .ignore(false)
            .git_ignore(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .git_global(false)
            .require_git(false)
            .follow_links(self.follow_links)
            .max_depth(Some(self.max_depth))
            .sort_by_file_name(|a, b| a.cmp(b));

        let matcher = self.ignore.clone();
        let scan_root = root.to_path_buf();
        let seen: Option<Arc<Mutex<HashSet<PathBuf>>>> =
            self.follow_links.then(|| Arc::new(Mutex::new(HashSet::new())));

        builder.filter_entry(move |entry| {
            if !entry.file_type().is_some_and(|t| t.is_dir()) {
                return false;
            }
            if entry.depth() > 0 {
                let name = entry.file_name().to_string_lossy();
                let rel = relative_string(entry.path(), &scan_root);
                if matcher.is_ignored(&name, &rel) {
                    debug!("Ignoring directory: {}", rel);
                    return false;
                }
            }
            match &seen {
                Some(seen) => first_visit(seen, entry),
                None => true,
            }
        });

        builder.build()
    }
}

fn first_visit(seen: &Mutex<HashSet<PathBuf>>, entry: &DirEntry) -> bool {
    let canonical = match entry.path().canonicalize() {
        Ok(path) => path,
        Err(_) => return true,
    };
    let mut seen = seen.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    if seen.insert(canonical) {
        true
    } else {
        debug!("Skipping already visited directory: {}", entry.path().display());
        false
    }
}

// =============================================================================
// Walker
// =============================================================================

/// Output of the walker
#[derive(Debug, Clone)]
pub enum WalkEvent {
    Project(ProjectRoot),
    Unreadable(ScanIssue),
}

/// Lazy, finite sequence of discovered project roots
///
/// Ids are assigned in discovery order starting at 0. A directory marked only
/// by container descriptors is reported only outside every other project. The
/// sequence ends early when the cancel token fires.
pub struct ProjectWalker {
    root: PathBuf,
    inner: Walk,
    next_id: usize,
    reported: HashSet<PathBuf>,
    /// Reported roots enclosing the current entry, outermost first
    enclosing: Vec<PathBuf>,
    cancel: CancelToken,
}

impl ProjectWalker {
    pub fn new(root: &Path, options: &WalkOptions, cancel: CancelToken) -> Result<Self> {
        if !root.is_dir() {
            return Err(ScanError::ScanRootNotFound(root.to_path_buf()));
        }
        let root = root
            .canonicalize()
            .map_err(|_| ScanError::ScanRootNotFound(root.to_path_buf()))?;
        let inner = options.dir_walker(&root);

        Ok(Self {
            root,
            inner,
            next_id: 0,
            reported: HashSet::new(),
            enclosing: Vec::new(),
            cancel,
        })
    }

    /// Canonical scan root
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn unreadable(&mut self, path: PathBuf, message: String) -> Option<WalkEvent> {
        if !self.reported.insert(path.clone()) {
            return None;
        }
        warn!("Directory unreadable: {}: {}", path.display(), message);
        let err = ScanError::DirectoryUnreadable { path, message };
        Some(WalkEvent::Unreadable(err.to_issue()))
    }
}

impl Iterator for ProjectWalker {
    type Item = WalkEvent;

    fn next(&mut self) -> Option<WalkEvent> {
        loop {
            if self.cancel.is_cancelled() {
                debug!("Walker stopped by cancellation");
                return None;
            }

            let entry = match self.inner.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    if is_loop(&err) {
                        debug!("Skipping symlink cycle: {}", err);
                        continue;
                    }
                    let path = error_path(&err).unwrap_or_else(|| self.root.clone());
                    match self.unreadable(path, err.to_string()) {
                        Some(event) => return Some(event),
                        None => continue,
                    }
                }
            };

            let markers = match marker_files(entry.path()) {
                Ok(markers) => markers,
                Err(err) => match self.unreadable(entry.path().to_path_buf(), err.to_string()) {
                    Some(event) => return Some(event),
                    None => continue,
                },
            };
            if markers.is_empty() {
                continue;
            }

            // Depth-first order: roots that are not ancestors are behind us
            while self
                .enclosing
                .last()
                .is_some_and(|top| !entry.path().starts_with(top))
            {
                self.enclosing.pop();
            }
            if !self.enclosing.is_empty() && !has_manifest(&markers) {
                debug!(
                    "Container descriptor kept in enclosing project: {}",
                    entry.path().display()
                );
                continue;
            }
            self.enclosing.push(entry.path().to_path_buf());

            let id = ProjectId::new(self.next_id);
            self.next_id += 1;
            let project = ProjectRoot {
                id,
                path: entry.path().to_path_buf(),
                relative_path: relative_string(entry.path(), &self.root),
                markers,
                depth: entry.depth(),
            };
            debug!(
                "Discovered project {} at '{}' ({})",
                id,
                project.relative_path,
                project.markers.join(", ")
            );
            return Some(WalkEvent::Project(project));
        }
    }
}

fn is_loop(err: &ignore::Error) -> bool {
    match err {
        ignore::Error::Loop { .. } => true,
        ignore::Error::WithPath { err, .. } | ignore::Error::WithDepth { err, .. } => is_loop(err),
        _ => false,
    }
}

fn error_path(err: &ignore::Error) -> Option<PathBuf> {
    match err {
        ignore::Error::WithPath { path, .. } => Some(path.clone()),
        ignore::Error::WithDepth { err, .. } => error_path(err),
        _ => None,
    }
}

/// Collect every project root below `root` (no cancellation)
///
/// Unreadable directories are logged and skipped; use [`ProjectWalker`] to
/// receive them as events.
pub fn discover_projects<S: AsRef<str>>(
    root: &Path,
    max_depth: usize,
    ignore_patterns: &[S],
) -> Result<Vec<ProjectRoot>> {
    let options = WalkOptions {
        max_depth,
        ignore: IgnoreMatcher::new(ignore_patterns)?,
        follow_links: false,
        respect_gitignore: false,
    };
    let walker = ProjectWalker::new(root, &options, CancelToken::new())?;
    Ok(walker
        .filter_map(|event| match event {
            WalkEvent::Project(project) => Some(project),
            WalkEvent::Unreadable(issue) => {
                debug!("{}", issue);
                None
            }
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "{}").unwrap();
    }

    fn rel_paths(projects: &[ProjectRoot]) -> Vec<&str> {
        projects.iter().map(|p| p.relative_path.as_str()).collect()
    }

    #[test]
    fn test_marker_detection() {
        assert!(is_marker_file("package.json"));
        assert!(is_marker_file("Api.csproj"));
        assert!(!is_marker_file("README.md"));
    }

    #[test]
    fn test_discovers_marker_directories_in_order() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "web/package.json");
        touch(temp.path(), "api/requirements.txt");
        touch(temp.path(), "docs/README.md");

        let projects = discover_projects(temp.path(), 3, &["node_modules"]).unwrap();
        assert_eq!(rel_paths(&projects), vec!["api", "web"]);
        assert_eq!(projects[0].id, ProjectId::new(0));
        assert_eq!(projects[1].id, ProjectId::new(1));
        assert_eq!(projects[0].depth, 1);
        assert_eq!(projects[1].markers, vec!["package.json"]);
    }

    #[test]
    fn test_root_itself_can_be_a_project() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "Cargo.toml");
        let projects = discover_projects(temp.path(), 0, &[] as &[&str]).unwrap();
        assert_eq!(rel_paths(&projects), vec![""]);
        assert_eq!(projects[0].depth, 0);
    }

    #[test]
    fn test_ignored_subtree_is_never_reported() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "app/package.json");
        touch(temp.path(), "app/node_modules/left-pad/package.json");
        touch(temp.path(), "node_modules/react/package.json");

        let projects = discover_projects(temp.path(), 5, &["node_modules"]).unwrap();
        assert_eq!(rel_paths(&projects), vec!["app"]);
    }

    #[test]
    fn test_descriptor_only_directory_inside_project_is_not_a_root() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "svc/package.json");
        touch(temp.path(), "svc/docker/Dockerfile");
        touch(temp.path(), "svc/docker/tools/Cargo.toml");
        touch(temp.path(), "deploy/docker-compose.yml");
        touch(temp.path(), "deploy/nginx/Dockerfile");

        let projects = discover_projects(temp.path(), 4, &[] as &[&str]).unwrap();
        assert_eq!(rel_paths(&projects), vec!["deploy", "svc", "svc/docker/tools"]);
        assert!(has_manifest(&["Dockerfile", "go.mod"]));
        assert!(!has_manifest(&["Dockerfile", "compose.yaml"]));
    }

    #[test]
    fn test_depth_limit() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/package.json");
        touch(temp.path(), "a/b/c/go.mod");

        let shallow = discover_projects(temp.path(), 2, &[] as &[&str]).unwrap();
        assert_eq!(rel_paths(&shallow), vec!["a"]);

        let deep = discover_projects(temp.path(), 3, &[] as &[&str]).unwrap();
        assert_eq!(rel_paths(&deep), vec!["a", "a/b/c"]);
    }

    #[test]
    fn test_missing_root_is_fatal() {
        let err = discover_projects(Path::new("/nonexistent/stackscope-root"), 3, &[] as &[&str])
            .unwrap_err();
        assert!(matches!(err, ScanError::ScanRootNotFound(_)));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_cancelled_walker_yields_nothing() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/package.json");
        let token = CancelToken::new();
        token.cancel();
        let options = WalkOptions {
            max_depth: 3,
            ignore: IgnoreMatcher::default(),
            follow_links: false,
            respect_gitignore: false,
        };
        let walker = ProjectWalker::new(temp.path(), &options, token).unwrap();
        assert_eq!(walker.count(), 0);
    }

    #[cfg(unix)]
    #[test]
    fn test_unreadable_directory_is_reported_and_siblings_continue() {
        use std::os::unix::fs::PermissionsExt;

        let temp = TempDir::new().unwrap();
        touch(temp.path(), "a/package.json");
        touch(temp.path(), "z/package.json");
        let locked = temp.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();
        assert_eq!(fs::metadata(&locked).unwrap().permissions().mode() & 0o777, 0);

        // Permission bits do not bind root
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let walker = ProjectWalker::new(temp.path(), &WalkOptions::default(), CancelToken::new())
            .unwrap();
        let events: Vec<_> = walker.collect();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        let unreadable: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::Unreadable(issue) => Some(issue),
                WalkEvent::Project(_) => None,
            })
            .collect();
        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].kind, crate::types::ErrorKind::DirectoryUnreadable);
        assert!(!unreadable[0].kind.is_fatal());

        let projects: Vec<_> = events
            .iter()
            .filter_map(|e| match e {
                WalkEvent::Project(p) => Some(p.relative_path.as_str()),
                WalkEvent::Unreadable(_) => None,
            })
            .collect();
        assert_eq!(projects, vec!["a", "z"]);
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_cycle_is_skipped() {
        let temp = TempDir::new().unwrap();
        touch(temp.path(), "svc/package.json");
        std::os::unix::fs::symlink(temp.path(), temp.path().join("svc/loop")).unwrap();

        let options = WalkOptions {
            max_depth: 6,
            ignore: IgnoreMatcher::default(),
            follow_links: true,
            respect_gitignore: false,
        };
        let walker = ProjectWalker::new(temp.path(), &options, CancelToken::new()).unwrap();
        let projects: Vec<_> = walker
            .filter_map(|e| match e {
                WalkEvent::Project(p) => Some(p.relative_path),
                WalkEvent::Unreadable(_) => None,
            })
            .collect();
        assert_eq!(projects, vec!["svc".to_string()]);
    }
}
