//! Unified Error Type System
//!
//! Centralized error types for the scanning engine.
//!
//! ## Error Kinds
//!
//! - **ScanRootNotFound**: scan root missing (fatal)
//! - **CatalogLoadFailure**: signature catalog could not be loaded (fatal)
//! - **Config**: configuration rejected by validation (fatal)
//! - **DirectoryUnreadable**: walker could not read a directory (non-fatal)
//! - **ProjectUnreadable**: project root vanished or is unreadable (non-fatal)
//! - **ClassificationTimeout**: per-project time budget exceeded (non-fatal)
//! - **DetectionHeuristicFailure**: a service inference rule failed (non-fatal)
//! - **FileSkipped**: binary or unreadable file inside a project (non-fatal)
//! - **Cancelled**: the run was cancelled before the work finished (non-fatal)
//!
//! Fatal errors surface as `Err(ScanError)` and no partial result is produced.
//! Non-fatal errors are converted into [`ScanIssue`] records and accumulated on the
//! analysis result.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Error Kinds
// =============================================================================

/// Classification of every error the engine can report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    ScanRootNotFound,
    CatalogLoadFailure,
    Config,
    DirectoryUnreadable,
    ProjectUnreadable,
    ClassificationTimeout,
    DetectionHeuristicFailure,
    FileSkipped,
    Cancelled,
    Io,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ScanRootNotFound => write!(f, "SCAN_ROOT_NOT_FOUND"),
            Self::CatalogLoadFailure => write!(f, "CATALOG_LOAD_FAILURE"),
            Self::Config => write!(f, "CONFIG"),
            Self::DirectoryUnreadable => write!(f, "DIRECTORY_UNREADABLE"),
            Self::ProjectUnreadable => write!(f, "PROJECT_UNREADABLE"),
            Self::ClassificationTimeout => write!(f, "CLASSIFICATION_TIMEOUT"),
            Self::DetectionHeuristicFailure => write!(f, "DETECTION_HEURISTIC_FAILURE"),
            Self::FileSkipped => write!(f, "FILE_SKIPPED"),
            Self::Cancelled => write!(f, "CANCELLED"),
            Self::Io => write!(f, "IO"),
        }
    }
}

impl ErrorKind {
    /// Fatal kinds abort the run before a result is assembled
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ScanRootNotFound | Self::CatalogLoadFailure | Self::Config
        )
    }
}

// =============================================================================
// Non-fatal issue record
// =============================================================================

/// A non-fatal problem recorded during a run
///
/// Issues are plain data so they serialize with the analysis result and can be
/// rendered as warnings by any consumer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanIssue {
    pub kind: ErrorKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    pub message: String,
}

impl ScanIssue {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            message: message.into(),
        }
    }

    pub fn at(kind: ErrorKind, path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: Some(path.as_ref().to_path_buf()),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ScanIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.path {
            Some(path) => write!(f, "[{}] {}: {}", self.kind, path.display(), self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

// =============================================================================
// Application Error
// =============================================================================

#[derive(Debug, Error)]
pub enum ScanError {
    // -------------------------------------------------------------------------
    // System Errors (auto From impl)
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // -------------------------------------------------------------------------
    // Fatal run errors
    // -------------------------------------------------------------------------
    #[error("Scan root not found: {}", .0.display())]
    ScanRootNotFound(PathBuf),

    #[error("Catalog load failure: {0}")]
    CatalogLoad(String),

    #[error("Config error: {0}")]
    Config(String),

    // -------------------------------------------------------------------------
    // Non-fatal errors (recorded as issues)
    // -------------------------------------------------------------------------
    #[error("Directory unreadable {}: {message}", path.display())]
    DirectoryUnreadable { path: PathBuf, message: String },

    #[error("Project unreadable {}: {message}", path.display())]
    ProjectUnreadable { path: PathBuf, message: String },

    #[error("Classification of {} timed out after {duration:?}", path.display())]
    ClassificationTimeout { path: PathBuf, duration: Duration },

    #[error("Detection heuristic '{rule}' failed: {message}")]
    DetectionHeuristic { rule: String, message: String },

    #[error("Skipped {}: {reason}", path.display())]
    FileSkipped { path: PathBuf, reason: String },

    #[error("Run cancelled")]
    Cancelled,
}

pub type Result<T> = std::result::Result<T, ScanError>;

// =============================================================================
// Helper Functions
// =============================================================================

impl ScanError {
    pub fn catalog(message: impl Into<String>) -> Self {
        Self::CatalogLoad(message.into())
    }

    pub fn project_unreadable(path: impl AsRef<Path>, message: impl Into<String>) -> Self {
        Self::ProjectUnreadable {
            path: path.as_ref().to_path_buf(),
            message: message.into(),
        }
    }

    pub fn timeout(path: impl AsRef<Path>, duration: Duration) -> Self {
        Self::ClassificationTimeout {
            path: path.as_ref().to_path_buf(),
            duration,
        }
    }

    pub fn heuristic(rule: impl Into<String>, message: impl Into<String>) -> Self {
        Self::DetectionHeuristic {
            rule: rule.into(),
            message: message.into(),
        }
    }

    /// Kind used for routing and for issue records
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Io(_) => ErrorKind::Io,
            Self::Json(_) | Self::Yaml(_) | Self::CatalogLoad(_) => ErrorKind::CatalogLoadFailure,
            Self::ScanRootNotFound(_) => ErrorKind::ScanRootNotFound,
            Self::Config(_) => ErrorKind::Config,
            Self::DirectoryUnreadable { .. } => ErrorKind::DirectoryUnreadable,
            Self::ProjectUnreadable { .. } => ErrorKind::ProjectUnreadable,
            Self::ClassificationTimeout { .. } => ErrorKind::ClassificationTimeout,
            Self::DetectionHeuristic { .. } => ErrorKind::DetectionHeuristicFailure,
            Self::FileSkipped { .. } => ErrorKind::FileSkipped,
            Self::Cancelled => ErrorKind::Cancelled,
        }
    }

    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    /// Convert into an issue record, keeping the path when the variant has one
    pub fn to_issue(&self) -> ScanIssue {
        let path = match self {
            Self::ScanRootNotFound(path)
            | Self::DirectoryUnreadable { path, .. }
            | Self::ProjectUnreadable { path, .. }
            | Self::ClassificationTimeout { path, .. }
            | Self::FileSkipped { path, .. } => Some(path.clone()),
            _ => None,
        };
        ScanIssue {
            kind: self.kind(),
            path,
            message: self.to_string(),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
