//! Static project analysis
//!
//! - Project root discovery and per-project file listing (`scanner`)
//! - Signature matching, language and type inference, service facts (`classifier`)

pub mod classifier;
pub mod scanner;

pub use classifier::{ClassifyOptions, Classifier, classify, project_root_at};
pub use scanner::{FileScanner, ProjectWalker, WalkEvent, WalkOptions, discover_projects};
