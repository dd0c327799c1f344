pub mod file_scanner;
pub mod ignore_rules;
pub mod walker;

pub use file_scanner::{FileScanner, ProjectListing, ScannedFile};
pub use ignore_rules::IgnoreMatcher;
pub use walker::{
    ProjectWalker, WalkEvent, WalkOptions, discover_projects, has_manifest, is_marker_file,
    marker_files,
};
