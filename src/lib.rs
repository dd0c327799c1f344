//! stackscope - Project Structure and Service Scanner
//!
//! Walks a directory tree, classifies every project it finds against a catalog
//! of framework and tooling signatures, and optionally infers microservice
//! boundaries and the relationships between them.
//!
//! ## Core Features
//!
//! - **Signature Catalog**: declarative file, path and content rules (YAML/TOML)
//! - **Parallel Classification**: bounded worker pool with per-project time budgets
//! - **Service Graph**: REST, message-broker, shared-database and config edges
//! - **Deterministic Results**: identical trees produce identical reports
//!
//! ## Quick Start
//!
//! ```ignore
//! use stackscope::{Config, Engine};
//!
//! let mut config = Config::default();
//! config.scan.roots = vec!["./repos".into()];
//! config.services.enabled = true;
//!
//! let engine = Engine::new(config)?;
//! for result in engine.run().await? {
//!     println!("{} projects, {} edges", result.projects.len(), result.edges.len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`catalog`]: signature definitions, validation and hot reload
//! - [`analyzer`]: tree walker and project classifier
//! - [`services`]: microservice detection
//! - [`engine`]: scheduling, progress, cancellation and result assembly
//! - [`config`]: layered configuration

pub mod analyzer;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod constants;
pub mod engine;
pub mod services;
pub mod types;

// =============================================================================
// Core Re-exports
// =============================================================================

// Configuration
pub use config::{CatalogConfig, Config, ConfigLoader, ScanConfig, ServicesConfig};

// Error Types
pub use types::error::{ErrorKind, Result, ScanError, ScanIssue};

// Results
pub use types::{
    AnalysisResult, EdgeKind, FrameworkMatch, Language, ProjectId, ProjectResult, ProjectRoot,
    ProjectType, RunStatus, ServiceEdge, Summary,
};

// =============================================================================
// Engine Re-exports
// =============================================================================

pub use engine::{
    CancelToken, Engine, ProgressEvent, ProgressTracker, RunPhase, Scheduler, scan_path,
};

// =============================================================================
// Component Re-exports
// =============================================================================

pub use analyzer::{Classifier, ProjectWalker, classify, discover_projects};
pub use catalog::{Catalog, SharedCatalog, Signature};
pub use services::{MicroserviceDetector, detect};
