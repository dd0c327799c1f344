pub mod analysis;
pub mod edge;
pub mod error;
pub mod project;
pub mod service;
pub mod utils;

pub use analysis::*;
pub use edge::*;
pub use error::{ErrorKind, Result, ScanError, ScanIssue};
pub use project::*;
pub use service::*;
pub use utils::{normalize_service_name, relative_string};

// =============================================================================
// Domain Newtypes
// =============================================================================

use serde::{Deserialize, Serialize};
use std::fmt;

/// Type-safe project identifier
///
/// Assigned by the walker in discovery order. Stable within one run and
/// meaningless across runs; edges reference projects only through it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ProjectId(usize);

impl ProjectId {
    pub fn new(id: usize) -> Self {
        Self(id)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<usize> for ProjectId {
    fn from(id: usize) -> Self {
        Self(id)
    }
}
