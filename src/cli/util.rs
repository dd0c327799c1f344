//! CLI Common Utilities
//!
//! Configuration resolution shared by command handlers.

use std::path::Path;

use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Load the effective configuration
///
/// An explicit file replaces the global/project/env chain entirely.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    match explicit {
        Some(path) => ConfigLoader::load_from_file(path),
        None => ConfigLoader::load(),
    }
}
