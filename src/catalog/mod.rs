//! Signature Catalog
//!
//! Static registry of framework, library, tooling and infrastructure signatures.
//! Each signature is a set of uniform tagged rules (file glob, path substring,
//! content pattern) evaluated by the classifier's generic matcher.
//!
//! The catalog is validated and compiled once, then shared read-only. Reloading
//! swaps the whole catalog; classifications already running keep their snapshot.

mod registry;
mod signature;

pub use registry::{Catalog, CatalogFile, SharedCatalog};
pub use signature::{
    ContentPattern, FileGlob, MatchRule, RuleGroup, RuleSpec, Side, Signature, SignatureSpec,
};
