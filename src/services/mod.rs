//! Microservice detection
//!
//! Builds a directed, possibly cyclic graph over classified projects from the
//! service facts the classifier extracted. Nodes are project ids; edges are
//! deduplicated on (source, target, kind) with merged evidence.

pub mod detector;
pub mod index;
pub mod rules;

pub use detector::{DetectionOutcome, MicroserviceDetector, detect};
pub use index::{ServiceIndex, is_candidate};
pub use rules::{
    ConfigTokenRule, DeclaredDependencyRule, EdgeSet, InferenceRule, SharedInfrastructureRule,
    UrlReferenceRule, default_rules,
};
