//! Final analysis artifact handed to reporting collaborators

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use uuid::Uuid;

use super::ProjectId;
use super::edge::{EdgeKind, ServiceEdge};
use super::error::ScanIssue;
use super::project::ProjectResult;

/// How a run ended
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    #[default]
    Completed,
    Cancelled,
}

/// Aggregate counts over all projects of a run
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Summary {
    pub total_projects: usize,
    pub failed_projects: usize,
    pub total_files: usize,
    pub total_lines: usize,
    pub languages: BTreeMap<String, usize>,
    pub project_types: BTreeMap<String, usize>,
    /// Signature id to number of projects matching it
    pub frameworks: BTreeMap<String, usize>,
    pub categories: BTreeMap<String, usize>,
    /// Confidence level of each project's top match
    pub confidence_levels: BTreeMap<String, usize>,
    pub service_nodes: usize,
    pub edges_by_kind: BTreeMap<String, usize>,
    pub warnings: usize,
}

/// Immutable result of one scan run
///
/// Never mutated after assembly; a re-scan produces a new value with a new `run_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub run_id: Uuid,
    pub scan_root: PathBuf,
    pub status: RunStatus,
    /// Sorted by relative path, then id
    pub projects: Vec<ProjectResult>,
    /// Heuristic service graph; empty when detection is disabled
    pub edges: Vec<ServiceEdge>,
    pub service_nodes: BTreeSet<ProjectId>,
    pub summary: Summary,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Non-fatal errors; consumers must surface these as warnings
    pub errors: Vec<ScanIssue>,
}

impl AnalysisResult {
    pub fn project(&self, id: ProjectId) -> Option<&ProjectResult> {
        self.projects.iter().find(|p| p.id == id)
    }

    pub fn project_by_name(&self, name: &str) -> Option<&ProjectResult> {
        self.projects.iter().find(|p| p.name == name)
    }

    pub fn edges_of_kind(&self, kind: EdgeKind) -> impl Iterator<Item = &ServiceEdge> {
        self.edges.iter().filter(move |e| e.kind == kind)
    }

    /// Every non-fatal issue, including per-project warnings
    pub fn all_warnings(&self) -> impl Iterator<Item = &ScanIssue> {
        self.errors
            .iter()
            .chain(self.projects.iter().flat_map(|p| p.issues.iter()))
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == RunStatus::Cancelled
    }
}
