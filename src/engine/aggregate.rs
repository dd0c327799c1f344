//! Result assembly
//!
//! Folds classified projects, the service graph and accumulated issues into one
//! immutable [`AnalysisResult`] with a summary.

use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::scheduler::sort_results;
use crate::types::{
    AnalysisResult, ProjectId, ProjectResult, RunStatus, ScanIssue, ServiceEdge, Summary,
};

/// Everything a finished (or cancelled) run hands to the aggregator
#[derive(Debug, Default)]
pub struct RunParts {
    pub scan_root: PathBuf,
    pub status: RunStatus,
    pub projects: Vec<ProjectResult>,
    pub edges: Vec<ServiceEdge>,
    pub service_nodes: BTreeSet<ProjectId>,
    /// Walker, project and detection issues in the order they were collected
    pub errors: Vec<ScanIssue>,
    pub started_at: Option<DateTime<Utc>>,
}

/// Assemble the final result; projects are re-sorted so callers need not
pub fn aggregate(parts: RunParts) -> AnalysisResult {
    let RunParts {
        scan_root,
        status,
        mut projects,
        mut edges,
        service_nodes,
        errors,
        started_at,
    } = parts;

    sort_results(&mut projects);
    edges.sort_by(|a, b| a.key().cmp(&b.key()));

    let summary = summarize(&projects, &edges, &service_nodes, &errors);
    let finished_at = Utc::now();
    AnalysisResult {
        run_id: Uuid::new_v4(),
        scan_root,
        status,
        projects,
        edges,
        service_nodes,
        summary,
        started_at: started_at.unwrap_or(finished_at),
        finished_at,
        errors,
    }
}

/// Count languages, types, frameworks and edges over a set of projects
pub fn summarize(
    projects: &[ProjectResult],
    edges: &[ServiceEdge],
    service_nodes: &BTreeSet<ProjectId>,
    errors: &[ScanIssue],
) -> Summary {
    let mut summary = Summary {
        total_projects: projects.len(),
        service_nodes: service_nodes.len(),
        warnings: errors.len(),
        ..Default::default()
    };

    for project in projects {
        summary.warnings += project.issues.len();
        if project.is_failed() {
            summary.failed_projects += 1;
            continue;
        }

        summary.total_files += project.stats.file_count;
        summary.total_lines += project.stats.line_count;
        bump(&mut summary.languages, project.primary_language.as_str());
        bump(&mut summary.project_types, &project.project_type.to_string());

        let mut categories = BTreeSet::new();
        for m in &project.matches {
            bump(&mut summary.frameworks, &m.signature_id);
            categories.insert(m.category);
        }
        for category in categories {
            bump(&mut summary.categories, category.as_str());
        }
        if let Some(top) = project.top_match() {
            bump(&mut summary.confidence_levels, &top.level().to_string());
        }
    }

    for edge in edges {
        bump(&mut summary.edges_by_kind, &edge.kind.to_string());
    }
    summary
}

fn bump(map: &mut BTreeMap<String, usize>, key: &str) {
    *map.entry(key.to_string()).or_insert(0) += 1;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        Category, EdgeEvidence, EdgeKind, ErrorKind, EvidenceSource, FrameworkMatch, Language,
        ProjectRoot, ProjectType,
    };

    fn project(id: usize, rel: &str) -> ProjectResult {
        let root = ProjectRoot {
            id: ProjectId::new(id),
            path: PathBuf::from("/scan").join(rel),
            relative_path: rel.to_string(),
            markers: vec!["package.json".to_string()],
            depth: 1,
        };
        let mut result = ProjectResult::failed(root, ScanIssue::new(ErrorKind::Io, "x"));
        result.error = None;
        result
    }

    fn matched(id: &str, category: Category, confidence: f32) -> FrameworkMatch {
        FrameworkMatch {
            signature_id: id.to_string(),
            name: id.to_string(),
            category,
            language: None,
            confidence,
            evidence: vec![],
        }
    }

    #[test]
    fn test_summary_counts() {
        let mut web = project(0, "web");
        web.primary_language = Language::JavaScript;
        web.project_type = ProjectType::Frontend;
        web.stats.file_count = 3;
        web.stats.line_count = 40;
        web.matches = vec![
            matched("react", Category::Web, 0.95),
            matched("jest", Category::Testing, 0.5),
        ];

        let mut api = project(1, "api");
        api.primary_language = Language::Python;
        api.project_type = ProjectType::Service;
        api.matches = vec![matched("flask", Category::Web, 0.8)];

        let broken = ProjectResult::failed(
            project(2, "broken").root,
            ScanIssue::new(ErrorKind::ProjectUnreadable, "gone"),
        );

        let summary = summarize(&[web, api, broken], &[], &BTreeSet::new(), &[]);
        assert_eq!(summary.total_projects, 3);
        assert_eq!(summary.failed_projects, 1);
        assert_eq!(summary.total_files, 3);
        assert_eq!(summary.total_lines, 40);
        assert_eq!(summary.languages["javascript"], 1);
        assert_eq!(summary.languages["python"], 1);
        assert_eq!(summary.frameworks["react"], 1);
        assert_eq!(summary.categories["testing"], 1);
        assert_eq!(summary.categories["web"], 2);
        assert_eq!(summary.confidence_levels["Very High"], 1);
        assert_eq!(summary.confidence_levels["High"], 1);
        assert_eq!(summary.project_types["service"], 1);
    }

    #[test]
    fn test_aggregate_sorts_and_stamps() {
        let edge = ServiceEdge {
            source: ProjectId::new(1),
            target: ProjectId::new(0),
            kind: EdgeKind::MessageBroker,
            evidence: [EdgeEvidence::new(EvidenceSource::SharedTopic, "orders")]
                .into_iter()
                .collect(),
        };
        let result = aggregate(RunParts {
            scan_root: PathBuf::from("/scan"),
            projects: vec![project(0, "zeta"), project(1, "alpha")],
            edges: vec![edge],
            service_nodes: [ProjectId::new(0), ProjectId::new(1)].into_iter().collect(),
            errors: vec![ScanIssue::new(ErrorKind::DirectoryUnreadable, "locked")],
            ..Default::default()
        });

        assert_eq!(result.projects[0].root.relative_path, "alpha");
        assert_eq!(result.summary.edges_by_kind.values().sum::<usize>(), 1);
        assert_eq!(result.summary.service_nodes, 2);
        assert_eq!(result.summary.warnings, 1);
        assert!(result.started_at <= result.finished_at);
        assert!(!result.is_cancelled());

        let again = aggregate(RunParts::default());
        assert_ne!(result.run_id, again.run_id);
    }
}
