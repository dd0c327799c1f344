//! Scan pipeline
//!
//! One run per scan root: the walker streams project roots through a bounded
//! queue into the scheduler, classification results feed the optional service
//! detector, and everything is folded into an [`AnalysisResult`].
//!
//! Fatal errors (missing root, bad catalog, invalid config) are returned
//! before any worker starts. Everything after that becomes an issue on the
//! result.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use futures::stream;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::aggregate::{RunParts, aggregate};
use super::cancel::CancelToken;
use super::progress::ProgressTracker;
use super::scheduler::Scheduler;
use super::state::{RunPhase, RunState};
use crate::analyzer::{ClassifyOptions, Classifier, ProjectWalker, WalkEvent, WalkOptions};
use crate::catalog::{Catalog, SharedCatalog};
use crate::config::Config;
use crate::constants::walk::DISCOVERY_QUEUE_BOUND;
use crate::services::MicroserviceDetector;
use crate::types::{
    AnalysisResult, ErrorKind, ProjectRoot, Result, RunStatus, ScanError, ScanIssue,
};

/// Drives scan runs against a shared catalog
pub struct Engine {
    config: Config,
    catalog: SharedCatalog,
    progress: ProgressTracker,
    cancel: CancelToken,
}

impl Engine {
    /// Validate `config` and load its catalog; both failures are fatal
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let catalog = Catalog::load(&config.catalog)?;
        info!("Loaded catalog with {} signatures", catalog.len());
        Ok(Self::with_catalog(config, SharedCatalog::new(catalog)))
    }

    pub fn with_catalog(config: Config, catalog: SharedCatalog) -> Self {
        Self {
            config,
            catalog,
            progress: ProgressTracker::new(),
            cancel: CancelToken::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn catalog(&self) -> &SharedCatalog {
        &self.catalog
    }

    pub fn progress(&self) -> &ProgressTracker {
        &self.progress
    }

    /// Token that stops in-flight runs; cancelling is permanent for this engine
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Scan every configured root in order
    pub async fn run(&self) -> Result<Vec<AnalysisResult>> {
        let mut results = Vec::with_capacity(self.config.scan.roots.len());
        for root in &self.config.scan.roots {
            results.push(self.scan(root).await?);
        }
        Ok(results)
    }

    /// Scan one root
    pub async fn scan(&self, root: &Path) -> Result<AnalysisResult> {
        let started_at = Utc::now();
        let mut state = RunState::new();
        let walk_options = WalkOptions::from_config(&self.config.scan)?;
        let walker = ProjectWalker::new(root, &walk_options, self.cancel.clone())?;
        let scan_root = walker.root().to_path_buf();
        // Pinned for the whole run; reloads apply to the next one
        let catalog = self.catalog.snapshot();

        info!("Scanning {}", scan_root.display());
        self.progress.start();
        state.advance(RunPhase::Walking)?;
        self.progress.start_phase(RunPhase::Walking);

        let (tx, rx) = mpsc::channel::<ProjectRoot>(DISCOVERY_QUEUE_BOUND);
        let progress = self.progress.clone();
        let walk_handle = tokio::task::spawn_blocking(move || walk(walker, tx, progress));

        state.advance(RunPhase::Classifying)?;
        self.progress.start_phase(RunPhase::Classifying);
        let options = ClassifyOptions::from_config(&self.config.scan, &scan_root)?;
        let scheduler = Scheduler::new(
            Arc::new(Classifier::new(catalog, options)),
            self.config.scan.worker_count(),
        )
        .with_timeout(self.config.scan.project_timeout())
        .with_cancel(self.cancel.clone())
        .with_progress(self.progress.clone());

        let roots = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|root| (root, rx))
        });
        let outcome = scheduler.run_all(roots).await;

        let mut errors = match walk_handle.await {
            Ok(issues) => issues,
            Err(e) => vec![ScanIssue::at(
                ErrorKind::Io,
                &scan_root,
                format!("walker task failed: {}", e),
            )],
        };
        errors.extend(outcome.errors);

        let mut parts = RunParts {
            scan_root,
            projects: outcome.results,
            started_at: Some(started_at),
            ..Default::default()
        };

        if outcome.cancelled || self.cancel.is_cancelled() {
            state.cancel();
            warn!("Run cancelled after {} projects", parts.projects.len());
            errors.push(ScanError::Cancelled.to_issue());
            parts.status = RunStatus::Cancelled;
        } else {
            if self.config.services.enabled {
                state.advance(RunPhase::DetectingServices)?;
                self.progress.start_phase(RunPhase::DetectingServices);
                let detection = MicroserviceDetector::new().detect(&parts.projects);
                for issue in &detection.issues {
                    self.progress.warning(issue);
                }
                parts.edges = detection.edges;
                parts.service_nodes = detection.nodes;
                errors.extend(detection.issues);
            }
            state.advance(RunPhase::Aggregated)?;
            self.progress.start_phase(RunPhase::Aggregated);
        }

        parts.errors = errors;
        let result = aggregate(parts);
        if !state.is_cancelled() {
            state.advance(RunPhase::Done)?;
        }
        self.progress
            .finish(result.status, result.projects.len(), result.edges.len());
        info!(
            "Scan finished: {} projects, {} edges, {} warnings",
            result.summary.total_projects,
            result.edges.len(),
            result.summary.warnings
        );
        Ok(result)
    }
}

/// Feed discovered roots into the queue; returns the walker's issues
fn walk(
    walker: ProjectWalker,
    tx: mpsc::Sender<ProjectRoot>,
    progress: ProgressTracker,
) -> Vec<ScanIssue> {
    let mut issues = Vec::new();
    for event in walker {
        match event {
            WalkEvent::Project(root) => {
                progress.project_discovered(root.id, &root.relative_path);
                if tx.blocking_send(root).is_err() {
                    debug!("Scheduler stopped consuming, ending walk");
                    break;
                }
            }
            WalkEvent::Unreadable(issue) => {
                progress.warning(&issue);
                issues.push(issue);
            }
        }
    }
    issues
}

/// Scan `root` with default settings and detection as configured
pub async fn scan_path(root: impl Into<PathBuf>, detect_services: bool) -> Result<AnalysisResult> {
    let mut config = Config::default();
    config.scan.roots = vec![root.into()];
    config.services.enabled = detect_services;
    let engine = Engine::new(config)?;
    let root = engine.config.scan.roots[0].clone();
    engine.scan(&root).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Category, EdgeKind, EvidenceSource, Language, ProjectType};
    use std::fs;
    use tempfile::TempDir;

    fn write(base: &Path, rel: &str, content: &str) {
        let path = base.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn react_and_flask(base: &Path) {
        write(
            base,
            "web/package.json",
            r#"{"name": "web", "dependencies": {"react": "^18.2.0", "react-dom": "^18.2.0"}}"#,
        );
        write(
            base,
            "web/src/App.jsx",
            "import React from 'react';\nexport default function App() { return <div/>; }\n",
        );
        write(base, "api/requirements.txt", "flask==3.0.0\n");
        write(
            base,
            "api/app.py",
            "from flask import Flask\napp = Flask(__name__)\n\n@app.route('/health')\ndef health():\n    return 'ok'\n\nif __name__ == '__main__':\n    app.run(port=5000)\n",
        );
    }

    #[tokio::test]
    async fn test_react_and_flask_without_detection() {
        let temp = TempDir::new().unwrap();
        react_and_flask(temp.path());

        let result = scan_path(temp.path(), false).await.unwrap();
        assert_eq!(result.status, RunStatus::Completed);
        assert_eq!(result.projects.len(), 2);
        assert!(result.edges.is_empty());
        assert!(result.service_nodes.is_empty());

        let api = &result.projects[0];
        assert_eq!(api.root.relative_path, "api");
        assert_eq!(api.primary_language, Language::Python);
        assert!(api.find_match("flask").is_some());

        let web = &result.projects[1];
        assert_eq!(web.root.relative_path, "web");
        assert_eq!(web.primary_language, Language::JavaScript);
        assert_eq!(web.find_match("react").unwrap().category, Category::Web);
        assert_eq!(web.project_type, ProjectType::Frontend);
        assert_eq!(result.summary.total_projects, 2);
    }

    #[tokio::test]
    async fn test_shared_topic_yields_exactly_one_broker_edge() {
        let temp = TempDir::new().unwrap();
        for name in ["orders", "shipping"] {
            write(
                temp.path(),
                &format!("{name}/package.json"),
                r#"{"dependencies": {"express": "^4.18.0", "kafkajs": "^2.2.0"}}"#,
            );
            write(temp.path(), &format!("{name}/.env"), "KAFKA_TOPIC=orders-queue\n");
        }

        let result = scan_path(temp.path(), true).await.unwrap();
        let broker: Vec<_> = result.edges_of_kind(EdgeKind::MessageBroker).collect();
        assert_eq!(broker.len(), 1);
        assert!(
            broker[0]
                .evidence
                .iter()
                .any(|e| e.source == EvidenceSource::SharedTopic && e.detail == "orders-queue")
        );
        assert_eq!(result.summary.edges_by_kind["message-broker"], 1);
    }

    #[tokio::test]
    async fn test_container_subdirectory_stays_in_its_project() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "svc/package.json",
            r#"{"name": "svc", "dependencies": {"express": "^4.18.0"}}"#,
        );
        write(
            temp.path(),
            "svc/index.js",
            "const express = require('express');\nconst app = express();\napp.get('/orders', (req, res) => res.json([]));\napp.listen(3000);\n",
        );
        write(temp.path(), "svc/docker/Dockerfile", "FROM node:20\nEXPOSE 3000\n");
        write(
            temp.path(),
            "gateway/package.json",
            r#"{"name": "gateway", "dependencies": {"express": "^4.18.0"}}"#,
        );
        write(
            temp.path(),
            "gateway/server.js",
            "const express = require('express');\nconst app = express();\nfetch('http://localhost:3000/orders');\napp.listen(4000);\n",
        );

        let result = scan_path(temp.path(), true).await.unwrap();
        let paths: Vec<_> = result
            .projects
            .iter()
            .map(|p| p.root.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["gateway", "svc"]);

        let svc = result.project_by_name("svc").unwrap();
        assert!(svc.find_match("docker").is_some());
        assert!(svc.facts.exposed_ports.contains(&3000));

        let rest: Vec<_> = result.edges_of_kind(EdgeKind::RestCall).collect();
        assert_eq!(rest.len(), 1);
        assert_eq!(rest[0].source, result.project_by_name("gateway").unwrap().id);
        assert_eq!(rest[0].target, svc.id);
    }

    #[tokio::test]
    async fn test_node_modules_and_depth_limits() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "app/package.json", r#"{"dependencies": {"react": "^18"}}"#);
        write(
            temp.path(),
            "app/node_modules/left-pad/package.json",
            r#"{"name": "left-pad"}"#,
        );
        write(temp.path(), "a/b/c/d/deep/package.json", "{}");

        let result = scan_path(temp.path(), false).await.unwrap();
        let paths: Vec<_> = result
            .projects
            .iter()
            .map(|p| p.root.relative_path.as_str())
            .collect();
        assert_eq!(paths, vec!["app"]);
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let temp = TempDir::new().unwrap();
        let err = scan_path(temp.path().join("nope"), false).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ScanRootNotFound);
    }

    #[tokio::test]
    async fn test_bad_catalog_is_fatal() {
        let temp = TempDir::new().unwrap();
        let extra = temp.path().join("extra.yaml");
        fs::write(&extra, "signatures: [ {id: broken").unwrap();

        let mut config = Config::default();
        config.scan.roots = vec![temp.path().to_path_buf()];
        config.catalog.extra = Some(extra);
        let err = Engine::new(config).err().unwrap();
        assert_eq!(err.kind(), ErrorKind::CatalogLoadFailure);
    }

    #[tokio::test]
    async fn test_cancelled_run_is_marked() {
        let temp = TempDir::new().unwrap();
        react_and_flask(temp.path());

        let mut config = Config::default();
        config.scan.roots = vec![temp.path().to_path_buf()];
        let engine = Engine::new(config).unwrap();
        engine.cancel_token().cancel();

        let result = engine.scan(temp.path()).await.unwrap();
        assert!(result.is_cancelled());
        assert!(result.projects.is_empty());
        assert!(result.errors.iter().any(|e| e.kind == ErrorKind::Cancelled));
        assert!(result.edges.is_empty());
    }

    #[tokio::test]
    async fn test_repeated_scans_are_identical() {
        let temp = TempDir::new().unwrap();
        react_and_flask(temp.path());
        write(
            temp.path(),
            "worker/requirements.txt",
            "celery==5.3\nredis==5.0\n",
        );

        let first = scan_path(temp.path(), true).await.unwrap();
        let second = scan_path(temp.path(), true).await.unwrap();
        let view = |r: &AnalysisResult| {
            r.projects
                .iter()
                .map(|p| {
                    (
                        p.root.relative_path.clone(),
                        p.project_type,
                        p.matches.iter().map(|m| m.signature_id.clone()).collect::<Vec<_>>(),
                    )
                })
                .collect::<Vec<_>>()
        };
        assert_eq!(view(&first), view(&second));
        assert_eq!(first.edges, second.edges);
        assert_eq!(first.summary, second.summary);
        assert_ne!(first.run_id, second.run_id);
    }

    #[tokio::test]
    async fn test_progress_reports_every_project() {
        let temp = TempDir::new().unwrap();
        react_and_flask(temp.path());

        let mut config = Config::default();
        config.scan.roots = vec![temp.path().to_path_buf()];
        let engine = Engine::new(config).unwrap();
        let results = engine.run().await.unwrap();

        let state = engine.progress().state();
        assert_eq!(results.len(), 1);
        assert_eq!(state.completed, 2);
        assert_eq!(state.discovered, 2);
        assert_eq!(state.phase, RunPhase::Done);
        assert!(!state.is_running);
        let api = results[0].project_by_name("api").unwrap();
        assert_eq!(api.project_type, ProjectType::Service);
    }
}
