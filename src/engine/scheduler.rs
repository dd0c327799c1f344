//! Bounded parallel classification
//!
//! Project roots arrive as a stream. At most `workers` classifications run at
//! once on tokio's blocking pool; each task writes exactly one slot of the
//! result map, keyed by project id. The output is sorted by relative path, so
//! completion order never leaks into reports.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use futures::{Stream, StreamExt};
use tracing::{debug, info, warn};

use super::cancel::{Budget, CancelToken};
use super::progress::ProgressTracker;
use super::timeout::{backstop, with_timeout};
use crate::analyzer::Classifier;
use crate::types::{ProjectId, ProjectResult, ProjectRoot, ScanError, ScanIssue};

/// Results of one scheduling pass
#[derive(Debug, Default)]
pub struct ScheduleOutcome {
    /// Sorted by relative path, then id
    pub results: Vec<ProjectResult>,
    /// Error markers of failed projects, in result order
    pub errors: Vec<ScanIssue>,
    /// True when cancellation stopped dispatching
    pub cancelled: bool,
}

pub struct Scheduler {
    classifier: Arc<Classifier>,
    workers: usize,
    timeout: Option<Duration>,
    cancel: CancelToken,
    progress: ProgressTracker,
}

impl Scheduler {
    pub fn new(classifier: Arc<Classifier>, workers: usize) -> Self {
        Self {
            classifier,
            workers: workers.max(1),
            timeout: None,
            cancel: CancelToken::new(),
            progress: ProgressTracker::new(),
        }
    }

    /// Per-project time budget
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_progress(mut self, progress: ProgressTracker) -> Self {
        self.progress = progress;
        self
    }

    /// Classify every root of `roots`
    ///
    /// Cancellation is checked before each dispatch. A task cancelled mid-way
    /// leaves no result at all; failed or timed-out projects leave a minimal
    /// result carrying their error.
    pub async fn run_all<S>(&self, roots: S) -> ScheduleOutcome
    where
        S: Stream<Item = ProjectRoot> + Send,
    {
        let slots: Arc<DashMap<ProjectId, ProjectResult>> = Arc::new(DashMap::new());
        let cancel = self.cancel.clone();

        info!("Classifying with {} workers", self.workers);
        roots
            .take_while(move |_| {
                let go = !cancel.is_cancelled();
                async move { go }
            })
            .map(|root| self.run_one(root, Arc::clone(&slots)))
            .buffer_unordered(self.workers)
            .collect::<Vec<()>>()
            .await;

        let mut results: Vec<ProjectResult> = Arc::try_unwrap(slots)
            .map(|map| map.into_iter().map(|(_, r)| r).collect())
            .unwrap_or_else(|shared| shared.iter().map(|e| e.value().clone()).collect());
        sort_results(&mut results);

        let errors = results.iter().filter_map(|r| r.error.clone()).collect();
        ScheduleOutcome {
            results,
            errors,
            cancelled: self.cancel.is_cancelled(),
        }
    }

    async fn run_one(&self, root: ProjectRoot, slots: Arc<DashMap<ProjectId, ProjectResult>>) {
        let classifier = Arc::clone(&self.classifier);
        let budget = Budget::new(self.timeout, self.cancel.clone());
        let task_root = root.clone();
        let path = root.path.clone();

        let handle = tokio::task::spawn_blocking(move || classifier.classify(&task_root, &budget));
        let outcome = with_timeout(
            backstop(self.timeout),
            async {
                match handle.await {
                    Ok(result) => result,
                    Err(e) => Err(ScanError::project_unreadable(
                        &path,
                        format!("classification task failed: {}", e),
                    )),
                }
            },
            &path,
        )
        .await;

        let result = match outcome {
            Ok(result) => result,
            Err(ScanError::Cancelled) => {
                debug!("Dropped cancelled classification of {}", root.relative_path);
                return;
            }
            Err(e) => {
                warn!("Project {} failed: {}", root.path.display(), e);
                let issue = e.to_issue();
                self.progress.warning(&issue);
                ProjectResult::failed(root, issue)
            }
        };

        self.progress
            .project_completed(&result.root.relative_path, result.is_failed());
        slots.insert(result.id, result);
    }
}

/// Deterministic report order: relative path, then id
pub fn sort_results(results: &mut [ProjectResult]) {
    results.sort_by(|a, b| {
        a.root
            .relative_path
            .cmp(&b.root.relative_path)
            .then_with(|| a.id.cmp(&b.id))
    });
}
