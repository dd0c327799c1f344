//! Progress streaming
//!
//! Workers and the walker report into a [`ProgressTracker`]; any number of
//! consumers subscribe to its broadcast channel. Reporting never blocks: events
//! are dropped when nobody listens and lagging receivers skip ahead.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Instant;

use tokio::sync::broadcast;

use super::state::RunPhase;
use crate::types::{ProjectId, RunStatus, ScanIssue};

const CHANNEL_CAPACITY: usize = 256;

/// Progress event types
#[derive(Debug, Clone)]
pub enum ProgressEvent {
    PhaseStarted { phase: RunPhase },
    ProjectDiscovered {
        id: ProjectId,
        path: String,
        discovered: usize,
    },
    /// Emitted once per classified project, failed or not
    ProjectCompleted {
        completed: usize,
        /// Projects discovered so far
        total: usize,
        path: String,
        failed: bool,
    },
    Warning { issue: ScanIssue },
    Finished {
        status: RunStatus,
        projects: usize,
        edges: usize,
        duration_ms: u64,
    },
}

/// Snapshot of a run's progress
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub phase: RunPhase,
    pub discovered: usize,
    pub completed: usize,
    pub current_item: String,
    pub warnings: usize,
    /// Projects classified per second
    pub throughput: f32,
    pub elapsed_secs: u64,
    pub is_running: bool,
}

impl Default for ProgressState {
    fn default() -> Self {
        Self {
            phase: RunPhase::Idle,
            discovered: 0,
            completed: 0,
            current_item: String::new(),
            warnings: 0,
            throughput: 0.0,
            elapsed_secs: 0,
            is_running: false,
        }
    }
}

/// Real-time progress tracker; clones share state and channel
#[derive(Clone)]
pub struct ProgressTracker {
    state: Arc<RwLock<ProgressState>>,
    sender: broadcast::Sender<ProgressEvent>,
    start_time: Arc<RwLock<Option<Instant>>>,
    active: Arc<AtomicBool>,
    discovered: Arc<AtomicUsize>,
    completed: Arc<AtomicUsize>,
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressTracker {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            state: Arc::new(RwLock::new(ProgressState::default())),
            sender,
            start_time: Arc::new(RwLock::new(None)),
            active: Arc::new(AtomicBool::new(false)),
            discovered: Arc::new(AtomicUsize::new(0)),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    #[inline]
    fn emit(&self, event: ProgressEvent) {
        // No receivers is normal when no UI is attached
        let _ = self.sender.send(event);
    }

    fn update(&self, f: impl FnOnce(&mut ProgressState)) {
        let mut state = self
            .state
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut state);
    }

    fn elapsed_secs_f32(&self) -> f32 {
        self.start_time
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .map(|s| s.elapsed().as_secs_f32())
            .unwrap_or(0.0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.sender.subscribe()
    }

    pub fn state(&self) -> ProgressState {
        self.state
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn start(&self) {
        self.active.store(true, Ordering::SeqCst);
        *self
            .start_time
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = Some(Instant::now());
        self.update(|state| state.is_running = true);
    }

    pub fn start_phase(&self, phase: RunPhase) {
        self.update(|state| state.phase = phase);
        self.emit(ProgressEvent::PhaseStarted { phase });
    }

    /// Count a discovered project; returns the running total
    pub fn project_discovered(&self, id: ProjectId, path: &str) -> usize {
        let discovered = self.discovered.fetch_add(1, Ordering::SeqCst) + 1;
        self.update(|state| state.discovered = discovered);
        self.emit(ProgressEvent::ProjectDiscovered {
            id,
            path: path.to_string(),
            discovered,
        });
        discovered
    }

    /// Count a finished classification; returns (completed, discovered so far)
    pub fn project_completed(&self, path: &str, failed: bool) -> (usize, usize) {
        let completed = self.completed.fetch_add(1, Ordering::SeqCst) + 1;
        let total = self.discovered.load(Ordering::SeqCst).max(completed);
        let elapsed = self.elapsed_secs_f32();
        self.update(|state| {
            state.completed = completed;
            state.discovered = total;
            state.current_item = path.to_string();
            state.throughput = completed as f32 / elapsed.max(0.1);
            state.elapsed_secs = elapsed as u64;
        });
        self.emit(ProgressEvent::ProjectCompleted {
            completed,
            total,
            path: path.to_string(),
            failed,
        });
        (completed, total)
    }

    pub fn warning(&self, issue: &ScanIssue) {
        self.update(|state| state.warnings += 1);
        self.emit(ProgressEvent::Warning {
            issue: issue.clone(),
        });
    }

    pub fn finish(&self, status: RunStatus, projects: usize, edges: usize) {
        let duration_ms = (self.elapsed_secs_f32() * 1000.0) as u64;
        self.active.store(false, Ordering::SeqCst);
        self.update(|state| {
            state.is_running = false;
            state.phase = RunPhase::Done;
        });
        self.emit(ProgressEvent::Finished {
            status,
            projects,
            edges,
            duration_ms,
        });
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }
}
