//! Cooperative cancellation and per-project time budgets

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use crate::types::{Result, ScanError};

/// Shared cancellation flag
///
/// Cloning shares the flag. Cancellation is one-way.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Deadline plus cancellation, checked between units of work
#[derive(Debug, Clone, Default)]
pub struct Budget {
    deadline: Option<(Instant, Duration)>,
    cancel: CancelToken,
}

impl Budget {
    pub fn new(timeout: Option<Duration>, cancel: CancelToken) -> Self {
        Self {
            deadline: timeout.map(|t| (Instant::now() + t, t)),
            cancel,
        }
    }

    /// Budget that never expires and cannot be cancelled
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// `Err(Cancelled)` or `Err(ClassificationTimeout)` once the budget is spent
    pub fn check(&self, path: &Path) -> Result<()> {
        if self.cancel.is_cancelled() {
            return Err(ScanError::Cancelled);
        }
        if let Some((deadline, duration)) = self.deadline
            && Instant::now() >= deadline
        {
            return Err(ScanError::timeout(path, duration));
        }
        Ok(())
    }
}
