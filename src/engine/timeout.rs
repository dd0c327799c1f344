//! Async time limits for blocking work
//!
//! The classifier checks its own deadline between files. These wrappers are the
//! backstop for work that stops checking (a pathological regex on a large file).

use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::types::{Result, ScanError};

/// Await `future` for at most `timeout`, or forever when `None`
///
/// Expiry yields `ClassificationTimeout` for `path`.
pub async fn with_timeout<T, F>(timeout: Option<Duration>, future: F, path: &Path) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    let Some(limit) = timeout else {
        return future.await;
    };
    match tokio::time::timeout(limit, future).await {
        Ok(result) => result,
        Err(_) => Err(ScanError::timeout(path, limit)),
    }
}

/// Backstop limit for a task whose cooperative deadline is `budget`
///
/// Leaves slack for the in-flight file read to finish and report the timeout
/// itself.
pub fn backstop(budget: Option<Duration>) -> Option<Duration> {
    budget.map(|b| b + b / 4 + Duration::from_secs(1))
}
