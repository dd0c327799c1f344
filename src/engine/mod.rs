//! Run orchestration: walking, parallel classification, detection and aggregation

pub mod aggregate;
pub mod cancel;
pub mod pipeline;
pub mod progress;
pub mod scheduler;
pub mod state;
pub mod timeout;

pub use aggregate::{RunParts, aggregate, summarize};
pub use cancel::{Budget, CancelToken};
pub use pipeline::{Engine, scan_path};
pub use progress::{ProgressEvent, ProgressState, ProgressTracker};
pub use scheduler::{ScheduleOutcome, Scheduler, sort_results};
pub use state::{RunPhase, RunState};
pub use timeout::{backstop, with_timeout};
