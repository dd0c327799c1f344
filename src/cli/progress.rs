//! Terminal progress rendering
//!
//! Polls the engine's [`ProgressTracker`] and redraws one status line on
//! stderr, so stdout stays clean for JSON reports.

use std::io::Write;
use std::time::Duration;

use console::style;

use crate::engine::{ProgressState, ProgressTracker, RunPhase};

const SPINNER: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

pub struct ConsoleRenderer {
    tracker: ProgressTracker,
    show_spinner: bool,
}

impl ConsoleRenderer {
    pub fn new(tracker: ProgressTracker) -> Self {
        Self {
            tracker,
            show_spinner: true,
        }
    }

    pub fn with_spinner(mut self, show: bool) -> Self {
        self.show_spinner = show;
        self
    }

    /// Current state as one line; empty when no run is active
    pub fn render(&self) -> String {
        render_state(&self.tracker.state(), self.show_spinner)
    }

    /// Redraw every 100ms until the returned handle is aborted
    pub fn start_render_loop(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut stderr = std::io::stderr();
            loop {
                let line = self.render();
                if !line.is_empty() {
                    let _ = write!(stderr, "\r\x1B[K{}", line);
                    let _ = stderr.flush();
                }
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        })
    }
}

/// Erase the status line left by a stopped render loop
pub fn clear_line() {
    let mut stderr = std::io::stderr();
    let _ = write!(stderr, "\r\x1B[K");
    let _ = stderr.flush();
}

fn render_state(state: &ProgressState, show_spinner: bool) -> String {
    if !state.is_running {
        return String::new();
    }

    let spinner = if show_spinner {
        format!("{} ", SPINNER[(state.elapsed_secs as usize) % SPINNER.len()])
    } else {
        String::new()
    };
    let throughput = if state.throughput > 0.0 {
        format!(" ({:.1}/s)", state.throughput)
    } else {
        String::new()
    };
    let warnings = if state.warnings > 0 {
        format!(" {}", style(format!("{} warnings", state.warnings)).yellow())
    } else {
        String::new()
    };

    format!(
        "{}[{}/{}] {} {} {}/{}{}{} {}",
        spinner,
        state.phase.as_u8().min(RunPhase::ACTIVE_COUNT),
        RunPhase::ACTIVE_COUNT,
        state.phase,
        render_progress_bar(state.completed, state.discovered, 30),
        state.completed,
        state.discovered,
        throughput,
        warnings,
        style(&state.current_item).dim()
    )
}

/// Render a simple progress bar
fn render_progress_bar(completed: usize, total: usize, width: usize) -> String {
    if total == 0 {
        return format!("[{}]", " ".repeat(width));
    }

    let progress = (completed as f32 / total as f32).min(1.0);
    let filled = (progress * width as f32) as usize;
    let empty = width.saturating_sub(filled);

    format!("[{}{}]", "█".repeat(filled), "░".repeat(empty))
}

/// Format duration as human-readable string
pub fn format_duration(millis: u64) -> String {
    let secs = millis / 1000;
    if secs == 0 {
        format!("{}ms", millis)
    } else if secs < 60 {
        format!("{}.{}s", secs, (millis % 1000) / 100)
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m", secs / 3600, (secs % 3600) / 60)
    }
}
