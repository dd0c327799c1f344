use serde::{Deserialize, Serialize};

use crate::types::{Result, ScanError};

/// Phase of one scan run
///
/// `Idle → Walking → Classifying → (DetectingServices) → Aggregated → Done`.
/// Service detection is optional and a cancelled run may jump to `Done` from
/// any phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    Idle = 0,
    Walking = 1,
    Classifying = 2,
    DetectingServices = 3,
    Aggregated = 4,
    Done = 5,
}

impl RunPhase {
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Walking => "Walking",
            Self::Classifying => "Classifying",
            Self::DetectingServices => "Detecting Services",
            Self::Aggregated => "Aggregated",
            Self::Done => "Done",
        }
    }

    /// Phases that report progress (everything between Idle and Done)
    pub const ACTIVE_COUNT: u8 = 4;

    pub fn can_advance_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        matches!(
            (self, next),
            (Idle, Walking)
                | (Walking, Classifying)
                | (Classifying, DetectingServices)
                | (Classifying, Aggregated)
                | (DetectingServices, Aggregated)
                | (Aggregated, Done)
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Per-run state machine
#[derive(Debug, Clone)]
pub struct RunState {
    phase: RunPhase,
    cancelled: bool,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::Idle,
            cancelled: false,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    pub fn advance(&mut self, next: RunPhase) -> Result<()> {
        if !self.phase.can_advance_to(next) {
            return Err(ScanError::Config(format!(
                "invalid run transition {} -> {}",
                self.phase, next
            )));
        }
        self.phase = next;
        Ok(())
    }

    /// Jump to `Done` after cancellation
    pub fn cancel(&mut self) {
        self.cancelled = true;
        self.phase = RunPhase::Done;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_run_with_detection() {
        let mut state = RunState::new();
        for phase in [
            RunPhase::Walking,
            RunPhase::Classifying,
            RunPhase::DetectingServices,
            RunPhase::Aggregated,
            RunPhase::Done,
        ] {
            state.advance(phase).unwrap();
        }
        assert_eq!(state.phase(), RunPhase::Done);
    }

    #[test]
    fn test_detection_can_be_skipped() {
        let mut state = RunState::new();
        state.advance(RunPhase::Walking).unwrap();
        state.advance(RunPhase::Classifying).unwrap();
        state.advance(RunPhase::Aggregated).unwrap();
        state.advance(RunPhase::Done).unwrap();
    }

    #[test]
    fn test_invalid_transitions() {
        let mut state = RunState::new();
        assert!(state.advance(RunPhase::Classifying).is_err());
        state.advance(RunPhase::Walking).unwrap();
        assert!(state.advance(RunPhase::Done).is_err());
        assert_eq!(state.phase(), RunPhase::Walking);
    }

    #[test]
    fn test_cancel_reaches_done() {
        let mut state = RunState::new();
        state.advance(RunPhase::Walking).unwrap();
        state.cancel();
        assert_eq!(state.phase(), RunPhase::Done);
        assert!(state.is_cancelled());
    }
}
