//! Run phase state machine.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The lifecycle phase of a single run.
///
/// Phases only move forward:
/// `Created -> Running -> Executing -> Unwinding -> Completed`.
/// `Executing` is never entered when the run is stopped before the job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    /// The context exists but the chain has not been invoked.
    Created,
    /// Forward traversal through the middlewares.
    Running,
    /// The terminal job step is executing.
    Executing,
    /// Post-processing while nested calls return.
    Unwinding,
    /// The record is finalized.
    Completed,
}

impl Default for RunPhase {
    fn default() -> Self {
        Self::Created
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Running => write!(f, "running"),
            Self::Executing => write!(f, "executing"),
            Self::Unwinding => write!(f, "unwinding"),
            Self::Completed => write!(f, "completed"),
        }
    }
}

impl RunPhase {
    /// Returns true if a stop request is accepted in this phase.
    #[must_use]
    pub fn accepts_stop(&self) -> bool {
        matches!(self, Self::Running | Self::Executing | Self::Unwinding)
    }

    /// Returns true if the phase is terminal.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed)
    }

    /// Returns true if moving to `next` keeps the phase order.
    #[must_use]
    pub fn can_advance_to(&self, next: Self) -> bool {
        !self.is_terminal() && next >= *self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_phase_display() {
        assert_eq!(RunPhase::Created.to_string(), "created");
        assert_eq!(RunPhase::Executing.to_string(), "executing");
        assert_eq!(RunPhase::Completed.to_string(), "completed");
    }

    #[test]
    fn test_run_phase_accepts_stop() {
        assert!(!RunPhase::Created.accepts_stop());
        assert!(RunPhase::Running.accepts_stop());
        assert!(RunPhase::Unwinding.accepts_stop());
        assert!(!RunPhase::Completed.accepts_stop());
    }

    #[test]
    fn test_run_phase_only_moves_forward() {
        assert!(RunPhase::Running.can_advance_to(RunPhase::Executing));
        assert!(RunPhase::Running.can_advance_to(RunPhase::Unwinding));
        assert!(!RunPhase::Unwinding.can_advance_to(RunPhase::Running));
        assert!(!RunPhase::Completed.can_advance_to(RunPhase::Completed));
    }

    #[test]
    fn test_run_phase_serialize() {
        let json = serde_json::to_string(&RunPhase::Unwinding).unwrap();
        assert_eq!(json, r#""unwinding""#);
    }
}
