use super::types::RunPhase;
use crate::error::{Error, Result};

impl RunPhase {
    /// Check if moving from the current phase to `next` is valid.
    ///
    /// Valid transitions:
    /// - `Unassigned` -> `Assigned` | `Released`
    /// - `Assigned` -> `Assigned` (re-entry) | `Released`
    ///
    /// `Released` is terminal; a later run starts over with a new run id.
    pub fn can_transition_to(&self, next: &RunPhase) -> bool {
        match self {
            RunPhase::Unassigned => matches!(next, RunPhase::Assigned | RunPhase::Released),
            RunPhase::Assigned => matches!(next, RunPhase::Assigned | RunPhase::Released),
            RunPhase::Released => false,
        }
    }

    pub fn try_transition(&self, next: RunPhase) -> Result<RunPhase> {
        if self.can_transition_to(&next) {
            Ok(next)
        } else {
            Err(Error::InvalidTransition {
                from: self.to_string(),
                to: next.to_string(),
            })
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Released)
    }
}
