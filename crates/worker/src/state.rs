//! Worker lifecycle states.

use serde::{Deserialize, Serialize};

/// Lifecycle state of one worker instance.
///
/// A fresh instance is Parsed; install and activate each fire at most once
/// and move it forward. Redundant is terminal: the instance never serves
/// fetches and the host replaces it on the next load.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerState {
    /// Initial state, before the install event.
    Parsed,
    /// Install event dispatched, prefetch in flight.
    Installing,
    /// Generation fully populated, waiting for activation.
    Installed,
    /// Activate event dispatched, stale sweep in flight.
    Activating,
    /// Active and intercepting fetches.
    Activated,
    /// Install or activation failed; instance is dead.
    Redundant,
}

impl WorkerState {
    /// Check if this state allows fetch interception.
    pub fn can_intercept_fetch(&self) -> bool {
        matches!(self, WorkerState::Activated)
    }

    /// Check if the worker is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, WorkerState::Redundant)
    }
}

impl std::fmt::Display for WorkerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WorkerState::Parsed => write!(f, "parsed"),
            WorkerState::Installing => write!(f, "installing"),
            WorkerState::Installed => write!(f, "installed"),
            WorkerState::Activating => write!(f, "activating"),
            WorkerState::Activated => write!(f, "activated"),
            WorkerState::Redundant => write!(f, "redundant"),
        }
    }
}
