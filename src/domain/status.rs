//! Loop mode and terminal status types.

use serde::{Deserialize, Serialize};

/// Which loop variant a session is running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoopMode {
    /// Single-phase bounded-iteration retry loop
    Ralph,
    /// Six-phase reviewed workflow with backtracking
    Lisa,
    /// No loop active
    Off,
}

/// Why a loop halted. Every halt is explicit; there is no silent stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HaltStatus {
    /// The agent declared completion and any evidence gate passed
    Complete,
    /// The iteration or visit cap was exhausted before completion
    Incomplete,
    /// The user aborted; takes effect at a turn boundary
    Aborted,
    /// Transport or persistence failure
    Error,
}

impl HaltStatus {
    /// Returns true only for a genuine completion
    pub fn is_success(&self) -> bool {
        matches!(self, HaltStatus::Complete)
    }
}

impl std::fmt::Display for HaltStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            HaltStatus::Complete => "complete",
            HaltStatus::Incomplete => "incomplete",
            HaltStatus::Aborted => "aborted",
            HaltStatus::Error => "error",
        };
        f.write_str(s)
    }
}
