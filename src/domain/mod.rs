//! Domain types for Shepherd loops.
//!
//! The two loop states (Ralph, Lisa) are the durable core of the system:
//! created when a loop mode is enabled on a session, mutated exclusively by
//! the loop driver, persisted on every mutation.

pub mod lisa;
pub mod phase;
pub mod ralph;
pub mod status;

pub use lisa::{LisaOptions, LisaState, PhaseVisit};
pub use phase::Phase;
pub use ralph::{RalphOptions, RalphState};
pub use status::{HaltStatus, LoopMode};

use serde::{Deserialize, Serialize};

/// Tagged union persisted to the state file.
///
/// This is the durable contract other tooling reads; it round-trips exactly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "lowercase")]
pub enum LoopState {
    Ralph(RalphState),
    Lisa(LisaState),
}

impl LoopState {
    /// Which loop variant this state belongs to.
    pub fn mode(&self) -> LoopMode {
        match self {
            LoopState::Ralph(_) => LoopMode::Ralph,
            LoopState::Lisa(_) => LoopMode::Lisa,
        }
    }

    /// The session the loop is attached to.
    pub fn session_id(&self) -> &str {
        match self {
            LoopState::Ralph(s) => &s.session_id,
            LoopState::Lisa(s) => &s.session_id,
        }
    }

    /// The loop's unique id.
    pub fn loop_id(&self) -> &str {
        match self {
            LoopState::Ralph(s) => &s.id,
            LoopState::Lisa(s) => &s.id,
        }
    }

    /// Whether the loop is still running.
    pub fn is_active(&self) -> bool {
        match self {
            LoopState::Ralph(s) => s.active,
            LoopState::Lisa(s) => s.active,
        }
    }

    /// Terminal status, if the loop has halted.
    pub fn halted(&self) -> Option<HaltStatus> {
        match self {
            LoopState::Ralph(s) => s.halted,
            LoopState::Lisa(s) => s.halted,
        }
    }

    /// Path of the structured snapshot file.
    pub fn state_file(&self) -> &std::path::Path {
        match self {
            LoopState::Ralph(s) => &s.state_file,
            LoopState::Lisa(s) => &s.state_file,
        }
    }

    /// Path of the markdown progress log.
    pub fn progress_file(&self) -> &std::path::Path {
        match self {
            LoopState::Ralph(s) => &s.progress_file,
            LoopState::Lisa(s) => &s.progress_file,
        }
    }
}
