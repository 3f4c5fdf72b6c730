//! Ralph loop state.
//!
//! A Ralph loop drives the same task through bounded iterations until the
//! agent emits the completion token (and the optional evidence gate passes)
//! or the cap runs out.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::{generate_loop_id, now_ms};

use super::status::HaltStatus;

/// Behavior knobs for a Ralph loop, fixed at start time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RalphOptions {
    /// Maximum iterations before the loop reports `incomplete`
    pub max_iterations: u32,

    /// Require the evidence gate to pass before trusting a completion signal
    pub require_evidence: bool,

    /// Drop the session's conversational context between iterations
    pub clear_context_between_iterations: bool,

    /// Working directory handed to the evidence checker (defaults to cwd)
    pub workdir: Option<PathBuf>,
}

impl Default for RalphOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10,
            require_evidence: false,
            clear_context_between_iterations: false,
            workdir: None,
        }
    }
}

/// Durable state of one Ralph loop instance.
///
/// Mutated only by the loop driver; persisted on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RalphState {
    /// Unique loop identifier
    pub id: String,

    /// Session this loop is attached to
    pub session_id: String,

    /// The task as the user stated it
    pub original_prompt: String,

    /// Iteration cap; the loop deactivates at or before reaching it
    pub max_iterations: u32,

    /// Completed (non-accepting) turns so far
    pub current_iteration: u32,

    /// False once the loop has halted for any reason
    pub active: bool,

    /// Whether completion signals are gated on the evidence check
    pub require_evidence: bool,

    /// Whether the session context is reset between iterations
    pub clear_context_between_iterations: bool,

    /// When the loop was started (Unix ms)
    pub started_at: i64,

    /// Terminal status, set when the loop halts
    pub halted: Option<HaltStatus>,

    /// When the loop halted (Unix ms)
    pub halted_at: Option<i64>,

    /// Human-readable markdown log, appended every turn
    pub progress_file: PathBuf,

    /// Structured snapshot, rewritten atomically every transition
    pub state_file: PathBuf,
}

impl RalphState {
    /// Create a new Ralph loop for a session.
    pub fn new(
        session_id: impl Into<String>,
        prompt: impl Into<String>,
        options: &RalphOptions,
        state_file: PathBuf,
        progress_file: PathBuf,
    ) -> Self {
        let session_id = session_id.into();
        Self {
            id: generate_loop_id(&session_id),
            session_id,
            original_prompt: prompt.into(),
            max_iterations: options.max_iterations.max(1),
            current_iteration: 0,
            active: true,
            require_evidence: options.require_evidence,
            clear_context_between_iterations: options.clear_context_between_iterations,
            started_at: now_ms(),
            halted: None,
            halted_at: None,
            progress_file,
            state_file,
        }
    }

    /// Whether the iteration cap has been reached.
    pub fn cap_reached(&self) -> bool {
        self.current_iteration >= self.max_iterations
    }

    /// Iterations left before the cap.
    pub fn remaining_iterations(&self) -> u32 {
        self.max_iterations.saturating_sub(self.current_iteration)
    }

    /// Deactivate the loop with a terminal status.
    pub fn halt(&mut self, status: HaltStatus) {
        self.active = false;
        self.halted = Some(status);
        self.halted_at = Some(now_ms());
    }
}
