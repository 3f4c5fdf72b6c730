//! Ralph iteration controller.
//!
//! Decides, after each turn, whether the loop accepts completion, keeps
//! iterating, or hits the cap. The controller never trusts a completion
//! signal past an enabled evidence gate.

use crate::domain::{HaltStatus, RalphState};

/// What the driver should do after a Ralph turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationDecision {
    /// Re-prompt for another iteration, optionally clearing session context first
    Continue { clear_context: bool },

    /// The loop is done; it has been deactivated with this status
    Halt(HaltStatus),
}

/// The bounded single-phase retry loop.
pub struct IterationController;

impl IterationController {
    /// Apply one turn's outcome to the state.
    ///
    /// `completed` is whether the completion token was detected this turn.
    /// `evidence_passed` is the evidence gate verdict, None when the gate is
    /// disabled or was not consulted. A declared-but-unproven completion
    /// still consumes an iteration.
    pub fn advance(
        state: &mut RalphState,
        completed: bool,
        evidence_passed: Option<bool>,
    ) -> IterationDecision {
        let accepted = completed && (!state.require_evidence || evidence_passed == Some(true));
        if accepted {
            state.halt(HaltStatus::Complete);
            return IterationDecision::Halt(HaltStatus::Complete);
        }

        state.current_iteration += 1;
        if state.cap_reached() {
            state.halt(HaltStatus::Incomplete);
            return IterationDecision::Halt(HaltStatus::Incomplete);
        }

        IterationDecision::Continue {
            clear_context: state.clear_context_between_iterations,
        }
    }
}
