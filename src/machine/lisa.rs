//! Lisa phase state machine.
//!
//! Applies one turn's detected signal to the workflow state. Forward
//! transitions walk the fixed phase order; rejections jump back to a work
//! phase allowed by the backward table. Every branch records exactly one
//! visit, which keeps the counter/history invariant without further
//! bookkeeping.

use log::warn;

use crate::domain::{LisaState, Phase};
use crate::protocol::{Expected, Signal};

/// Outcome of applying one turn's signal to the workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhaseDecision {
    /// No actionable signal; stay in the current phase and re-prompt
    Retry,

    /// Moved forward to the given phase
    Advanced(Phase),

    /// A reviewer sent control back to the given work phase
    Rejected(Phase),

    /// FinalReview approved; the workflow is done
    Finished,
}

/// The six-phase workflow transition function.
pub struct PhaseMachine;

impl PhaseMachine {
    /// Which signal class the current phase can legally emit.
    pub fn expected(state: &LisaState) -> Expected {
        if state.current_phase.is_review() {
            Expected::Review
        } else {
            Expected::PhaseCompletion
        }
    }

    /// Apply a detected signal to the state.
    ///
    /// A missing or malformed signal is resolved as "not yet done": the
    /// workflow stays in the same phase and that phase's counter advances so
    /// the next prompt carries a revisit marker.
    pub fn apply(state: &mut LisaState, signal: Option<Signal>) -> PhaseDecision {
        let current = state.current_phase;

        match signal {
            Some(Signal::PhaseComplete) if current.is_work() => {
                let next = current
                    .next()
                    .expect("every work phase is followed by its review phase");
                state.record_visit(next);
                PhaseDecision::Advanced(next)
            }
            Some(Signal::ReviewApproved) if current.is_review() => match current.next() {
                Some(next) => {
                    state.record_visit(next);
                    PhaseDecision::Advanced(next)
                }
                None => PhaseDecision::Finished,
            },
            Some(Signal::ReviewRejected(target)) if current.is_review() => {
                if current.allows_reject_to(target) {
                    state.record_visit(target);
                    PhaseDecision::Rejected(target)
                } else {
                    warn!(
                        "{} may not reject to {}; treating turn as inconclusive",
                        current, target
                    );
                    state.record_visit(current);
                    PhaseDecision::Retry
                }
            }
            _ => {
                state.record_visit(current);
                PhaseDecision::Retry
            }
        }
    }
}
