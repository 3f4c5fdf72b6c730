//! Loop driver - the top-level coordinator.
//!
//! One driver owns one loop and drives it to a terminal status:
//! compose a prompt, hand it to the transport, suspend until the turn
//! completes, detect the expected signal, apply the transition, persist the
//! snapshot, repeat.
//!
//! Driver phases: Idle -> AwaitingTurn -> Deciding -> (Idle | Halted).
//! The driver is the sole writer of the loop state while the loop is active.
//! Abort is cooperative and observed only at the Deciding boundary, so an
//! in-flight turn always finishes and the persisted state stays consistent.

use std::path::PathBuf;
use std::sync::Arc;

use log::{info, warn};
use serde::Serialize;
use tokio::sync::{mpsc, watch};

use crate::domain::{HaltStatus, LisaState, LoopState, RalphState};
use crate::error::Result;
use crate::machine::{IterationController, IterationDecision, PhaseDecision, PhaseMachine};
use crate::prompt::{PromptComposer, excerpt};
use crate::protocol::{Expected, SignalDetector, SignalTokens};
use crate::storage::{self, ProgressLog};

use super::evidence::EvidenceChecker;
use super::transport::{SessionTransport, TurnEvent};

/// Observable driver phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DriverPhase {
    /// Composing the next prompt
    Idle,
    /// Prompt sent; suspended until the turn-complete event
    AwaitingTurn,
    /// Turn finished; applying transition logic and persisting
    Deciding,
    /// Terminal
    Halted,
}

/// Drives one loop over an agent session.
pub struct LoopDriver {
    transport: Arc<dyn SessionTransport>,
    evidence: Option<Arc<dyn EvidenceChecker>>,
    workdir: PathBuf,
    detector: SignalDetector,
    composer: PromptComposer,
    turn_rx: mpsc::Receiver<TurnEvent>,
    abort_rx: watch::Receiver<bool>,
    phase: DriverPhase,
}

impl LoopDriver {
    /// Create a driver wired to a transport's turn-event channel and an
    /// abort flag.
    pub fn new(
        transport: Arc<dyn SessionTransport>,
        turn_rx: mpsc::Receiver<TurnEvent>,
        abort_rx: watch::Receiver<bool>,
        tokens: SignalTokens,
    ) -> Self {
        Self {
            transport,
            evidence: None,
            workdir: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            detector: SignalDetector::new(tokens.clone()),
            composer: PromptComposer::new(tokens),
            turn_rx,
            abort_rx,
            phase: DriverPhase::Idle,
        }
    }

    /// Attach an evidence checker and the working directory it inspects.
    pub fn with_evidence(mut self, checker: Arc<dyn EvidenceChecker>, workdir: impl Into<PathBuf>) -> Self {
        self.evidence = Some(checker);
        self.workdir = workdir.into();
        self
    }

    /// Current driver phase.
    pub fn phase(&self) -> DriverPhase {
        self.phase
    }

    /// Drive a Ralph loop to a terminal status.
    pub async fn run_ralph(&mut self, state: &mut RalphState) -> Result<HaltStatus> {
        let progress = ProgressLog::new(&state.progress_file);
        log_progress_begin(&progress, "Ralph loop", &state.original_prompt);
        storage::save(&state.state_file, &LoopState::Ralph(state.clone()))?;
        info!("ralph loop {} started for session {}", state.id, state.session_id);

        let mut last_excerpt: Option<String> = None;

        loop {
            self.phase = DriverPhase::Idle;
            let prompt = self.composer.compose_ralph(state, last_excerpt.as_deref());

            self.phase = DriverPhase::AwaitingTurn;
            if let Err(e) = self.transport.send(&state.session_id, &prompt).await {
                return self.halt_ralph(state, &progress, HaltStatus::Error, &e.to_string());
            }

            // Suspend until the transport reports the turn finished.
            let event = match self.turn_rx.recv().await {
                Some(event) => event,
                None => {
                    return self.halt_ralph(state, &progress, HaltStatus::Error, "turn channel closed");
                }
            };

            self.phase = DriverPhase::Deciding;

            // Cooperative abort: honored here, never mid-turn.
            if *self.abort_rx.borrow() {
                return self.halt_ralph(state, &progress, HaltStatus::Aborted, "user abort");
            }

            let text = match event {
                TurnEvent::Completed { text } => text,
                TurnEvent::Failed { error } => {
                    return self.halt_ralph(state, &progress, HaltStatus::Error, &error);
                }
            };

            let completed = self.detector.detect(&text, Expected::RalphCompletion).is_some();
            let evidence_passed = if completed && state.require_evidence {
                Some(self.check_evidence().await)
            } else {
                None
            };

            // Advance a copy; memory only moves once the snapshot is durable.
            let mut next = state.clone();
            let decision = IterationController::advance(&mut next, completed, evidence_passed);
            storage::save(&next.state_file, &LoopState::Ralph(next.clone()))?;
            *state = next;

            last_excerpt = Some(excerpt(&text));

            match decision {
                IterationDecision::Halt(status) => {
                    let reason = match status {
                        HaltStatus::Complete => "completion signal accepted",
                        _ => "iteration cap exhausted",
                    };
                    log_progress(&progress, &format!("halted: {}", status), reason);
                    self.phase = DriverPhase::Halted;
                    info!("ralph loop {} halted: {}", state.id, status);
                    return Ok(status);
                }
                IterationDecision::Continue { clear_context } => {
                    let note = if completed {
                        "completion declared but evidence check failed"
                    } else {
                        "no completion signal"
                    };
                    log_progress(
                        &progress,
                        &format!("iteration {} of {}", state.current_iteration, state.max_iterations),
                        note,
                    );
                    if clear_context && let Err(e) = self.transport.clear_context(&state.session_id).await {
                        warn!("failed to clear context for session {}: {}", state.session_id, e);
                    }
                }
            }
        }
    }

    /// Drive a Lisa workflow to a terminal status.
    pub async fn run_lisa(&mut self, state: &mut LisaState) -> Result<HaltStatus> {
        let progress = ProgressLog::new(&state.progress_file);
        log_progress_begin(&progress, "Lisa workflow", &state.original_prompt);
        storage::save(&state.state_file, &LoopState::Lisa(state.clone()))?;
        info!("lisa loop {} started for session {}", state.id, state.session_id);

        let mut last_excerpt: Option<String> = None;
        let mut feedback: Option<String> = None;

        loop {
            self.phase = DriverPhase::Idle;
            let prompt = self
                .composer
                .compose_lisa(state, last_excerpt.as_deref(), feedback.as_deref());

            self.phase = DriverPhase::AwaitingTurn;
            if let Err(e) = self.transport.send(&state.session_id, &prompt).await {
                return self.halt_lisa(state, &progress, HaltStatus::Error, &e.to_string());
            }

            let event = match self.turn_rx.recv().await {
                Some(event) => event,
                None => {
                    return self.halt_lisa(state, &progress, HaltStatus::Error, "turn channel closed");
                }
            };

            self.phase = DriverPhase::Deciding;

            if *self.abort_rx.borrow() {
                return self.halt_lisa(state, &progress, HaltStatus::Aborted, "user abort");
            }

            let text = match event {
                TurnEvent::Completed { text } => text,
                TurnEvent::Failed { error } => {
                    return self.halt_lisa(state, &progress, HaltStatus::Error, &error);
                }
            };

            let signal = self.detector.detect(&text, PhaseMachine::expected(state));

            let before = state.current_phase;
            let mut next = state.clone();
            let decision = PhaseMachine::apply(&mut next, signal);

            if decision == PhaseDecision::Finished {
                next.halt(HaltStatus::Complete);
            }

            // Optional global safety cap on total visits.
            let capped = next.active
                && next
                    .max_total_visits
                    .is_some_and(|cap| next.total_visits() >= cap);
            if capped {
                next.halt(HaltStatus::Incomplete);
            }

            storage::save(&next.state_file, &LoopState::Lisa(next.clone()))?;
            *state = next;

            last_excerpt = Some(excerpt(&text));
            feedback = match decision {
                PhaseDecision::Rejected(_) => Some(excerpt(&text)),
                _ => None,
            };

            match decision {
                PhaseDecision::Finished => {
                    log_progress(&progress, "halted: complete", "final review approved");
                    self.phase = DriverPhase::Halted;
                    info!("lisa loop {} halted: complete", state.id);
                    return Ok(HaltStatus::Complete);
                }
                PhaseDecision::Advanced(to) => {
                    log_progress(
                        &progress,
                        &format!("{} → {}", before, to),
                        &format!("visit {}", state.visit_count(to)),
                    );
                }
                PhaseDecision::Rejected(target) => {
                    log_progress(
                        &progress,
                        &format!("{} rejected to {}", before, target),
                        &format!("visit {}", state.visit_count(target)),
                    );
                }
                PhaseDecision::Retry => {
                    log_progress(
                        &progress,
                        &format!("{} retry (visit {})", before, state.visit_count(before)),
                        "no actionable signal",
                    );
                }
            }

            if capped {
                log_progress(&progress, "halted: incomplete", "total visit cap reached");
                self.phase = DriverPhase::Halted;
                info!("lisa loop {} halted: incomplete (visit cap)", state.id);
                return Ok(HaltStatus::Incomplete);
            }
        }
    }

    fn halt_ralph(
        &mut self,
        state: &mut RalphState,
        progress: &ProgressLog,
        status: HaltStatus,
        reason: &str,
    ) -> Result<HaltStatus> {
        state.halt(status);
        storage::save(&state.state_file, &LoopState::Ralph(state.clone()))?;
        log_progress(progress, &format!("halted: {}", status), reason);
        self.phase = DriverPhase::Halted;
        info!("ralph loop {} halted: {} ({})", state.id, status, reason);
        Ok(status)
    }

    fn halt_lisa(
        &mut self,
        state: &mut LisaState,
        progress: &ProgressLog,
        status: HaltStatus,
        reason: &str,
    ) -> Result<HaltStatus> {
        state.halt(status);
        storage::save(&state.state_file, &LoopState::Lisa(state.clone()))?;
        log_progress(progress, &format!("halted: {}", status), reason);
        self.phase = DriverPhase::Halted;
        info!("lisa loop {} halted: {} ({})", state.id, status, reason);
        Ok(status)
    }

    /// Run the evidence gate. An unconfigured checker accepts; a checker
    /// that fails to run counts as a failed check ("not yet done").
    async fn check_evidence(&self) -> bool {
        let Some(checker) = &self.evidence else {
            warn!("evidence required but no checker configured; accepting completion");
            return true;
        };
        match checker.check(&self.workdir).await {
            Ok(passed) => passed,
            Err(e) => {
                warn!("evidence check failed to run: {}", e);
                false
            }
        }
    }
}

/// Progress-log writes are for humans; a failed write never stops the loop.
fn log_progress(progress: &ProgressLog, heading: &str, body: &str) {
    if let Err(e) = progress.append(heading, body) {
        warn!("could not append to progress log {}: {}", progress.path().display(), e);
    }
}

fn log_progress_begin(progress: &ProgressLog, title: &str, task: &str) {
    if let Err(e) = progress.begin(title, task) {
        warn!("could not write progress log {}: {}", progress.path().display(), e);
    }
}
