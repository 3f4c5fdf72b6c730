//! Session-level loop management.
//!
//! The manager is the surface a UI layer calls: start a loop on a session,
//! abort it, query its state. Each session owns at most one active loop;
//! drivers run as independent tasks and share no mutable state, so no
//! cross-session locking is needed.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use log::info;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::domain::{HaltStatus, LisaOptions, LisaState, LoopMode, LoopState, RalphOptions, RalphState};
use crate::error::{Result, ShepherdError};
use crate::protocol::SignalTokens;
use crate::storage::StateDir;

use super::loop_driver::LoopDriver;
use super::evidence::EvidenceChecker;
use super::transport::{SessionTransport, TurnEvent};

struct SessionHandle {
    loop_id: String,
    mode: LoopMode,
    abort_tx: watch::Sender<bool>,
    join: JoinHandle<Result<HaltStatus>>,
}

/// Starts, aborts, and inspects loops across sessions.
pub struct LoopManager {
    transport: Arc<dyn SessionTransport>,
    evidence: Option<Arc<dyn EvidenceChecker>>,
    state_dir: StateDir,
    tokens: SignalTokens,
    sessions: Mutex<HashMap<String, SessionHandle>>,
}

impl LoopManager {
    /// Create a manager over a transport and a state directory.
    pub fn new(transport: Arc<dyn SessionTransport>, state_dir: StateDir) -> Self {
        Self {
            transport,
            evidence: None,
            state_dir,
            tokens: SignalTokens::default(),
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Swap in an alternate protocol token set.
    pub fn with_tokens(mut self, tokens: SignalTokens) -> Self {
        self.tokens = tokens;
        self
    }

    /// Attach the evidence checker used by Ralph loops that require it.
    pub fn with_evidence(mut self, checker: Arc<dyn EvidenceChecker>) -> Self {
        self.evidence = Some(checker);
        self
    }

    /// Start a Ralph loop on a session. Returns the loop id.
    ///
    /// `turn_rx` is the channel on which the caller's transport delivers
    /// this session's turn-complete events.
    pub fn start_ralph(
        &self,
        session_id: &str,
        prompt: &str,
        options: RalphOptions,
        turn_rx: mpsc::Receiver<TurnEvent>,
    ) -> Result<String> {
        let mut state = RalphState::new(session_id, prompt, &options, PathBuf::new(), PathBuf::new());
        state.state_file = self.state_dir.state_path(&state.id);
        state.progress_file = self.state_dir.progress_path(&state.id);

        let workdir = options.workdir.clone();
        self.spawn(session_id, LoopState::Ralph(state), workdir, turn_rx)
    }

    /// Start a Lisa workflow on a session. Returns the loop id.
    pub fn start_lisa(
        &self,
        session_id: &str,
        prompt: &str,
        options: LisaOptions,
        turn_rx: mpsc::Receiver<TurnEvent>,
    ) -> Result<String> {
        let mut state = LisaState::new(session_id, prompt, &options, PathBuf::new(), PathBuf::new());
        state.state_file = self.state_dir.state_path(&state.id);
        state.progress_file = self.state_dir.progress_path(&state.id);

        self.spawn(session_id, LoopState::Lisa(state), None, turn_rx)
    }

    /// Resume the most recent still-active loop persisted for a session,
    /// e.g. after an app restart.
    pub fn resume(&self, session_id: &str, turn_rx: mpsc::Receiver<TurnEvent>) -> Result<String> {
        let state = self.state_dir.find_active(session_id)?;

        if let LoopState::Lisa(lisa) = &state
            && !lisa.counts_match_history()
        {
            return Err(ShepherdError::InvalidState(format!(
                "snapshot for loop {} has inconsistent visit counts",
                lisa.id
            )));
        }

        info!("resuming {} loop {} for session {}", match state.mode() {
            LoopMode::Ralph => "ralph",
            LoopMode::Lisa => "lisa",
            LoopMode::Off => "off",
        }, state.loop_id(), session_id);

        self.spawn(session_id, state, None, turn_rx)
    }

    fn spawn(
        &self,
        session_id: &str,
        state: LoopState,
        workdir: Option<PathBuf>,
        turn_rx: mpsc::Receiver<TurnEvent>,
    ) -> Result<String> {
        let mut sessions = self
            .sessions
            .lock()
            .map_err(|e| ShepherdError::InvalidState(e.to_string()))?;

        if let Some(handle) = sessions.get(session_id)
            && !handle.join.is_finished()
        {
            return Err(ShepherdError::InvalidState(format!(
                "session {} already has an active loop",
                session_id
            )));
        }

        let (abort_tx, abort_rx) = watch::channel(false);
        let mut driver = LoopDriver::new(self.transport.clone(), turn_rx, abort_rx, self.tokens.clone());
        if let Some(checker) = &self.evidence {
            let workdir = workdir.unwrap_or_else(|| {
                std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
            });
            driver = driver.with_evidence(checker.clone(), workdir);
        }

        let loop_id = state.loop_id().to_string();
        let mode = state.mode();
        let join = tokio::spawn(async move {
            match state {
                LoopState::Ralph(mut ralph) => driver.run_ralph(&mut ralph).await,
                LoopState::Lisa(mut lisa) => driver.run_lisa(&mut lisa).await,
            }
        });

        sessions.insert(
            session_id.to_string(),
            SessionHandle {
                loop_id: loop_id.clone(),
                mode,
                abort_tx,
                join,
            },
        );
        Ok(loop_id)
    }

    /// Request a cooperative abort. Takes effect at the driver's next
    /// decision boundary; the in-flight turn is allowed to finish.
    pub fn abort(&self, session_id: &str) -> Result<()> {
        let sessions = self
            .sessions
            .lock()
            .map_err(|e| ShepherdError::InvalidState(e.to_string()))?;
        let handle = sessions
            .get(session_id)
            .ok_or_else(|| ShepherdError::LoopNotFound(session_id.to_string()))?;

        // A loop that already halted has dropped its receiver; aborting it
        // is a no-op rather than an error.
        let _ = handle.abort_tx.send(true);
        info!("abort requested for session {}", session_id);
        Ok(())
    }

    /// Which loop mode the session is currently running.
    pub fn mode(&self, session_id: &str) -> LoopMode {
        let sessions = match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        match sessions.get(session_id) {
            Some(handle) if !handle.join.is_finished() => handle.mode,
            _ => LoopMode::Off,
        }
    }

    /// The persisted state of the session's loop, current or most recent.
    ///
    /// Reads the snapshot file, which the driver rewrites on every
    /// transition; the file is the single source of truth.
    pub fn state(&self, session_id: &str) -> Result<Option<LoopState>> {
        let loop_id = {
            let sessions = self
                .sessions
                .lock()
                .map_err(|e| ShepherdError::InvalidState(e.to_string()))?;
            sessions.get(session_id).map(|h| h.loop_id.clone())
        };

        match loop_id {
            Some(id) => self.state_dir.load(&id),
            None => self.state_dir.find_by_session(session_id),
        }
    }

    /// Wait for the session's loop to halt and return its terminal status.
    pub async fn wait(&self, session_id: &str) -> Result<HaltStatus> {
        let handle = {
            let mut sessions = self
                .sessions
                .lock()
                .map_err(|e| ShepherdError::InvalidState(e.to_string()))?;
            sessions
                .remove(session_id)
                .ok_or_else(|| ShepherdError::LoopNotFound(session_id.to_string()))?
        };

        match handle.join.await {
            Ok(result) => result,
            Err(e) => Err(ShepherdError::InvalidState(format!(
                "driver task failed: {}",
                e
            ))),
        }
    }
}
