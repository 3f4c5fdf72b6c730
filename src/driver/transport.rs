//! Session transport seam.
//!
//! The transport owns the live agent session. The driver never polls: turn
//! completion arrives as `TurnEvent`s on a per-session mpsc channel, and the
//! driver suspends on that channel between prompts.
//!
//! While a loop is active the driver is the only party sending prompts into
//! the session; the transport layer is responsible for queueing or rejecting
//! manual user input so turns are never interleaved.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::{Result, ShepherdError};

/// Event emitted by the transport when an agent turn ends.
#[derive(Debug, Clone)]
pub enum TurnEvent {
    /// The turn finished; carries the full accumulated response text
    Completed { text: String },

    /// The session died or the transport failed unrecoverably
    Failed { error: String },
}

/// Abstraction over the live agent session.
#[async_trait]
pub trait SessionTransport: Send + Sync {
    /// Hand a composed prompt to the session. Returns once the transport has
    /// accepted it; the turn itself completes asynchronously via `TurnEvent`.
    async fn send(&self, session_id: &str, prompt: &str) -> Result<()>;

    /// Drop the session's conversational context (Ralph fresh-context mode).
    async fn clear_context(&self, session_id: &str) -> Result<()>;
}

/// Create the turn-event channel connecting a transport to one driver.
pub fn turn_channel(capacity: usize) -> (mpsc::Sender<TurnEvent>, mpsc::Receiver<TurnEvent>) {
    mpsc::channel(capacity)
}

/// Scripted transport for tests and dry runs.
///
/// Each `send` consumes the next scripted event and delivers it on the turn
/// channel immediately, so a whole loop run is deterministic. An exhausted
/// script delivers a failure event.
pub struct MockTransport {
    script: Mutex<VecDeque<TurnEvent>>,
    tx: mpsc::Sender<TurnEvent>,
    sent: Mutex<Vec<String>>,
    context_clears: AtomicU32,
}

impl MockTransport {
    /// Create a mock that delivers events on `tx`.
    pub fn new(tx: mpsc::Sender<TurnEvent>) -> Self {
        Self {
            script: Mutex::new(VecDeque::new()),
            tx,
            sent: Mutex::new(Vec::new()),
            context_clears: AtomicU32::new(0),
        }
    }

    /// Queue a successful turn with the given response text.
    pub fn push_response(&self, text: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(TurnEvent::Completed { text: text.into() });
    }

    /// Queue a transport failure.
    pub fn push_failure(&self, error: impl Into<String>) {
        self.script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push_back(TurnEvent::Failed { error: error.into() });
    }

    /// Prompts received so far, in order.
    pub fn sent_prompts(&self) -> Vec<String> {
        self.sent.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// How many times the session context was cleared.
    pub fn context_clears(&self) -> u32 {
        self.context_clears.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl SessionTransport for MockTransport {
    async fn send(&self, _session_id: &str, prompt: &str) -> Result<()> {
        self.sent
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(prompt.to_string());

        let event = self
            .script
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_else(|| TurnEvent::Failed {
                error: "mock transport script exhausted".to_string(),
            });

        self.tx
            .send(event)
            .await
            .map_err(|_| ShepherdError::Transport("turn channel closed".to_string()))
    }

    async fn clear_context(&self, _session_id: &str) -> Result<()> {
        self.context_clears.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
