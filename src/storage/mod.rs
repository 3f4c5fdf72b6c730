//! Loop-state persistence.
//!
//! Two files per loop: a structured JSON snapshot (the durable contract,
//! rewritten atomically on every transition) and a markdown progress log
//! (appended for humans). A crash can lose at most the in-flight turn.

pub mod progress;
pub mod state_file;

pub use progress::ProgressLog;
pub use state_file::{StateDir, load, save};
