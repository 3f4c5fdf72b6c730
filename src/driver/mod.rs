//! Loop driving and session coordination.
//!
//! The driver runs one loop over one session; the manager is the
//! caller-facing surface (start, abort, state) across sessions. External
//! collaborators plug in through the `SessionTransport` and
//! `EvidenceChecker` traits.

pub mod evidence;
pub mod loop_driver;
pub mod manager;
pub mod transport;

pub use loop_driver::{DriverPhase, LoopDriver};
pub use evidence::{EvidenceChecker, GlobEvidence};
pub use manager::LoopManager;
pub use transport::{MockTransport, SessionTransport, TurnEvent, turn_channel};
