//! In-band control protocol.
//!
//! The agent declares completion, approval, and rejection with literal
//! tokens embedded in free-form output. This module owns the token grammar
//! and its detection, decoupled from prompt wording so the protocol can be
//! tested on its own.

pub mod detector;
pub mod tokens;

pub use detector::{Expected, Signal, SignalDetector};
pub use tokens::SignalTokens;
