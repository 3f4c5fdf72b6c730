//! Prompt composition.
//!
//! Builds the instruction text for each loop turn from the original task,
//! a bounded excerpt of the previous response, and phase-specific
//! boilerplate that names the exact required output signal.

pub mod composer;
pub mod excerpt;

pub use composer::PromptComposer;
pub use excerpt::{EXCERPT_CAP, TRUNCATION_MARKER, excerpt};
