//! Loop transition logic.
//!
//! Pure state-machine code: the Lisa phase machine and the Ralph iteration
//! controller. Both operate on domain state only; IO and timing live in the
//! driver.

pub mod lisa;
pub mod ralph;

pub use lisa::{PhaseDecision, PhaseMachine};
pub use ralph::{IterationController, IterationDecision};
