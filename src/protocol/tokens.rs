//! Protocol token configuration.
//!
//! The in-band control protocol is a tiny fixed grammar of literal tokens
//! the agent embeds in its output. Tokens are injected into the detector and
//! the prompt composer as shared immutable configuration, so an alternate
//! protocol version can be swapped without touching control flow.

use serde::{Deserialize, Serialize};

/// The literal token strings of the control protocol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalTokens {
    /// Completion token for Ralph iterations
    pub ralph_complete: String,

    /// Completion token for Lisa work phases
    pub phase_complete: String,

    /// Approval token for Lisa review phases
    pub review_approved: String,

    /// Prefix of the rejection token; the work-phase target and the closing
    /// tag follow immediately
    pub review_reject_prefix: String,

    /// Closing tag that terminates a rejection token
    pub review_close: String,
}

impl Default for SignalTokens {
    fn default() -> Self {
        Self {
            ralph_complete: "<promise>COMPLETE</promise>".to_string(),
            phase_complete: "<lisa-phase>COMPLETE</lisa-phase>".to_string(),
            review_approved: "<lisa-review>APPROVED</lisa-review>".to_string(),
            review_reject_prefix: "<lisa-review>REJECT:".to_string(),
            review_close: "</lisa-review>".to_string(),
        }
    }
}

impl SignalTokens {
    /// Render a full rejection token for a target literal, for use in
    /// prompts that show the agent the exact syntax.
    pub fn reject_token(&self, target: &str) -> String {
        format!("{}{}{}", self.review_reject_prefix, target, self.review_close)
    }
}
