//! Signal detection over raw agent output.
//!
//! Pure, case-sensitive substring scanning for protocol tokens. The
//! detector is parameterized by the signal class the current phase can
//! legally emit, so completion tokens are never honored in review phases
//! and vice versa.

use log::warn;

use crate::domain::Phase;

use super::tokens::SignalTokens;

/// A control signal embedded in agent output.
///
/// Signals are only ever produced by detection over real output, never
/// constructed speculatively.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Signal {
    /// The agent declared the current work phase (or Ralph task) done
    PhaseComplete,

    /// A reviewer approved the phase under review
    ReviewApproved,

    /// A reviewer sent control back to a work phase
    ReviewRejected(Phase),
}

/// Which class of signal the current phase can legally emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expected {
    /// Ralph iteration: the promise completion token
    RalphCompletion,

    /// Lisa work phase: the phase completion token
    PhaseCompletion,

    /// Lisa review phase: approval or rejection
    Review,
}

/// Scans agent output for protocol tokens.
#[derive(Debug, Clone, Default)]
pub struct SignalDetector {
    tokens: SignalTokens,
}

impl SignalDetector {
    /// Create a detector over the given token set.
    pub fn new(tokens: SignalTokens) -> Self {
        Self { tokens }
    }

    /// The token set this detector scans for.
    pub fn tokens(&self) -> &SignalTokens {
        &self.tokens
    }

    /// Scan `text` for the expected signal class.
    ///
    /// Returns None when no actionable signal is present, including when a
    /// rejection names an invalid target (the caller falls back to "not yet
    /// done" rather than guessing intent). Pure and idempotent.
    pub fn detect(&self, text: &str, expected: Expected) -> Option<Signal> {
        match expected {
            Expected::RalphCompletion => text
                .contains(&self.tokens.ralph_complete)
                .then_some(Signal::PhaseComplete),
            Expected::PhaseCompletion => text
                .contains(&self.tokens.phase_complete)
                .then_some(Signal::PhaseComplete),
            Expected::Review => self.detect_review(text),
        }
    }

    /// REJECT takes precedence over APPROVED: a reviewer that emits both is
    /// hedging and must be treated as rejecting.
    fn detect_review(&self, text: &str) -> Option<Signal> {
        if let Some(signal) = self.detect_reject(text) {
            return Some(signal);
        }
        text.contains(&self.tokens.review_approved)
            .then_some(Signal::ReviewApproved)
    }

    fn detect_reject(&self, text: &str) -> Option<Signal> {
        let mut rest = text;
        while let Some(start) = rest.find(&self.tokens.review_reject_prefix) {
            let after_prefix = &rest[start + self.tokens.review_reject_prefix.len()..];
            let Some(end) = after_prefix.find(&self.tokens.review_close) else {
                return None;
            };
            let target = &after_prefix[..end];
            match Phase::parse_reject_target(target) {
                Some(phase) => return Some(Signal::ReviewRejected(phase)),
                None => {
                    warn!("ignoring rejection with invalid target {:?}", target);
                    rest = &after_prefix[end + self.tokens.review_close.len()..];
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn detector() -> SignalDetector {
        SignalDetector::new(SignalTokens::default())
    }

    #[test]
    fn test_ralph_completion_substring() {
        let d = detector();
        let text = "All tests pass now.\n<promise>COMPLETE</promise>\nDone.";
        assert_eq!(d.detect(text, Expected::RalphCompletion), Some(Signal::PhaseComplete));
    }

    #[test]
    fn test_phase_completion_substring() {
        let d = detector();
        let text = "The plan is written to PLAN.md.\n\n<lisa-phase>COMPLETE</lisa-phase>";
        assert_eq!(d.detect(text, Expected::PhaseCompletion), Some(Signal::PhaseComplete));
    }

    #[test]
    fn test_completion_is_case_sensitive() {
        let d = detector();
        assert_eq!(d.detect("<lisa-phase>complete</lisa-phase>", Expected::PhaseCompletion), None);
        assert_eq!(d.detect("<PROMISE>COMPLETE</PROMISE>", Expected::RalphCompletion), None);
    }

    #[test]
    fn test_tokens_are_not_interchangeable() {
        let d = detector();
        // Ralph token in a Lisa work phase is not a phase completion
        assert_eq!(d.detect("<promise>COMPLETE</promise>", Expected::PhaseCompletion), None);
        assert_eq!(d.detect("<lisa-phase>COMPLETE</lisa-phase>", Expected::RalphCompletion), None);
    }

    #[test]
    fn test_review_tokens_ignored_in_work_phase() {
        let d = detector();
        assert_eq!(
            d.detect("<lisa-review>APPROVED</lisa-review>", Expected::PhaseCompletion),
            None
        );
    }

    #[test]
    fn test_completion_ignored_in_review_phase() {
        let d = detector();
        assert_eq!(d.detect("<lisa-phase>COMPLETE</lisa-phase>", Expected::Review), None);
    }

    #[test]
    fn test_review_approved() {
        let d = detector();
        let text = "Looks good to me.\n<lisa-review>APPROVED</lisa-review>";
        assert_eq!(d.detect(text, Expected::Review), Some(Signal::ReviewApproved));
    }

    #[test]
    fn test_review_rejected_valid_targets() {
        let d = detector();
        assert_eq!(
            d.detect("<lisa-review>REJECT:plan</lisa-review>", Expected::Review),
            Some(Signal::ReviewRejected(Phase::Plan))
        );
        assert_eq!(
            d.detect("<lisa-review>REJECT:execute</lisa-review>", Expected::Review),
            Some(Signal::ReviewRejected(Phase::Execute))
        );
        assert_eq!(
            d.detect("<lisa-review>REJECT:validate</lisa-review>", Expected::Review),
            Some(Signal::ReviewRejected(Phase::Validate))
        );
    }

    #[test]
    fn test_review_rejected_invalid_target_is_not_a_signal() {
        let d = detector();
        assert_eq!(d.detect("<lisa-review>REJECT:plan-review</lisa-review>", Expected::Review), None);
        assert_eq!(d.detect("<lisa-review>REJECT:nonsense</lisa-review>", Expected::Review), None);
        assert_eq!(d.detect("<lisa-review>REJECT:</lisa-review>", Expected::Review), None);
    }

    #[test]
    fn test_unterminated_reject_is_not_a_signal() {
        let d = detector();
        assert_eq!(d.detect("<lisa-review>REJECT:plan", Expected::Review), None);
    }

    #[test]
    fn test_reject_takes_precedence_over_approved() {
        let d = detector();
        let hedging = "I approve most of this. <lisa-review>APPROVED</lisa-review>\n\
                       Actually one issue remains: <lisa-review>REJECT:execute</lisa-review>";
        assert_eq!(
            d.detect(hedging, Expected::Review),
            Some(Signal::ReviewRejected(Phase::Execute))
        );
    }

    #[test]
    fn test_invalid_reject_falls_through_to_later_valid_reject() {
        let d = detector();
        let text = "<lisa-review>REJECT:bogus</lisa-review> then <lisa-review>REJECT:plan</lisa-review>";
        assert_eq!(
            d.detect(text, Expected::Review),
            Some(Signal::ReviewRejected(Phase::Plan))
        );
    }

    #[test]
    fn test_invalid_reject_does_not_mask_approval() {
        let d = detector();
        let text = "<lisa-review>REJECT:bogus</lisa-review>\n<lisa-review>APPROVED</lisa-review>";
        assert_eq!(d.detect(text, Expected::Review), Some(Signal::ReviewApproved));
    }

    #[test]
    fn test_no_signal_in_plain_prose() {
        let d = detector();
        let text = "Still working through the failing integration tests.";
        assert_eq!(d.detect(text, Expected::RalphCompletion), None);
        assert_eq!(d.detect(text, Expected::PhaseCompletion), None);
        assert_eq!(d.detect(text, Expected::Review), None);
    }

    #[test]
    fn test_detection_is_idempotent() {
        let d = detector();
        let text = "Done. <lisa-review>REJECT:plan</lisa-review>";
        let first = d.detect(text, Expected::Review);
        let second = d.detect(text, Expected::Review);
        assert_eq!(first, second);
    }

    #[test]
    fn test_custom_tokens() {
        let tokens = SignalTokens {
            ralph_complete: "[[DONE]]".to_string(),
            ..Default::default()
        };
        let d = SignalDetector::new(tokens);
        assert_eq!(d.detect("all finished [[DONE]]", Expected::RalphCompletion), Some(Signal::PhaseComplete));
        assert_eq!(d.detect("<promise>COMPLETE</promise>", Expected::RalphCompletion), None);
    }
}
