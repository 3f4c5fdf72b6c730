//! Lisa workflow phases.
//!
//! Six phases in fixed forward order. Work phases produce deliverables;
//! review phases gate them and may send control back to an earlier work
//! phase.

use serde::{Deserialize, Serialize};

/// A phase of the Lisa workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Plan,
    PlanReview,
    Execute,
    CodeReview,
    Validate,
    FinalReview,
}

impl Phase {
    /// All phases in forward order.
    pub const ALL: [Phase; 6] = [
        Phase::Plan,
        Phase::PlanReview,
        Phase::Execute,
        Phase::CodeReview,
        Phase::Validate,
        Phase::FinalReview,
    ];

    /// Review phases gate the output of the preceding work phase.
    pub fn is_review(&self) -> bool {
        matches!(self, Phase::PlanReview | Phase::CodeReview | Phase::FinalReview)
    }

    /// Work phases produce deliverables (plan, code, validation evidence).
    pub fn is_work(&self) -> bool {
        !self.is_review()
    }

    /// The next phase in the forward table, or None after FinalReview.
    pub fn next(&self) -> Option<Phase> {
        match self {
            Phase::Plan => Some(Phase::PlanReview),
            Phase::PlanReview => Some(Phase::Execute),
            Phase::Execute => Some(Phase::CodeReview),
            Phase::CodeReview => Some(Phase::Validate),
            Phase::Validate => Some(Phase::FinalReview),
            Phase::FinalReview => None,
        }
    }

    /// Work phases this review phase may send control back to.
    /// Empty for work phases.
    pub fn reject_targets(&self) -> &'static [Phase] {
        match self {
            Phase::PlanReview => &[Phase::Plan],
            Phase::CodeReview => &[Phase::Plan, Phase::Execute],
            Phase::FinalReview => &[Phase::Plan, Phase::Execute, Phase::Validate],
            _ => &[],
        }
    }

    /// Whether a rejection from this phase to `target` is in the backward table.
    pub fn allows_reject_to(&self, target: Phase) -> bool {
        self.reject_targets().contains(&target)
    }

    /// Parse a reject-target literal from agent output.
    ///
    /// Only the three work phases are valid targets; review phase names and
    /// unknown tokens are rejected.
    pub fn parse_reject_target(token: &str) -> Option<Phase> {
        match token {
            "plan" => Some(Phase::Plan),
            "execute" => Some(Phase::Execute),
            "validate" => Some(Phase::Validate),
            _ => None,
        }
    }

    /// Stable lowercase name, matching the state-file representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Plan => "plan",
            Phase::PlanReview => "plan_review",
            Phase::Execute => "execute",
            Phase::CodeReview => "code_review",
            Phase::Validate => "validate",
            Phase::FinalReview => "final_review",
        }
    }

    /// Human-readable name for prompts and progress logs.
    pub fn display_name(&self) -> &'static str {
        match self {
            Phase::Plan => "Plan",
            Phase::PlanReview => "Plan Review",
            Phase::Execute => "Execute",
            Phase::CodeReview => "Code Review",
            Phase::Validate => "Validate",
            Phase::FinalReview => "Final Review",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.display_name())
    }
}
