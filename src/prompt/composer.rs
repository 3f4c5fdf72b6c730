//! Prompt composition for loop turns.
//!
//! Every prompt is assembled in a fixed section order: header, reviewer
//! feedback, original task, prior-response excerpt, phase instructions.
//! The exact required output signal is quoted from the injected token set so
//! prompts and detection can never drift apart.

use crate::domain::{LisaState, Phase, RalphState};
use crate::protocol::SignalTokens;

use super::excerpt::EXCERPT_CAP;

/// Fixed policy carried on every Lisa prompt: the controller owns the
/// repository state until the loop halts.
const SAFETY_BANNER: &str = "IMPORTANT: do not run `git commit`, `git push`, or any other \
version-control write operation during this workflow. The controller decides when work is \
committed, after the loop has halted.";

/// Builds the next instruction text for the agent.
#[derive(Debug, Clone, Default)]
pub struct PromptComposer {
    tokens: SignalTokens,
}

impl PromptComposer {
    /// Create a composer over the given token set.
    pub fn new(tokens: SignalTokens) -> Self {
        Self { tokens }
    }

    /// Compose the prompt for the next Ralph iteration.
    pub fn compose_ralph(&self, state: &RalphState, last_excerpt: Option<&str>) -> String {
        let attempt = state.current_iteration + 1;
        let mut out = String::new();

        // header
        out.push_str(&format!(
            "# Autonomous work session - iteration {} of {}\n\n",
            attempt, state.max_iterations
        ));
        if attempt > 1 {
            out.push_str(&format!(
                "[revisit] This is attempt {} at the same task. Review the excerpt of your \
                 previous output below, work out what remains, and finish it.\n\n",
                attempt
            ));
        }

        // original task
        out.push_str("## Task\n\n");
        out.push_str(&state.original_prompt);
        out.push_str("\n\n");

        // prior-response excerpt
        push_excerpt_section(&mut out, last_excerpt);

        // instructions
        out.push_str("## Instructions\n\n");
        out.push_str(
            "Work on the task directly in the workspace. Make real progress this iteration; \
             do not restate the plan.\n\n",
        );
        if state.require_evidence {
            out.push_str(
                "Collect proof of the finished behavior (test output, screenshots, logs) under \
                 the `evidence/` folder of the workspace. A completion claim without evidence \
                 on disk will not be accepted.\n\n",
            );
        }
        out.push_str(&format!(
            "When, and only when, the task is fully done, output the literal token \
             `{}` on its own line. If work remains, stop after meaningful progress and do not \
             emit the token.\n",
            self.tokens.ralph_complete
        ));

        out
    }

    /// Compose the prompt for the current Lisa phase.
    pub fn compose_lisa(
        &self,
        state: &LisaState,
        last_excerpt: Option<&str>,
        reviewer_feedback: Option<&str>,
    ) -> String {
        let phase = state.current_phase;
        let visit = state.visit_count(phase);
        let mut out = String::new();

        // header
        out.push_str(&format!("# Lisa workflow - {} phase (visit {})\n\n", phase, visit));
        out.push_str(SAFETY_BANNER);
        out.push_str("\n\n");
        if visit > 1 {
            out.push_str(&format!(
                "[revisit] This is visit {} to the {} phase; your earlier attempt did not pass. \
                 Do not repeat it verbatim.\n\n",
                visit, phase
            ));
        }

        // reviewer feedback
        if let Some(feedback) = reviewer_feedback {
            out.push_str("## Reviewer feedback\n\n");
            out.push_str("<<<\n");
            out.push_str(feedback);
            out.push_str("\n>>>\n\n");
            out.push_str("Address every point of the feedback above specifically before doing anything else.\n\n");
        }

        // original task
        out.push_str("## Original task\n\n");
        out.push_str(&state.original_prompt);
        out.push_str("\n\n");

        // prior-response excerpt
        push_excerpt_section(&mut out, last_excerpt);

        // phase instructions
        out.push_str(&self.phase_instructions(phase, state));

        out
    }

    fn phase_instructions(&self, phase: Phase, state: &LisaState) -> String {
        let mut out = String::new();
        out.push_str(&format!("## {} phase\n\n", phase));

        match phase {
            Phase::Plan => {
                out.push_str(
                    "You are the planner. Break the task into a concrete, ordered implementation \
                     plan: which files change, what each step delivers, and how the result will \
                     be verified. Write the plan into the workspace so later phases can read it.\n\n",
                );
                out.push_str(&self.work_signal_footer());
            }
            Phase::Execute => {
                out.push_str(
                    "You are the implementer. Carry out the approved plan step by step, making \
                     the actual code changes in the workspace. Stay within the plan; if the plan \
                     turns out to be wrong, say so in your output instead of improvising.\n\n",
                );
                out.push_str(&self.work_signal_footer());
            }
            Phase::Validate => {
                out.push_str(
                    "You are the validator. Exercise the implemented changes: run the test \
                     suite, run the affected flows, and record what you observed.\n\n",
                );
                if let Some(folder) = &state.evidence_folder {
                    out.push_str(&format!(
                        "Save the proof of each check (command output, screenshots) under \
                         `{}`.\n\n",
                        folder.display()
                    ));
                }
                out.push_str(&self.work_signal_footer());
            }
            Phase::PlanReview | Phase::CodeReview | Phase::FinalReview => {
                let subject = match phase {
                    Phase::PlanReview => "the plan produced in the Plan phase",
                    Phase::CodeReview => "the changes produced in the Execute phase",
                    _ => "the whole delivery: plan, implementation, and validation evidence",
                };
                out.push_str(&format!(
                    "You are the reviewer. Critically examine {}. Look for gaps, regressions, \
                     and unverified claims; do not rubber-stamp.\n\n",
                    subject
                ));
                out.push_str(&self.review_signal_footer(phase));
            }
        }

        out
    }

    fn work_signal_footer(&self) -> String {
        format!(
            "When the phase deliverable is complete, end your output with the literal token \
             `{}`. Emit nothing resembling it otherwise.\n",
            self.tokens.phase_complete
        )
    }

    fn review_signal_footer(&self, phase: Phase) -> String {
        let targets = phase
            .reject_targets()
            .iter()
            .map(|t| format!("`{}`", self.tokens.reject_token(t.as_str())))
            .collect::<Vec<_>>()
            .join(" or ");
        format!(
            "End your output with exactly one verdict token: `{}` to approve, or {} to send \
             the work back to that phase. Any other verdict syntax is ignored.\n",
            self.tokens.review_approved, targets
        )
    }
}

fn push_excerpt_section(out: &mut String, last_excerpt: Option<&str>) {
    if let Some(text) = last_excerpt {
        out.push_str(&format!(
            "## Your previous output (first {} characters)\n\n",
            EXCERPT_CAP
        ));
        out.push_str(text);
        out.push_str("\n\n");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{LisaOptions, RalphOptions};
    use std::path::PathBuf;

    fn ralph_state() -> RalphState {
        RalphState::new(
            "s1",
            "Fix the login timeout bug",
            &RalphOptions::default(),
            PathBuf::from("state.json"),
            PathBuf::from("progress.md"),
        )
    }

    fn lisa_state() -> LisaState {
        LisaState::new(
            "s1",
            "Add OAuth authentication",
            &LisaOptions::default(),
            PathBuf::from("state.json"),
            PathBuf::from("progress.md"),
        )
    }

    #[test]
    fn test_ralph_first_iteration_has_no_revisit_marker() {
        let composer = PromptComposer::default();
        let prompt = composer.compose_ralph(&ralph_state(), None);

        assert!(prompt.contains("iteration 1 of 10"));
        assert!(!prompt.contains("[revisit]"));
        assert!(prompt.contains("Fix the login timeout bug"));
        assert!(prompt.contains("<promise>COMPLETE</promise>"));
    }

    #[test]
    fn test_ralph_retry_has_revisit_marker_and_excerpt() {
        let composer = PromptComposer::default();
        let mut state = ralph_state();
        state.current_iteration = 2;

        let prompt = composer.compose_ralph(&state, Some("previous attempt output"));

        assert!(prompt.contains("iteration 3 of 10"));
        assert!(prompt.contains("[revisit]"));
        assert!(prompt.contains("previous attempt output"));
    }

    #[test]
    fn test_ralph_evidence_requirement_is_stated() {
        let composer = PromptComposer::default();
        let mut state = ralph_state();
        state.require_evidence = true;

        let prompt = composer.compose_ralph(&state, None);
        assert!(prompt.contains("evidence/"));

        state.require_evidence = false;
        let prompt = composer.compose_ralph(&state, None);
        assert!(!prompt.contains("evidence/"));
    }

    #[test]
    fn test_lisa_prompt_carries_safety_banner_in_every_phase() {
        let composer = PromptComposer::default();
        let mut state = lisa_state();

        for phase in Phase::ALL {
            state.record_visit(phase);
            let prompt = composer.compose_lisa(&state, None, None);
            assert!(prompt.contains("do not run `git commit`"), "missing banner in {}", phase);
        }
    }

    #[test]
    fn test_lisa_section_order_is_fixed() {
        let composer = PromptComposer::default();
        let mut state = lisa_state();
        state.record_visit(Phase::Plan); // visit 2, forces revisit marker

        let prompt = composer.compose_lisa(&state, Some("prior output"), Some("reviewer notes"));

        let header = prompt.find("# Lisa workflow").unwrap();
        let feedback = prompt.find("## Reviewer feedback").unwrap();
        let task = prompt.find("## Original task").unwrap();
        let prior = prompt.find("## Your previous output").unwrap();
        let instructions = prompt.find("## Plan phase").unwrap();

        assert!(header < feedback);
        assert!(feedback < task);
        assert!(task < prior);
        assert!(prior < instructions);
    }

    #[test]
    fn test_lisa_revisit_marker_only_after_first_visit() {
        let composer = PromptComposer::default();
        let mut state = lisa_state();

        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("(visit 1)"));
        assert!(!prompt.contains("[revisit]"));

        state.record_visit(Phase::Plan);
        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("(visit 2)"));
        assert!(prompt.contains("[revisit]"));
    }

    #[test]
    fn test_lisa_feedback_section_is_delimited() {
        let composer = PromptComposer::default();
        let state = lisa_state();

        let prompt = composer.compose_lisa(&state, None, Some("the plan skips migrations"));
        assert!(prompt.contains("<<<\nthe plan skips migrations\n>>>"));
        assert!(prompt.contains("Address every point"));

        let prompt = composer.compose_lisa(&state, None, None);
        assert!(!prompt.contains("## Reviewer feedback"));
    }

    #[test]
    fn test_work_phase_names_exact_completion_token() {
        let composer = PromptComposer::default();
        let state = lisa_state();

        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("<lisa-phase>COMPLETE</lisa-phase>"));
        assert!(!prompt.contains("<lisa-review>"));
    }

    #[test]
    fn test_review_phase_lists_allowed_reject_targets() {
        let composer = PromptComposer::default();
        let mut state = lisa_state();

        state.record_visit(Phase::PlanReview);
        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("<lisa-review>APPROVED</lisa-review>"));
        assert!(prompt.contains("<lisa-review>REJECT:plan</lisa-review>"));
        assert!(!prompt.contains("REJECT:execute"));

        state.record_visit(Phase::FinalReview);
        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("<lisa-review>REJECT:plan</lisa-review>"));
        assert!(prompt.contains("<lisa-review>REJECT:execute</lisa-review>"));
        assert!(prompt.contains("<lisa-review>REJECT:validate</lisa-review>"));
    }

    #[test]
    fn test_validate_phase_mentions_evidence_folder_when_set() {
        let composer = PromptComposer::default();
        let options = LisaOptions {
            evidence_folder: Some(PathBuf::from("artifacts/run-7")),
            ..Default::default()
        };
        let mut state = LisaState::new(
            "s1",
            "task",
            &options,
            PathBuf::from("state.json"),
            PathBuf::from("progress.md"),
        );
        state.record_visit(Phase::Validate);

        let prompt = composer.compose_lisa(&state, None, None);
        assert!(prompt.contains("artifacts/run-7"));
    }

    #[test]
    fn test_custom_tokens_flow_into_prompts() {
        let tokens = SignalTokens {
            phase_complete: "[[PHASE-DONE]]".to_string(),
            ..Default::default()
        };
        let composer = PromptComposer::new(tokens);
        let prompt = composer.compose_lisa(&lisa_state(), None, None);

        assert!(prompt.contains("[[PHASE-DONE]]"));
        assert!(!prompt.contains("<lisa-phase>"));
    }
}
