//! Lisa workflow state.
//!
//! Tracks the current phase, a per-phase visit counter, and an append-only
//! history of every phase entry. The two views are updated together in
//! `record_visit`, the only mutation point, so the invariant
//! `phase_visit_counts[p] == history entries for p` holds at all times.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::id::{generate_loop_id, now_ms};

use super::phase::Phase;
use super::status::HaltStatus;

/// Behavior knobs for a Lisa loop, fixed at start time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LisaOptions {
    /// Folder the agent is told to collect validation evidence into
    pub evidence_folder: Option<PathBuf>,

    /// Optional global cap on total phase visits. Lisa has no per-phase
    /// bound; review gates and the user are the normal stop conditions, so
    /// this is off by default.
    pub max_total_visits: Option<u32>,
}

/// One entry in the append-only phase history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseVisit {
    /// The phase that was entered
    pub phase: Phase,

    /// Which visit to that phase this was (1-indexed)
    pub visit_index: u32,

    /// When the phase was entered (Unix ms)
    pub timestamp: i64,
}

/// Durable state of one Lisa workflow instance.
///
/// Mutated only by the loop driver; persisted on every mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LisaState {
    /// Unique loop identifier
    pub id: String,

    /// Session this loop is attached to
    pub session_id: String,

    /// The task as the user stated it
    pub original_prompt: String,

    /// Phase the workflow is currently in
    pub current_phase: Phase,

    /// Visit count per phase; all six keys are always present
    pub phase_visit_counts: BTreeMap<Phase, u32>,

    /// False once the loop has halted for any reason
    pub active: bool,

    /// Folder the agent collects validation evidence into
    pub evidence_folder: Option<PathBuf>,

    /// Append-only log of every phase entry; entries are never mutated
    pub phase_history: Vec<PhaseVisit>,

    /// Optional global safety cap on total visits
    pub max_total_visits: Option<u32>,

    /// When the loop was started (Unix ms)
    pub started_at: i64,

    /// Terminal status, set when the loop halts
    pub halted: Option<HaltStatus>,

    /// When the loop halted (Unix ms)
    pub halted_at: Option<i64>,

    /// Human-readable markdown log, appended every turn
    pub progress_file: PathBuf,

    /// Structured snapshot, rewritten atomically every transition
    pub state_file: PathBuf,
}

impl LisaState {
    /// Create a new Lisa workflow for a session, entering Plan.
    ///
    /// Entering Plan at start is the first recorded visit, so a clean run
    /// with no rejections visits each phase exactly once.
    pub fn new(
        session_id: impl Into<String>,
        prompt: impl Into<String>,
        options: &LisaOptions,
        state_file: PathBuf,
        progress_file: PathBuf,
    ) -> Self {
        let session_id = session_id.into();
        let mut counts = BTreeMap::new();
        for phase in Phase::ALL {
            counts.insert(phase, 0);
        }

        let mut state = Self {
            id: generate_loop_id(&session_id),
            session_id,
            original_prompt: prompt.into(),
            current_phase: Phase::Plan,
            phase_visit_counts: counts,
            active: true,
            evidence_folder: options.evidence_folder.clone(),
            phase_history: Vec::new(),
            max_total_visits: options.max_total_visits,
            started_at: now_ms(),
            halted: None,
            halted_at: None,
            progress_file,
            state_file,
        };
        state.record_visit(Phase::Plan);
        state
    }

    /// Enter `phase`: set it current, increment its counter, and append one
    /// history entry carrying the new visit index. This is the only place
    /// either side of the counter/history invariant is touched.
    pub fn record_visit(&mut self, phase: Phase) -> u32 {
        self.current_phase = phase;
        let count = self.phase_visit_counts.entry(phase).or_insert(0);
        *count += 1;
        let visit_index = *count;
        self.phase_history.push(PhaseVisit {
            phase,
            visit_index,
            timestamp: now_ms(),
        });
        visit_index
    }

    /// Visits recorded for a phase so far.
    pub fn visit_count(&self, phase: Phase) -> u32 {
        self.phase_visit_counts.get(&phase).copied().unwrap_or(0)
    }

    /// Total phase entries across the whole run.
    pub fn total_visits(&self) -> u32 {
        self.phase_history.len() as u32
    }

    /// Verify the counter/history invariant. Used by tests and when loading
    /// a snapshot from disk.
    pub fn counts_match_history(&self) -> bool {
        Phase::ALL.iter().all(|phase| {
            let from_history = self.phase_history.iter().filter(|v| v.phase == *phase).count() as u32;
            self.visit_count(*phase) == from_history
        })
    }

    /// Deactivate the loop with a terminal status.
    pub fn halt(&mut self, status: HaltStatus) {
        self.active = false;
        self.halted = Some(status);
        self.halted_at = Some(now_ms());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_state() -> LisaState {
        LisaState::new(
            "session-1",
            "Add OAuth authentication",
            &LisaOptions::default(),
            PathBuf::from("state.json"),
            PathBuf::from("progress.md"),
        )
    }

    #[test]
    fn test_new_lisa_state_enters_plan() {
        let state = new_state();

        assert_eq!(state.current_phase, Phase::Plan);
        assert!(state.active);
        assert_eq!(state.visit_count(Phase::Plan), 1);
        assert_eq!(state.phase_history.len(), 1);
        assert_eq!(state.phase_history[0].phase, Phase::Plan);
        assert_eq!(state.phase_history[0].visit_index, 1);
    }

    #[test]
    fn test_all_six_counter_keys_present_from_start() {
        let state = new_state();
        for phase in Phase::ALL {
            assert!(state.phase_visit_counts.contains_key(&phase));
        }
        assert_eq!(state.visit_count(Phase::FinalReview), 0);
    }

    #[test]
    fn test_record_visit_increments_and_appends() {
        let mut state = new_state();

        let index = state.record_visit(Phase::PlanReview);
        assert_eq!(index, 1);
        assert_eq!(state.current_phase, Phase::PlanReview);
        assert_eq!(state.visit_count(Phase::PlanReview), 1);
        assert_eq!(state.phase_history.len(), 2);

        // Rejection back to Plan: second visit
        let index = state.record_visit(Phase::Plan);
        assert_eq!(index, 2);
        assert_eq!(state.visit_count(Phase::Plan), 2);
        assert_eq!(state.phase_history.len(), 3);
        assert_eq!(state.phase_history[2].visit_index, 2);
    }

    #[test]
    fn test_counts_match_history_invariant() {
        let mut state = new_state();
        assert!(state.counts_match_history());

        for phase in [
            Phase::PlanReview,
            Phase::Plan,
            Phase::PlanReview,
            Phase::Execute,
            Phase::CodeReview,
            Phase::Execute,
        ] {
            state.record_visit(phase);
            assert!(state.counts_match_history());
        }

        assert_eq!(state.visit_count(Phase::Plan), 2);
        assert_eq!(state.visit_count(Phase::PlanReview), 2);
        assert_eq!(state.visit_count(Phase::Execute), 2);
        assert_eq!(state.total_visits(), 7);
    }

    #[test]
    fn test_history_is_append_only_across_visits() {
        let mut state = new_state();
        state.record_visit(Phase::PlanReview);
        let before = state.phase_history.clone();

        state.record_visit(Phase::Execute);

        // Prior entries are untouched, exactly one appended
        assert_eq!(&state.phase_history[..before.len()], &before[..]);
        assert_eq!(state.phase_history.len(), before.len() + 1);
    }

    #[test]
    fn test_halt_deactivates() {
        let mut state = new_state();
        state.halt(HaltStatus::Aborted);

        assert!(!state.active);
        assert_eq!(state.halted, Some(HaltStatus::Aborted));
        assert!(state.halted_at.is_some());
    }

    #[test]
    fn test_serialization_roundtrip() {
        let mut state = new_state();
        state.record_visit(Phase::PlanReview);
        state.record_visit(Phase::Execute);

        let json = serde_json::to_string(&state).expect("serialize");
        let restored: LisaState = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(restored.id, state.id);
        assert_eq!(restored.current_phase, Phase::Execute);
        assert_eq!(restored.phase_visit_counts, state.phase_visit_counts);
        assert_eq!(restored.phase_history, state.phase_history);
        assert!(restored.counts_match_history());
    }

    #[test]
    fn test_counter_keys_serialize_as_phase_names() {
        let state = new_state();
        let json = serde_json::to_value(&state).expect("serialize");
        let counts = json.get("phase_visit_counts").expect("counts present");

        assert_eq!(counts["plan"], 1);
        assert_eq!(counts["plan_review"], 0);
        assert_eq!(counts["final_review"], 0);
    }
}
