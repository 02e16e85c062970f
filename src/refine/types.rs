// src/refine/types.rs — Refinement loop domain types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A critic's verdict on one draft.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Critique {
    /// The draft is final; no revision runs this round.
    Approved,
    /// Ordered, actionable suggestions. Never empty once accepted by the loop.
    Revise(Vec<String>),
}

impl Critique {
    pub fn is_approved(&self) -> bool {
        matches!(self, Critique::Approved)
    }

    pub fn suggestions(&self) -> &[String] {
        match self {
            Critique::Approved => &[],
            Critique::Revise(s) => s,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TerminationReason {
    Approved,
    MaxRounds,
}

impl std::fmt::Display for TerminationReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TerminationReason::Approved => write!(f, "approved"),
            TerminationReason::MaxRounds => write!(f, "max_rounds"),
        }
    }
}

/// Mutable state of one loop run. Owned by the loop until it returns.
#[derive(Debug, Clone, PartialEq)]
pub struct LoopState<D> {
    /// Completed revise rounds.
    pub round_index: u32,
    pub draft: D,
    pub last_critique: Option<Critique>,
    pub terminated: bool,
    pub termination_reason: Option<TerminationReason>,
}

impl<D> LoopState<D> {
    pub fn new(draft: D) -> Self {
        Self {
            round_index: 0,
            draft,
            last_critique: None,
            terminated: false,
            termination_reason: None,
        }
    }

    /// Record a finished round: the critique that drove it and the revised draft.
    pub(crate) fn record_revision(&mut self, critique: Critique, revised: D) {
        debug_assert!(!self.terminated);
        self.last_critique = Some(critique);
        self.draft = revised;
        self.round_index += 1;
    }

    pub(crate) fn approve(&mut self) {
        self.last_critique = Some(Critique::Approved);
        self.terminate(TerminationReason::Approved);
    }

    pub(crate) fn terminate(&mut self, reason: TerminationReason) {
        self.terminated = true;
        self.termination_reason = Some(reason);
    }
}

/// Successful result of a loop run.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome<D> {
    pub draft: D,
    pub reason: TerminationReason,
    /// Revise calls made; equals completed rounds.
    pub revisions: u32,
    /// Critique calls made, including an approving one.
    pub critiques: u32,
}

impl<D> RefineOutcome<D> {
    /// `MaxRounds` outcomes carry a draft nobody reviewed after its last revision.
    pub fn is_verified(&self) -> bool {
        self.reason == TerminationReason::Approved
    }
}

/// Which capability failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Critique,
    Revise,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Critique => write!(f, "critique"),
            Stage::Revise => write!(f, "revise"),
        }
    }
}

#[derive(Error, Debug)]
pub enum RefineError<D> {
    #[error("max_rounds must be at least 1 (got {max_rounds})")]
    InvalidRounds { max_rounds: i64 },

    /// A capability call failed; `state` is the last consistent state.
    #[error("{stage} failed in round {round}: {cause:#}")]
    Capability {
        stage: Stage,
        round: u32,
        state: Box<LoopState<D>>,
        cause: anyhow::Error,
    },
}

impl<D> RefineError<D> {
    /// Partial loop state, when the failure happened mid-run.
    pub fn state(&self) -> Option<&LoopState<D>> {
        match self {
            RefineError::InvalidRounds { .. } => None,
            RefineError::Capability { state, .. } => Some(state),
        }
    }
}

/// Progress notifications for callers that render loop activity.
#[derive(Debug, Clone, PartialEq)]
pub enum RefineEvent {
    RoundStart {
        round: u32,
        max_rounds: u32,
    },
    Critiqued {
        round: u32,
        approved: bool,
        suggestions: usize,
    },
    Revised {
        round: u32,
    },
    Complete {
        reason: TerminationReason,
        revisions: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loop_state_new() {
        let s = LoopState::new("draft".to_string());
        assert_eq!(s.round_index, 0);
        assert!(!s.terminated);
        assert!(s.last_critique.is_none());
        assert!(s.termination_reason.is_none());
    }

    #[test]
    fn test_record_revision_advances_round() {
        let mut s = LoopState::new(1u32);
        s.record_revision(Critique::Revise(vec!["more".into()]), 2);
        assert_eq!(s.round_index, 1);
        assert_eq!(s.draft, 2);
        assert_eq!(s.last_critique.as_ref().map(|c| c.suggestions().len()), Some(1));
    }

    #[test]
    fn test_approve_sets_reason() {
        let mut s = LoopState::new(());
        s.approve();
        assert!(s.terminated);
        assert_eq!(s.last_critique, Some(Critique::Approved));
        assert_eq!(s.termination_reason, Some(TerminationReason::Approved));
    }

    #[test]
    fn test_critique_helpers() {
        assert!(Critique::Approved.is_approved());
        assert!(Critique::Approved.suggestions().is_empty());
        let c = Critique::Revise(vec!["a".into(), "b".into()]);
        assert!(!c.is_approved());
        assert_eq!(c.suggestions(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_termination_reason_display_and_serde() {
        assert_eq!(TerminationReason::Approved.to_string(), "approved");
        assert_eq!(TerminationReason::MaxRounds.to_string(), "max_rounds");
        let json = serde_json::to_string(&TerminationReason::MaxRounds).unwrap();
        assert_eq!(json, "\"MAX_ROUNDS\"");
    }

    #[test]
    fn test_error_display() {
        let err: RefineError<String> = RefineError::InvalidRounds { max_rounds: 0 };
        assert_eq!(err.to_string(), "max_rounds must be at least 1 (got 0)");
        assert!(err.state().is_none());

        let err: RefineError<String> = RefineError::Capability {
            stage: Stage::Revise,
            round: 2,
            state: Box::new(LoopState::new("d".into())),
            cause: anyhow::anyhow!("timeout"),
        };
        assert_eq!(err.to_string(), "revise failed in round 2: timeout");
        assert_eq!(err.state().map(|s| s.draft.as_str()), Some("d"));
    }

    #[test]
    fn test_outcome_verified() {
        let o = RefineOutcome {
            draft: (),
            reason: TerminationReason::MaxRounds,
            revisions: 3,
            critiques: 3,
        };
        assert!(!o.is_verified());
    }
}
