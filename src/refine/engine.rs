// src/refine/engine.rs — Bounded critic/reviser loop

use async_trait::async_trait;

use super::types::*;

/// Produces a critique for the current draft. Must not mutate the draft.
#[async_trait]
pub trait Critic<D: Send + Sync>: Send + Sync {
    async fn critique(&self, draft: &D) -> anyhow::Result<Critique>;
}

/// Produces a new draft from the current one and a non-approving critique.
#[async_trait]
pub trait Reviser<D: Send + Sync>: Send + Sync {
    async fn revise(&self, draft: &D, suggestions: &[String]) -> anyhow::Result<D>;
}

/// Drives up to `max_rounds` rounds of critique then revise.
///
/// Each round asks the critic first. Approval ends the run with the draft the
/// critic just saw; otherwise the reviser produces the next draft and the round
/// counts against the budget. When the budget runs out the last revised draft
/// is returned unreviewed with [`TerminationReason::MaxRounds`].
///
/// The loop never retries: a failing capability ends the run and the error
/// carries the state of the last completed round.
pub struct RefinementLoop {
    max_rounds: i64,
    on_progress: Option<Box<dyn Fn(RefineEvent) + Send + Sync>>,
}

impl RefinementLoop {
    pub fn new(max_rounds: i64) -> Self {
        Self {
            max_rounds,
            on_progress: None,
        }
    }

    /// Set a callback for per-round progress events.
    pub fn with_progress(mut self, cb: impl Fn(RefineEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Box::new(cb));
        self
    }

    fn emit(&self, event: RefineEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    fn validated_budget<D>(&self) -> Result<u32, RefineError<D>> {
        u32::try_from(self.max_rounds)
            .ok()
            .filter(|n| *n >= 1)
            .ok_or(RefineError::InvalidRounds {
                max_rounds: self.max_rounds,
            })
    }

    pub async fn run<D, C, R>(
        &self,
        initial: D,
        critic: &C,
        reviser: &R,
    ) -> Result<RefineOutcome<D>, RefineError<D>>
    where
        D: Send + Sync,
        C: Critic<D> + ?Sized,
        R: Reviser<D> + ?Sized,
    {
        let max_rounds = self.validated_budget::<D>()?;
        let mut state = LoopState::new(initial);
        let mut critiques = 0u32;

        while state.round_index < max_rounds {
            let round = state.round_index + 1;
            self.emit(RefineEvent::RoundStart { round, max_rounds });

            let result = critic.critique(&state.draft).await;
            let critique = match result {
                Ok(Critique::Revise(s)) if s.is_empty() => {
                    return Err(failure(
                        Stage::Critique,
                        state,
                        anyhow::anyhow!("critic returned neither approval nor suggestions"),
                    ));
                }
                Ok(c) => c,
                Err(e) => return Err(failure(Stage::Critique, state, e)),
            };
            critiques += 1;

            self.emit(RefineEvent::Critiqued {
                round,
                approved: critique.is_approved(),
                suggestions: critique.suggestions().len(),
            });

            let suggestions = match critique {
                Critique::Approved => {
                    state.approve();
                    tracing::info!(round, revisions = state.round_index, "Draft approved");
                    return Ok(self.finish(state, TerminationReason::Approved, critiques));
                }
                Critique::Revise(s) => s,
            };

            tracing::debug!(round, suggestions = suggestions.len(), "Revising draft");
            let result = reviser.revise(&state.draft, &suggestions).await;
            match result {
                Ok(revised) => {
                    state.record_revision(Critique::Revise(suggestions), revised);
                    self.emit(RefineEvent::Revised { round });
                }
                Err(e) => {
                    state.last_critique = Some(Critique::Revise(suggestions));
                    return Err(failure(Stage::Revise, state, e));
                }
            }
        }

        tracing::info!(
            revisions = state.round_index,
            "Round budget exhausted without approval",
        );
        Ok(self.finish(state, TerminationReason::MaxRounds, critiques))
    }

    fn finish<D>(
        &self,
        mut state: LoopState<D>,
        reason: TerminationReason,
        critiques: u32,
    ) -> RefineOutcome<D> {
        if !state.terminated {
            state.terminate(reason);
        }
        self.emit(RefineEvent::Complete {
            reason,
            revisions: state.round_index,
        });
        RefineOutcome {
            draft: state.draft,
            reason,
            revisions: state.round_index,
            critiques,
        }
    }
}

fn failure<D>(stage: Stage, state: LoopState<D>, cause: anyhow::Error) -> RefineError<D> {
    let round = state.round_index + 1;
    tracing::warn!(%stage, round, "Refinement aborted: {:#}", cause);
    RefineError::Capability {
        stage,
        round,
        state: Box::new(state),
        cause,
    }
}
