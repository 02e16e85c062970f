// src/cli/refine.rs — `agentlab refine`: polish a draft with the critic/refiner loop

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;

use crate::agent::{LlmAgent, PromptCritic, PromptReviser};
use crate::provider::ModelProvider;
use crate::refine::{RefineError, RefinementLoop};

/// Refine the draft at `input` (or stdin) and print the result to stdout.
pub async fn run_refine(
    input: Option<&Path>,
    rounds: i64,
    provider: Arc<dyn ModelProvider>,
    model: &str,
    quiet: bool,
) -> anyhow::Result<()> {
    let draft = read_draft(input)?;

    let agent = LlmAgent::new(provider, model);
    let critic = PromptCritic::new(agent.clone());
    let reviser = PromptReviser::new(agent);

    let mut refinement = RefinementLoop::new(rounds);
    if !quiet {
        refinement = refinement.with_progress(super::progress::terminal_refine_progress());
    }

    match refinement.run(draft, &critic, &reviser).await {
        Ok(outcome) => {
            println!("{}", outcome.draft);
            if !quiet && !outcome.is_verified() {
                eprintln!("  note: round budget exhausted; the last revision was not re-reviewed");
            }
            Ok(())
        }
        Err(e @ RefineError::Capability { .. }) => {
            // Keep the last good draft on stdout so the work is not lost
            if let Some(state) = e.state() {
                if state.round_index > 0 {
                    println!("{}", state.draft);
                }
            }
            Err(e.into())
        }
        Err(e) => Err(e.into()),
    }
}

fn read_draft(input: Option<&Path>) -> anyhow::Result<String> {
    let draft = match input {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("reading draft {}", path.display()))?,
        None => {
            use std::io::Read;
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };
    if draft.trim().is_empty() {
        anyhow::bail!("draft is empty");
    }
    Ok(draft.trim_end().to_string())
}
