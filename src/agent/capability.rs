// src/agent/capability.rs — LLM agents as refinement-loop critic and reviser

use anyhow::Context;
use async_trait::async_trait;

use super::runner::LlmAgent;
use super::spec::{AgentSpec, SessionState};
use crate::refine::{parse_critique, render_suggestions, Critic, Critique, Reviser};

/// State key the built-in digest prompts read the draft from.
pub const DIGEST_DRAFT_KEY: &str = "current_summary";
/// State key the built-in refiner prompt reads the critique from.
pub const DIGEST_CRITIQUE_KEY: &str = "critique";

const DIGEST_CRITIC_INSTRUCTION: &str = r#"Review the draft below and improve its usefulness and clarity.
Draft:
{{ current_summary }}

Rules:
- If the draft is already excellent and complete, respond EXACTLY with: APPROVED
- Otherwise, provide 2-4 SPECIFIC, actionable suggestions as a bulleted list, and
  up to 3 clarifying questions, to make it tighter, more accurate, or more useful
  (clearer links, tighter TL;DRs, no fluff, consistent structure).

Output ONLY the critique or the single token APPROVED."#;

const DIGEST_REFINER_INSTRUCTION: &str = r#"You have:
Draft:
{{ current_summary }}

Critique:
{{ critique }}

Revise the draft to fully address every suggestion and question:
* tighten wording, remove fluff
* keep a consistent structure throughout
* add or clarify links only if they are already present (do not invent)
* keep Markdown, no greetings, no meta commentary

Output ONLY the revised draft."#;

/// A critic agent driven through the loop's [`Critic`] seam.
///
/// The agent sees `context` plus the draft under `draft_key`; its reply is
/// parsed with [`parse_critique`].
pub struct AgentCritic {
    agent: LlmAgent,
    spec: AgentSpec,
    draft_key: String,
    context: SessionState,
}

impl AgentCritic {
    pub fn new(agent: LlmAgent, spec: AgentSpec, draft_key: impl Into<String>) -> Self {
        Self {
            agent,
            spec,
            draft_key: draft_key.into(),
            context: SessionState::new(),
        }
    }

    /// Session values visible to the critic's instruction besides the draft.
    pub fn with_context(mut self, context: SessionState) -> Self {
        self.context = context;
        self
    }
}

#[async_trait]
impl Critic<String> for AgentCritic {
    async fn critique(&self, draft: &String) -> anyhow::Result<Critique> {
        let mut state = self.context.clone();
        state.insert(self.draft_key.clone(), draft.clone());

        let reply = self.agent.reply(&self.spec, &state).await?;
        parse_critique(&reply).with_context(|| format!("critic '{}'", self.spec.name))
    }
}

/// A refiner agent driven through the loop's [`Reviser`] seam.
///
/// Suggestions reach the instruction as a bulleted list under `critique_key`.
pub struct AgentReviser {
    agent: LlmAgent,
    spec: AgentSpec,
    draft_key: String,
    critique_key: String,
    context: SessionState,
}

impl AgentReviser {
    pub fn new(
        agent: LlmAgent,
        spec: AgentSpec,
        draft_key: impl Into<String>,
        critique_key: impl Into<String>,
    ) -> Self {
        Self {
            agent,
            spec,
            draft_key: draft_key.into(),
            critique_key: critique_key.into(),
            context: SessionState::new(),
        }
    }

    pub fn with_context(mut self, context: SessionState) -> Self {
        self.context = context;
        self
    }
}

#[async_trait]
impl Reviser<String> for AgentReviser {
    async fn revise(&self, draft: &String, suggestions: &[String]) -> anyhow::Result<String> {
        let mut state = self.context.clone();
        state.insert(self.draft_key.clone(), draft.clone());
        state.insert(self.critique_key.clone(), render_suggestions(suggestions));

        let revised = self.agent.reply(&self.spec, &state).await?;
        if revised.is_empty() {
            anyhow::bail!("refiner '{}' returned an empty draft", self.spec.name);
        }
        Ok(revised)
    }
}

/// Standalone critic with the built-in draft-review instruction.
pub struct PromptCritic(AgentCritic);

impl PromptCritic {
    pub fn new(agent: LlmAgent) -> Self {
        let spec = AgentSpec::new("critic_agent", DIGEST_CRITIC_INSTRUCTION)
            .with_output_key(DIGEST_CRITIQUE_KEY);
        Self(AgentCritic::new(agent, spec, DIGEST_DRAFT_KEY))
    }
}

#[async_trait]
impl Critic<String> for PromptCritic {
    async fn critique(&self, draft: &String) -> anyhow::Result<Critique> {
        self.0.critique(draft).await
    }
}

/// Standalone reviser with the built-in draft-revision instruction.
pub struct PromptReviser(AgentReviser);

impl PromptReviser {
    pub fn new(agent: LlmAgent) -> Self {
        let spec = AgentSpec::new("refiner_agent", DIGEST_REFINER_INSTRUCTION)
            .with_output_key(DIGEST_DRAFT_KEY);
        Self(AgentReviser::new(
            agent,
            spec,
            DIGEST_DRAFT_KEY,
            DIGEST_CRITIQUE_KEY,
        ))
    }
}

#[async_trait]
impl Reviser<String> for PromptReviser {
    async fn revise(&self, draft: &String, suggestions: &[String]) -> anyhow::Result<String> {
        self.0.revise(draft, suggestions).await
    }
}
