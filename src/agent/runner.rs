// src/agent/runner.rs — Single LLM agent execution

use std::sync::Arc;

use super::spec::{AgentSpec, SessionState};
use super::template::render_instruction;
use crate::infra::errors::AgentLabError;
use crate::provider::{ChatRequest, Message, ModelProvider};

/// User turn sent when the session carries no `input`.
pub const DEFAULT_USER_MESSAGE: &str = "Begin.";

/// Executes agent specs against a model provider.
#[derive(Clone)]
pub struct LlmAgent {
    provider: Arc<dyn ModelProvider>,
    default_model: String,
}

impl LlmAgent {
    pub fn new(provider: Arc<dyn ModelProvider>, default_model: impl Into<String>) -> Self {
        Self {
            provider,
            default_model: default_model.into(),
        }
    }

    pub fn model_for<'a>(&'a self, spec: &'a AgentSpec) -> &'a str {
        spec.model.as_deref().unwrap_or(&self.default_model)
    }

    /// Ask the model once and return the trimmed reply. State is not modified.
    pub async fn reply(
        &self,
        spec: &AgentSpec,
        state: &SessionState,
    ) -> Result<String, AgentLabError> {
        let system = render_instruction(spec, state)?;
        let user = state.input().unwrap_or(DEFAULT_USER_MESSAGE);
        let model = self.model_for(spec);

        let request = ChatRequest {
            model: model.to_string(),
            messages: vec![Message::user(user)],
            builtin_tools: spec.builtin_tools(),
            system: Some(system),
            ..Default::default()
        };

        tracing::debug!(agent = %spec.name, model, "Agent call");
        let response = self.provider.chat(request).await?;
        tracing::debug!(
            agent = %spec.name,
            tokens = response.usage.total(),
            stop_reason = ?response.stop_reason,
            "Agent replied",
        );

        let content = response.content.trim().to_string();
        if content.is_empty() {
            tracing::warn!(agent = %spec.name, "Agent returned an empty reply");
        }
        Ok(content)
    }

    /// Run the agent and store its reply under `output_key`, if it has one.
    pub async fn run(
        &self,
        spec: &AgentSpec,
        state: &mut SessionState,
    ) -> Result<String, AgentLabError> {
        let content = self.reply(spec, state).await?;
        if let Some(ref key) = spec.output_key {
            state.insert(key.clone(), content.clone());
        }
        Ok(content)
    }
}
