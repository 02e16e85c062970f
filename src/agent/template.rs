// src/agent/template.rs — Instruction rendering against session state

use minijinja::{Environment, UndefinedBehavior};

use super::spec::{AgentSpec, SessionState};
use crate::infra::errors::AgentLabError;

fn environment<'source>() -> Environment<'source> {
    let mut env = Environment::new();
    // A missing state key is a pipeline wiring bug, not an empty string
    env.set_undefined_behavior(UndefinedBehavior::Strict);
    env
}

/// Render an agent's instruction with the session state as template context.
pub fn render_instruction(spec: &AgentSpec, state: &SessionState) -> Result<String, AgentLabError> {
    environment()
        .render_str(&spec.instruction, state.as_map())
        .map_err(|source| AgentLabError::Template {
            agent: spec.name.clone(),
            source,
        })
}

/// Parse the instruction without rendering it.
pub(crate) fn compile_check(spec: &AgentSpec) -> Result<(), AgentLabError> {
    let env = environment();
    env.template_from_str(&spec.instruction)
        .map(|_| ())
        .map_err(|source| AgentLabError::Template {
            agent: spec.name.clone(),
            source,
        })
}
