// src/agent/mod.rs — Declarative LLM agents

pub mod capability;
pub mod runner;
pub mod spec;
pub mod template;

pub use capability::{AgentCritic, AgentReviser, PromptCritic, PromptReviser};
pub use runner::{LlmAgent, DEFAULT_USER_MESSAGE};
pub use spec::{AgentSpec, SessionState, INPUT_KEY};
pub use template::render_instruction;
