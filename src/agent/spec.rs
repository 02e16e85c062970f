// src/agent/spec.rs — Declarative agent definitions and session state

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::infra::errors::AgentLabError;
use crate::provider::BuiltinTool;

/// Session-state key holding the user's message.
pub const INPUT_KEY: &str = "input";

/// One LLM agent: a model, an instruction template and the built-in tools it may use.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentSpec {
    pub name: String,
    /// Falls back to `[models] default` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// minijinja template; `{{ key }}` reads a session-state value.
    pub instruction: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<String>,
    /// Where the agent's reply is stored in session state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_key: Option<String>,
}

impl AgentSpec {
    pub fn new(name: impl Into<String>, instruction: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            model: None,
            description: None,
            instruction: instruction.into(),
            tools: Vec::new(),
            output_key: None,
        }
    }

    pub fn with_output_key(mut self, key: impl Into<String>) -> Self {
        self.output_key = Some(key.into());
        self
    }

    pub fn with_tool(mut self, tool: impl Into<String>) -> Self {
        self.tools.push(tool.into());
        self
    }

    /// Check the definition before any model call is made.
    pub fn validate(&self) -> Result<(), AgentLabError> {
        let label = if self.name.trim().is_empty() {
            "<unnamed>"
        } else {
            self.name.as_str()
        };

        if self.name.trim().is_empty() {
            return Err(AgentLabError::invalid_agent(label, "name is empty"));
        }
        if self.instruction.trim().is_empty() {
            return Err(AgentLabError::invalid_agent(label, "instruction is empty"));
        }
        if let Some(ref key) = self.output_key {
            if !is_identifier(key) {
                return Err(AgentLabError::invalid_agent(
                    label,
                    format!("output_key '{key}' is not a valid identifier"),
                ));
            }
        }
        for tool in &self.tools {
            if BuiltinTool::parse(tool).is_none() {
                return Err(AgentLabError::invalid_agent(
                    label,
                    format!("unknown tool '{tool}' (available: google_search)"),
                ));
            }
        }

        super::template::compile_check(self)
    }

    /// Built-in tools, skipping names that do not parse. Call `validate` first.
    pub fn builtin_tools(&self) -> Vec<BuiltinTool> {
        self.tools
            .iter()
            .filter_map(|t| BuiltinTool::parse(t))
            .collect()
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Named values shared between the agents of one pipeline run. In-memory only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionState {
    values: BTreeMap<String, String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fresh state carrying the user message under [`INPUT_KEY`].
    pub fn with_input(input: impl Into<String>) -> Self {
        let mut state = Self::new();
        state.insert(INPUT_KEY, input);
        state
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn input(&self) -> Option<&str> {
        self.get(INPUT_KEY)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub(crate) fn as_map(&self) -> &BTreeMap<String, String> {
        &self.values
    }
}
