// src/pipeline/mod.rs — Pipeline trees: agents, sequences and refinement loops

pub mod catalog;
pub mod runner;

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::agent::{AgentSpec, LlmAgent, SessionState, INPUT_KEY};
use crate::infra::errors::AgentLabError;
use crate::provider::ModelProvider;

pub use runner::{PipelineEvent, PipelineRunner};

/// One node of a pipeline tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PipelineNode {
    Agent(AgentSpec),
    /// Children run in order over the same session state.
    Sequential {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        sub_agents: Vec<PipelineNode>,
    },
    /// Critic/refiner refinement over the draft stored under the refiner's output key.
    Loop {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        critic: AgentSpec,
        refiner: AgentSpec,
        max_iterations: i64,
    },
}

impl PipelineNode {
    pub fn name(&self) -> &str {
        match self {
            PipelineNode::Agent(spec) => &spec.name,
            PipelineNode::Sequential { name, .. } | PipelineNode::Loop { name, .. } => name,
        }
    }

    /// Structural checks, recursive.
    pub fn validate(&self) -> Result<(), AgentLabError> {
        match self {
            PipelineNode::Agent(spec) => spec.validate(),
            PipelineNode::Sequential {
                name, sub_agents, ..
            } => {
                if sub_agents.is_empty() {
                    return Err(AgentLabError::invalid_agent(
                        name,
                        "sequential node has no sub_agents",
                    ));
                }
                sub_agents.iter().try_for_each(PipelineNode::validate)
            }
            PipelineNode::Loop {
                name,
                critic,
                refiner,
                max_iterations,
                ..
            } => {
                if *max_iterations < 1 {
                    return Err(AgentLabError::invalid_agent(
                        name,
                        format!("max_iterations must be at least 1 (got {max_iterations})"),
                    ));
                }
                critic.validate()?;
                refiner.validate()?;

                let draft_key = refiner.output_key.as_deref().ok_or_else(|| {
                    AgentLabError::invalid_agent(name, "refiner needs an output_key (the draft key)")
                })?;
                let critique_key = critic.output_key.as_deref().ok_or_else(|| {
                    AgentLabError::invalid_agent(name, "critic needs an output_key")
                })?;
                if draft_key == critique_key {
                    return Err(AgentLabError::invalid_agent(
                        name,
                        format!("critic and refiner both write '{draft_key}'"),
                    ));
                }
                Ok(())
            }
        }
    }

    /// Output keys in tree order. A loop contributes its draft key.
    pub fn output_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        self.collect_output_keys(&mut keys);
        keys
    }

    fn collect_output_keys<'a>(&'a self, keys: &mut Vec<&'a str>) {
        match self {
            PipelineNode::Agent(spec) => keys.extend(spec.output_key.as_deref()),
            PipelineNode::Sequential { sub_agents, .. } => {
                for child in sub_agents {
                    child.collect_output_keys(keys);
                }
            }
            PipelineNode::Loop { refiner, .. } => keys.extend(refiner.output_key.as_deref()),
        }
    }

    /// Check that every state key an instruction reads is written earlier.
    fn check_data_flow(&self, available: &mut BTreeSet<String>) -> Result<(), AgentLabError> {
        match self {
            PipelineNode::Agent(spec) => {
                require_keys(spec, available)?;
                if let Some(ref key) = spec.output_key {
                    available.insert(key.clone());
                }
                Ok(())
            }
            PipelineNode::Sequential { sub_agents, .. } => sub_agents
                .iter()
                .try_for_each(|child| child.check_data_flow(available)),
            PipelineNode::Loop {
                name,
                critic,
                refiner,
                ..
            } => {
                let draft_key = refiner.output_key.clone().unwrap_or_default();
                if !available.contains(&draft_key) {
                    return Err(AgentLabError::invalid_agent(
                        name,
                        format!("no earlier agent writes the draft '{draft_key}' to refine"),
                    ));
                }
                require_keys(critic, available)?;

                let mut refiner_view = available.clone();
                refiner_view.extend(critic.output_key.clone());
                require_keys(refiner, &refiner_view)
            }
        }
    }
}

fn require_keys(spec: &AgentSpec, available: &BTreeSet<String>) -> Result<(), AgentLabError> {
    let env = minijinja::Environment::new();
    let template = env
        .template_from_str(&spec.instruction)
        .map_err(|source| AgentLabError::Template {
            agent: spec.name.clone(),
            source,
        })?;

    let mut missing: Vec<String> = template
        .undeclared_variables(false)
        .into_iter()
        .filter(|key| !available.contains(key))
        .collect();
    missing.sort();

    match missing.first() {
        None => Ok(()),
        Some(key) => Err(AgentLabError::invalid_agent(
            &spec.name,
            format!("instruction reads '{key}' but no earlier agent writes it"),
        )),
    }
}

/// A named, runnable pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub root: PipelineNode,
}

impl Pipeline {
    /// Structure, templates and state wiring.
    pub fn validate(&self) -> Result<(), AgentLabError> {
        if self.name.trim().is_empty() {
            return Err(AgentLabError::Config("pipeline name is empty".into()));
        }
        self.root.validate()?;
        if self.root.output_keys().is_empty() {
            return Err(AgentLabError::Config(format!(
                "pipeline '{}' writes no output_key",
                self.name
            )));
        }
        let mut available = BTreeSet::from([INPUT_KEY.to_string()]);
        self.root.check_data_flow(&mut available)
    }

    /// Parse and validate a TOML pipeline definition.
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let pipeline: Pipeline = toml::from_str(content)?;
        pipeline.validate()?;
        Ok(pipeline)
    }

    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading pipeline {}", path.display()))?;
        Self::from_toml_str(&content).with_context(|| format!("loading {}", path.display()))
    }

    /// Run against `provider` with no progress reporting.
    pub async fn run(
        &self,
        provider: Arc<dyn ModelProvider>,
        default_model: &str,
        input: &str,
    ) -> anyhow::Result<SessionState> {
        PipelineRunner::new(LlmAgent::new(provider, default_model))
            .run(self, input)
            .await
    }

    /// Value of the last output key, in tree order, present in `state`.
    pub fn final_output<'s>(&self, state: &'s SessionState) -> Option<&'s str> {
        self.root
            .output_keys()
            .into_iter()
            .rev()
            .find_map(|key| state.get(key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(name: &str, instruction: &str, key: Option<&str>) -> PipelineNode {
        let mut spec = AgentSpec::new(name, instruction);
        spec.output_key = key.map(String::from);
        PipelineNode::Agent(spec)
    }

    fn refine_loop(max_iterations: i64) -> PipelineNode {
        PipelineNode::Loop {
            name: "refinement".into(),
            description: None,
            critic: AgentSpec::new("critic", "Review {{ draft }}").with_output_key("critique"),
            refiner: AgentSpec::new("refiner", "Fix {{ draft }} per {{ critique }}")
                .with_output_key("draft"),
            max_iterations,
        }
    }

    fn pipeline(root: PipelineNode) -> Pipeline {
        Pipeline {
            name: "test".into(),
            description: None,
            root,
        }
    }

    // ─── Validation ─────────────────────────────────────────────

    #[test]
    fn test_valid_sequence_with_loop() {
        let p = pipeline(PipelineNode::Sequential {
            name: "seq".into(),
            description: None,
            sub_agents: vec![agent("writer", "Write about {{ input }}", Some("draft")), refine_loop(3)],
        });
        assert!(p.validate().is_ok());
    }

    #[test]
    fn test_empty_sequence_rejected() {
        let node = PipelineNode::Sequential {
            name: "seq".into(),
            description: None,
            sub_agents: vec![],
        };
        assert!(node.validate().unwrap_err().to_string().contains("no sub_agents"));
    }

    #[test]
    fn test_loop_budget_rejected() {
        for n in [0, -1] {
            let err = refine_loop(n).validate().unwrap_err();
            assert!(err.to_string().contains("max_iterations"), "{err}");
        }
    }

    #[test]
    fn test_loop_needs_keys() {
        let PipelineNode::Loop {
            name,
            critic,
            mut refiner,
            ..
        } = refine_loop(2)
        else {
            unreachable!()
        };
        refiner.output_key = None;
        let node = PipelineNode::Loop {
            name,
            description: None,
            critic,
            refiner,
            max_iterations: 2,
        };
        assert!(node.validate().unwrap_err().to_string().contains("draft key"));
    }

    #[test]
    fn test_loop_without_seed_rejected() {
        let p = pipeline(refine_loop(3));
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("no earlier agent writes the draft 'draft'"));
    }

    #[test]
    fn test_unwired_key_rejected() {
        let p = pipeline(PipelineNode::Sequential {
            name: "seq".into(),
            description: None,
            sub_agents: vec![
                agent("summarizer", "Summarize {{ research_findings }}", Some("summary")),
                agent("research", "Research {{ input }}", Some("research_findings")),
            ],
        });
        let err = p.validate().unwrap_err();
        assert!(err.to_string().contains("reads 'research_findings'"));
    }

    #[test]
    fn test_pipeline_without_output_rejected() {
        let p = pipeline(agent("a", "Hi", None));
        assert!(p.validate().unwrap_err().to_string().contains("no output_key"));
    }

    // ─── Output keys ────────────────────────────────────────────

    #[test]
    fn test_output_keys_tree_order() {
        let root = PipelineNode::Sequential {
            name: "seq".into(),
            description: None,
            sub_agents: vec![
                agent("a", "x", Some("first")),
                agent("b", "x", None),
                agent("c", "x", Some("draft")),
                refine_loop(1),
            ],
        };
        assert_eq!(root.output_keys(), vec!["first", "draft", "draft"]);
    }

    #[test]
    fn test_final_output_prefers_last_written() {
        let p = pipeline(PipelineNode::Sequential {
            name: "seq".into(),
            description: None,
            sub_agents: vec![
                agent("a", "x", Some("first")),
                agent("b", "x", Some("second")),
            ],
        });
        let mut state = SessionState::with_input("q");
        state.insert("first", "one");
        assert_eq!(p.final_output(&state), Some("one"));
        state.insert("second", "two");
        assert_eq!(p.final_output(&state), Some("two"));
        assert_eq!(p.final_output(&SessionState::new()), None);
    }

    // ─── TOML ───────────────────────────────────────────────────

    #[test]
    fn test_from_toml_str() {
        let p = Pipeline::from_toml_str(
            r#"
name = "tiny"
description = "Write then polish"

[root]
kind = "sequential"
name = "tiny_seq"

[[root.sub_agents]]
kind = "agent"
name = "writer"
instruction = "Write about {{ input }}"
output_key = "draft"

[[root.sub_agents]]
kind = "loop"
name = "polish"
max_iterations = 2

[root.sub_agents.critic]
name = "critic"
instruction = "Review {{ draft }}"
output_key = "critique"

[root.sub_agents.refiner]
name = "refiner"
instruction = "Fix {{ draft }} using {{ critique }}"
output_key = "draft"
"#,
        )
        .unwrap();

        assert_eq!(p.name, "tiny");
        let PipelineNode::Sequential { sub_agents, .. } = &p.root else {
            panic!("expected sequential root");
        };
        assert_eq!(sub_agents.len(), 2);
        assert!(matches!(
            sub_agents[1],
            PipelineNode::Loop {
                max_iterations: 2,
                ..
            }
        ));
    }

    #[test]
    fn test_from_toml_str_rejects_unknown_kind() {
        let err = Pipeline::from_toml_str(
            r#"
name = "bad"
[root]
kind = "parallel"
name = "p"
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.toml");
        std::fs::write(
            &path,
            r#"
name = "single"
[root]
kind = "agent"
name = "helper"
instruction = "Answer {{ input }}"
output_key = "answer"
"#,
        )
        .unwrap();
        let p = Pipeline::load_from(&path).unwrap();
        assert_eq!(p.root.name(), "helper");

        let missing = Pipeline::load_from(&dir.path().join("nope.toml")).unwrap_err();
        assert!(format!("{missing:#}").contains("nope.toml"));
    }
}
