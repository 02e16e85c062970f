// src/pipeline/runner.rs — Pipeline tree execution

use std::sync::Arc;

use anyhow::Context;
use futures::future::BoxFuture;

use super::{Pipeline, PipelineNode};
use crate::agent::{AgentCritic, AgentReviser, AgentSpec, LlmAgent, SessionState};
use crate::refine::{RefineEvent, RefinementLoop};

/// Progress notifications for a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    AgentStart {
        agent: String,
        model: String,
    },
    AgentDone {
        agent: String,
        output_key: Option<String>,
        chars: usize,
    },
    LoopStart {
        name: String,
        max_iterations: i64,
    },
    Refine {
        name: String,
        event: RefineEvent,
    },
}

type ProgressFn = Arc<dyn Fn(PipelineEvent) + Send + Sync>;

/// Walks a pipeline tree, one agent call at a time.
pub struct PipelineRunner {
    agent: LlmAgent,
    on_progress: Option<ProgressFn>,
}

impl PipelineRunner {
    pub fn new(agent: LlmAgent) -> Self {
        Self {
            agent,
            on_progress: None,
        }
    }

    pub fn with_progress(mut self, cb: impl Fn(PipelineEvent) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(cb));
        self
    }

    fn emit(&self, event: PipelineEvent) {
        if let Some(ref cb) = self.on_progress {
            cb(event);
        }
    }

    /// Run `pipeline` with `input` as the user message. Returns the final session state.
    ///
    /// A blank `input` leaves the `input` key unset; agents then receive the
    /// default user turn.
    pub async fn run(&self, pipeline: &Pipeline, input: &str) -> anyhow::Result<SessionState> {
        pipeline.validate()?;
        tracing::info!(pipeline = %pipeline.name, "Pipeline started");

        let mut state = if input.trim().is_empty() {
            SessionState::new()
        } else {
            SessionState::with_input(input)
        };
        self.run_node(&pipeline.root, &mut state)
            .await
            .with_context(|| format!("pipeline '{}'", pipeline.name))?;

        tracing::info!(pipeline = %pipeline.name, keys = state.len(), "Pipeline finished");
        Ok(state)
    }

    fn run_node<'a>(
        &'a self,
        node: &'a PipelineNode,
        state: &'a mut SessionState,
    ) -> BoxFuture<'a, anyhow::Result<()>> {
        Box::pin(async move {
            match node {
                PipelineNode::Agent(spec) => {
                    self.emit(PipelineEvent::AgentStart {
                        agent: spec.name.clone(),
                        model: self.agent.model_for(spec).to_string(),
                    });
                    let reply = self
                        .agent
                        .run(spec, state)
                        .await
                        .with_context(|| format!("agent '{}'", spec.name))?;
                    self.emit(PipelineEvent::AgentDone {
                        agent: spec.name.clone(),
                        output_key: spec.output_key.clone(),
                        chars: reply.chars().count(),
                    });
                    Ok(())
                }
                PipelineNode::Sequential { sub_agents, .. } => {
                    for child in sub_agents {
                        self.run_node(child, state).await?;
                    }
                    Ok(())
                }
                PipelineNode::Loop {
                    name,
                    critic,
                    refiner,
                    max_iterations,
                    ..
                } => self.run_loop(name, critic, refiner, *max_iterations, state).await,
            }
        })
    }

    async fn run_loop(
        &self,
        name: &str,
        critic: &AgentSpec,
        refiner: &AgentSpec,
        max_iterations: i64,
        state: &mut SessionState,
    ) -> anyhow::Result<()> {
        let draft_key = refiner
            .output_key
            .clone()
            .with_context(|| format!("loop '{name}': refiner has no output_key"))?;
        let critique_key = critic
            .output_key
            .clone()
            .with_context(|| format!("loop '{name}': critic has no output_key"))?;
        let seed = state
            .get(&draft_key)
            .with_context(|| format!("loop '{name}': no draft under '{draft_key}' to refine"))?
            .to_string();

        self.emit(PipelineEvent::LoopStart {
            name: name.to_string(),
            max_iterations,
        });

        let critic = AgentCritic::new(self.agent.clone(), critic.clone(), draft_key.clone())
            .with_context(state.clone());
        let reviser = AgentReviser::new(
            self.agent.clone(),
            refiner.clone(),
            draft_key.clone(),
            critique_key,
        )
        .with_context(state.clone());

        let mut refinement = RefinementLoop::new(max_iterations);
        if let Some(cb) = self.on_progress.clone() {
            let loop_name = name.to_string();
            refinement = refinement.with_progress(move |event| {
                cb(PipelineEvent::Refine {
                    name: loop_name.clone(),
                    event,
                })
            });
        }

        let outcome = refinement
            .run(seed, &critic, &reviser)
            .await
            .with_context(|| format!("loop '{name}'"))?;

        tracing::info!(
            loop_name = name,
            reason = %outcome.reason,
            revisions = outcome.revisions,
            "Refinement finished",
        );
        state.insert(draft_key, outcome.draft);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::errors::AgentLabError;
    use crate::provider::{ChatRequest, ChatResponse, ModelInfo, ModelProvider, TokenUsage};
    use crate::refine::TerminationReason;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedProvider {
        replies: Mutex<VecDeque<&'static str>>,
    }

    #[async_trait]
    impl ModelProvider for ScriptedProvider {
        fn id(&self) -> &str {
            "scripted"
        }
        fn name(&self) -> &str {
            "Scripted"
        }
        fn models(&self) -> Vec<ModelInfo> {
            vec![]
        }
        async fn chat(&self, _request: ChatRequest) -> Result<ChatResponse, AgentLabError> {
            let content = self
                .replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow::anyhow!("script exhausted"))?;
            Ok(ChatResponse {
                content: content.to_string(),
                usage: TokenUsage::default(),
                stop_reason: Default::default(),
            })
        }
    }

    fn runner(replies: &[&'static str]) -> PipelineRunner {
        let provider = Arc::new(ScriptedProvider {
            replies: Mutex::new(replies.iter().copied().collect()),
        });
        PipelineRunner::new(LlmAgent::new(provider, "m"))
    }

    fn write_and_polish(max_iterations: i64) -> Pipeline {
        Pipeline {
            name: "write_and_polish".into(),
            description: None,
            root: PipelineNode::Sequential {
                name: "seq".into(),
                description: None,
                sub_agents: vec![
                    PipelineNode::Agent(
                        AgentSpec::new("writer", "Write about {{ input }}").with_output_key("draft"),
                    ),
                    PipelineNode::Loop {
                        name: "polish".into(),
                        description: None,
                        critic: AgentSpec::new("critic", "Review {{ draft }}")
                            .with_output_key("critique"),
                        refiner: AgentSpec::new("refiner", "Fix {{ draft }}: {{ critique }}")
                            .with_output_key("draft"),
                        max_iterations,
                    },
                ],
            },
        }
    }

    #[tokio::test]
    async fn test_loop_writes_final_draft() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        let runner = runner(&["v1", "- shorter", "v2", "APPROVED"])
            .with_progress(move |e| sink.lock().unwrap().push(e));

        let pipeline = write_and_polish(3);
        let state = runner.run(&pipeline, "rust").await.unwrap();

        assert_eq!(state.get("draft"), Some("v2"));
        assert_eq!(pipeline.final_output(&state), Some("v2"));

        let events = events.lock().unwrap();
        assert!(matches!(events[0], PipelineEvent::AgentStart { .. }));
        assert!(events.iter().any(|e| matches!(
            e,
            PipelineEvent::Refine {
                event: RefineEvent::Complete {
                    reason: TerminationReason::Approved,
                    revisions: 1,
                },
                ..
            }
        )));
    }

    #[tokio::test]
    async fn test_loop_budget_exhausted_keeps_last_revision() {
        let runner = runner(&["v1", "- a", "v2", "- b", "v3"]);
        let state = runner.run(&write_and_polish(2), "rust").await.unwrap();
        assert_eq!(state.get("draft"), Some("v3"));
    }

    #[tokio::test]
    async fn test_capability_failure_names_loop() {
        // critic reply missing: provider errors in round 2
        let runner = runner(&["v1", "- a", "v2"]);
        let err = runner.run(&write_and_polish(3), "rust").await.unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("loop 'polish'"), "{msg}");
        assert!(msg.contains("critique failed in round 2"), "{msg}");
    }

    #[tokio::test]
    async fn test_invalid_pipeline_makes_no_calls() {
        let runner = runner(&[]);
        let err = runner.run(&write_and_polish(0), "rust").await.unwrap_err();
        assert!(err.to_string().contains("max_iterations"));
    }
}
