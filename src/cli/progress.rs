// src/cli/progress.rs — Terminal progress renderer for pipeline and refinement runs

use crate::pipeline::PipelineEvent;
use crate::refine::RefineEvent;

/// Build a refinement progress callback that writes to stderr.
///
/// stdout stays clean for the final draft.
pub fn terminal_refine_progress() -> impl Fn(RefineEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_refine_event(&event))
}

/// Build a pipeline progress callback that writes to stderr.
pub fn terminal_pipeline_progress() -> impl Fn(PipelineEvent) + Send + Sync + 'static {
    move |event| eprintln!("{}", format_pipeline_event(&event))
}

pub fn format_refine_event(event: &RefineEvent) -> String {
    match event {
        RefineEvent::RoundStart { round, max_rounds } => {
            format!("[round {}/{}] critiquing...", round, max_rounds)
        }
        RefineEvent::Critiqued {
            round,
            approved: true,
            ..
        } => format!("[round {}] approved", round),
        RefineEvent::Critiqued {
            round, suggestions, ..
        } => format!("[round {}] {} suggestion(s) -> revising", round, suggestions),
        RefineEvent::Revised { round } => format!("[round {}] revised", round),
        RefineEvent::Complete { reason, revisions } => {
            format!("[done] {} after {} revision(s)", reason, revisions)
        }
    }
}

pub fn format_pipeline_event(event: &PipelineEvent) -> String {
    match event {
        PipelineEvent::AgentStart { agent, model } => {
            format!("[agent] {} | model: {}", agent, model)
        }
        PipelineEvent::AgentDone {
            agent,
            output_key: Some(key),
            chars,
        } => format!("[agent] {} -> {} ({} chars)", agent, key, chars),
        PipelineEvent::AgentDone { agent, chars, .. } => {
            format!("[agent] {} done ({} chars)", agent, chars)
        }
        PipelineEvent::LoopStart {
            name,
            max_iterations,
        } => format!("[loop] {} | up to {} round(s)", name, max_iterations),
        PipelineEvent::Refine { event, .. } => format!("  {}", format_refine_event(event)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::refine::TerminationReason;
    use std::sync::{Arc, Mutex};

    /// Helper that captures progress output into a Vec instead of stderr.
    fn capturing_progress() -> (
        impl Fn(RefineEvent) + Send + 'static,
        Arc<Mutex<Vec<String>>>,
    ) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let log_clone = log.clone();
        let cb = move |event: RefineEvent| {
            log_clone.lock().unwrap().push(format_refine_event(&event));
        };
        (cb, log)
    }

    #[test]
    fn test_round_start_format() {
        let line = format_refine_event(&RefineEvent::RoundStart {
            round: 1,
            max_rounds: 3,
        });
        assert_eq!(line, "[round 1/3] critiquing...");
    }

    #[test]
    fn test_critiqued_format() {
        let approved = format_refine_event(&RefineEvent::Critiqued {
            round: 2,
            approved: true,
            suggestions: 0,
        });
        assert_eq!(approved, "[round 2] approved");

        let revise = format_refine_event(&RefineEvent::Critiqued {
            round: 1,
            approved: false,
            suggestions: 3,
        });
        assert_eq!(revise, "[round 1] 3 suggestion(s) -> revising");
    }

    #[test]
    fn test_complete_format() {
        let line = format_refine_event(&RefineEvent::Complete {
            reason: TerminationReason::MaxRounds,
            revisions: 3,
        });
        assert_eq!(line, "[done] max_rounds after 3 revision(s)");
    }

    #[test]
    fn test_agent_formats() {
        assert_eq!(
            format_pipeline_event(&PipelineEvent::AgentStart {
                agent: "harvest_enrich".into(),
                model: "gemini-2.5-flash-lite".into(),
            }),
            "[agent] harvest_enrich | model: gemini-2.5-flash-lite"
        );
        assert_eq!(
            format_pipeline_event(&PipelineEvent::AgentDone {
                agent: "harvest_enrich".into(),
                output_key: Some("papers_meta".into()),
                chars: 1200,
            }),
            "[agent] harvest_enrich -> papers_meta (1200 chars)"
        );
        assert_eq!(
            format_pipeline_event(&PipelineEvent::AgentDone {
                agent: "helper".into(),
                output_key: None,
                chars: 5,
            }),
            "[agent] helper done (5 chars)"
        );
    }

    #[test]
    fn test_loop_events_indented() {
        assert_eq!(
            format_pipeline_event(&PipelineEvent::LoopStart {
                name: "summary_refinement_loop".into(),
                max_iterations: 3,
            }),
            "[loop] summary_refinement_loop | up to 3 round(s)"
        );
        assert_eq!(
            format_pipeline_event(&PipelineEvent::Refine {
                name: "summary_refinement_loop".into(),
                event: RefineEvent::Revised { round: 1 },
            }),
            "  [round 1] revised"
        );
    }

    #[test]
    fn test_full_lifecycle_sequence() {
        let (cb, log) = capturing_progress();
        cb(RefineEvent::RoundStart {
            round: 1,
            max_rounds: 2,
        });
        cb(RefineEvent::Critiqued {
            round: 1,
            approved: false,
            suggestions: 2,
        });
        cb(RefineEvent::Revised { round: 1 });
        cb(RefineEvent::RoundStart {
            round: 2,
            max_rounds: 2,
        });
        cb(RefineEvent::Critiqued {
            round: 2,
            approved: true,
            suggestions: 0,
        });
        cb(RefineEvent::Complete {
            reason: TerminationReason::Approved,
            revisions: 1,
        });

        let msgs = log.lock().unwrap();
        assert_eq!(msgs.len(), 6);
        assert!(msgs[0].starts_with("[round 1/2]"));
        assert!(msgs[4].contains("approved"));
        assert_eq!(msgs[5], "[done] approved after 1 revision(s)");
    }
}
