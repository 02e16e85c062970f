// src/cli/run.rs — `agentlab run`: execute a pipeline

use std::path::PathBuf;
use std::sync::Arc;

use crate::agent::LlmAgent;
use crate::pipeline::{catalog, Pipeline, PipelineRunner};
use crate::provider::ModelProvider;
use crate::util::preview;

pub struct RunArgs {
    pub pipeline: Option<String>,
    pub message: Vec<String>,
    pub file: Option<PathBuf>,
    pub stdin: bool,
}

/// Run a catalog or file pipeline and print its final output to stdout.
pub async fn run_pipeline(
    args: RunArgs,
    provider: Arc<dyn ModelProvider>,
    model: &str,
    quiet: bool,
) -> anyhow::Result<()> {
    let (pipeline, words) = select_pipeline(args.pipeline, args.message, args.file.as_deref())?;

    let piped = if args.stdin {
        Some(read_stdin()?)
    } else {
        None
    };
    let input = build_message(&words, piped);

    if !quiet {
        eprintln!(
            "[run] {} | model: {}{}",
            pipeline.name,
            model,
            if input.is_empty() {
                String::new()
            } else {
                format!(" | {}", preview(&input, 60))
            }
        );
    }

    let mut runner = PipelineRunner::new(LlmAgent::new(provider, model));
    if !quiet {
        runner = runner.with_progress(super::progress::terminal_pipeline_progress());
    }

    let state = runner.run(&pipeline, &input).await?;
    match pipeline.final_output(&state) {
        Some(output) => {
            println!("{output}");
            Ok(())
        }
        None => anyhow::bail!("pipeline '{}' produced no output", pipeline.name),
    }
}

/// With `--file`, a leading positional belongs to the message, not a pipeline name.
fn select_pipeline(
    name: Option<String>,
    mut words: Vec<String>,
    file: Option<&std::path::Path>,
) -> anyhow::Result<(Pipeline, Vec<String>)> {
    match (file, name) {
        (Some(path), first) => {
            if let Some(first) = first {
                words.insert(0, first);
            }
            Ok((Pipeline::load_from(path)?, words))
        }
        (None, Some(name)) => Ok((catalog::get(&name)?, words)),
        (None, None) => anyhow::bail!("name a pipeline or pass --file"),
    }
}

/// Join positional words with piped content. Args act as the instruction,
/// stdin as the material.
fn build_message(words: &[String], piped: Option<String>) -> String {
    let instruction = words.join(" ");
    match piped {
        Some(content) if !instruction.is_empty() => {
            format!("{}\n\n---\n\n{}", instruction, content.trim_end())
        }
        Some(content) => content.trim_end().to_string(),
        None => instruction,
    }
}

fn read_stdin() -> anyhow::Result<String> {
    use std::io::Read;
    let mut buf = String::new();
    std::io::stdin().read_to_string(&mut buf)?;
    if buf.trim().is_empty() {
        anyhow::bail!("No input received on stdin");
    }
    Ok(buf)
}
