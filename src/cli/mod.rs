// src/cli/mod.rs — CLI definition (clap derive)

pub mod pipelines;
pub mod progress;
pub mod refine;
pub mod run;

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

use crate::infra::config::Config;
use crate::provider::resolver;

#[derive(Parser)]
#[command(
    name = "agentlab",
    about = "Declarative LLM agent pipelines with a bounded critic/refiner loop",
    version
)]
pub struct Cli {
    /// Model for agents that do not name one (overrides [models] default)
    #[arg(short, long, global = true)]
    pub model: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<String>,

    /// Suppress progress output (only emit final result)
    #[arg(long, global = true)]
    pub quiet: bool,

    /// More logging (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List built-in and user pipelines
    Pipelines,
    /// Run a pipeline and print its final output
    Run {
        /// Pipeline name (see `agentlab pipelines`)
        #[arg(required_unless_present = "file")]
        pipeline: Option<String>,

        /// User message
        #[arg(trailing_var_arg = true)]
        message: Vec<String>,

        /// Load the pipeline from a TOML file instead of the catalog
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Read the user message from stdin
        #[arg(long)]
        stdin: bool,
    },
    /// Refine a draft with the built-in critic and refiner
    Refine {
        /// Round budget (overrides [refine] max_rounds)
        #[arg(short, long, allow_negative_numbers = true)]
        rounds: Option<i64>,

        /// Draft file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}

impl Cli {
    /// Log level implied by `-v`, falling back to the configured level.
    pub fn log_level<'a>(&self, configured: &'a str) -> &'a str {
        match self.verbose {
            0 => configured,
            1 => "info",
            _ => "debug",
        }
    }
}

/// Run the parsed command.
pub async fn dispatch(cli: Cli, config: Config) -> anyhow::Result<()> {
    let model = cli
        .model
        .clone()
        .unwrap_or_else(|| config.models.default.clone());

    match cli.command {
        Commands::Pipelines => pipelines::list_pipelines(),
        Commands::Run {
            pipeline,
            message,
            file,
            stdin,
        } => {
            let provider = resolver::resolve_provider(&config.provider)?;
            let args = run::RunArgs {
                pipeline,
                message,
                file,
                stdin,
            };
            run::run_pipeline(args, provider, &model, cli.quiet).await
        }
        Commands::Refine { rounds, input } => {
            let provider = resolver::resolve_provider(&config.provider)?;
            let rounds = rounds.unwrap_or(config.refine.max_rounds);
            refine::run_refine(input.as_deref(), rounds, provider, &model, cli.quiet).await
        }
    }
}
