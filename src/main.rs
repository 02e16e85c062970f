// src/main.rs — agentlab entry point

use clap::Parser;

use agentlab::cli::Cli;
use agentlab::infra::config::Config;
use agentlab::infra::logger;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

async fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load config (falls back to defaults if no config.toml)
    let config = if let Some(ref path) = cli.config {
        Config::load_from(std::path::Path::new(path))?
    } else {
        Config::load()?
    };

    // RUST_LOG still wins over both
    logger::init_logging(cli.log_level(&config.logging.level));

    agentlab::cli::dispatch(cli, config).await
}
