mod cli;
mod handlers;
mod output;

use clap::{CommandFactory, Parser};
use cli::{Cli, Commands};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Ok(log_path) = std::env::var("FEEDSYNC_DEBUG_LOG") {
        let log_file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        tracing_subscriber::fmt()
            .with_writer(log_file)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug")),
            )
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true)
            .with_ansi(false)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
            )
            .init();
    }

    let cli = Cli::parse();

    if let Commands::Completions { shell } = cli.command {
        clap_complete::generate(shell, &mut Cli::command(), "feedsync", &mut std::io::stdout());
        return Ok(());
    }

    let config = cli.feed_config()?;

    match cli.command {
        Commands::Resolve { route, items } => {
            handlers::resolve::handle(&config, &route, items)?;
        }
        Commands::Window { index, items } => {
            handlers::window::handle(&config, index, items)?;
        }
        Commands::Replay { script } => {
            handlers::replay::handle(config, &script).await?;
        }
        Commands::Completions { .. } => {}
    }

    Ok(())
}
