use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use friction_agent::config::AgentConfig;
use friction_agent::replay::SessionFixture;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Parser, Debug)]
#[command(
    name = "friction-agent",
    version,
    about = "Friction prioritization and auto-resolution agent"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Replay a recorded session fixture through the engine
    Run {
        /// Session fixture (JSON)
        #[arg(long)]
        fixture: PathBuf,

        /// Agent config (TOML)
        #[arg(long)]
        config: Option<PathBuf>,

        /// JSONL ledger to append to; overrides the config file
        #[arg(long)]
        ledger: Option<PathBuf>,

        /// Detect and rank only, skip the auto-resolution gate
        #[arg(long)]
        no_resolve: bool,

        /// Write the report here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Summarize a JSONL outcome ledger
    Ledger {
        #[arg(long)]
        ledger: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Run {
            fixture,
            config,
            ledger,
            no_resolve,
            output,
        } => {
            let mut config = AgentConfig::load(config.as_deref())?;
            if ledger.is_some() {
                config.ledger.path = ledger;
            }
            let fixture = SessionFixture::load(&fixture)?;

            let cancel = CancellationToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupted, cancelling run");
                    on_interrupt.cancel();
                }
            });

            let report =
                friction_agent::replay_session(&config, fixture, !no_resolve, &cancel).await?;
            info!(
                frictions = report.detection.frictions.len(),
                failures = report.failures.len(),
                cancelled = report.detection.cancelled,
                "Session replay finished"
            );
            emit(&serde_json::to_string_pretty(&report)?, output)?;
        }
        Command::Ledger { ledger } => {
            let report = friction_agent::summarize_ledger(&ledger).await?;
            emit(&serde_json::to_string_pretty(&report)?, None)?;
        }
    }
    Ok(())
}

fn emit(json: &str, output: Option<PathBuf>) -> Result<()> {
    match output {
        Some(path) => std::fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display())),
        None => {
            println!("{json}");
            Ok(())
        }
    }
}
