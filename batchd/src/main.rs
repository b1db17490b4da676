//! batchd - batch ingestion daemon
//!
//! CLI entry point for serving the API and talking to a running server.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::*;
use eyre::{Context, Result};
use tracing::info;

use batchd::api::{self, AppState};
use batchd::cli::{Cli, Command, OutputFormat};
use batchd::client::BatchdClient;
use batchd::config::Config;
use batchd::domain::{BatchStatus, IngestionState, IngestionStatus, Priority};
use batchd::scheduler::Scheduler;

fn setup_logging(verbose: bool) -> Result<()> {
    // Create log directory
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("batchd")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Write to log file, not stdout/stderr
    let level = if verbose { tracing::Level::DEBUG } else { tracing::Level::INFO };
    let log_file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_dir.join("batchd.log"))
        .context("Failed to open log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (verbose: {})", verbose);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;

    match cli.command {
        Command::Serve { bind } => cmd_serve(config, bind).await,
        Command::Submit { priority, ids } => cmd_submit(&config, ids, priority).await,
        Command::Status { ingestion_id, format } => cmd_status(&config, &ingestion_id, format).await,
    }
}

/// Run the HTTP server and scheduler until Ctrl-C
async fn cmd_serve(mut config: Config, bind: Option<String>) -> Result<()> {
    if let Some(bind) = bind {
        config.server.bind = bind;
    }
    config.validate().context("Invalid configuration")?;

    info!(
        "batchd starting: max_batch_size={}, cooldown_ms={}, item_latency_ms={}",
        config.scheduler.max_batch_size, config.scheduler.cooldown_ms, config.scheduler.item_latency_ms
    );

    let scheduler = Scheduler::new(config.scheduler.clone());
    let state = AppState::new(scheduler, &config.server);

    println!("{} batchd listening on {}", "✓".green(), config.server.bind.cyan());
    api::serve(state, &config.server, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        }
        info!("Shutdown signal received");
    })
    .await
}

/// Submit ids to a running server
async fn cmd_submit(config: &Config, ids: Vec<u64>, priority: Priority) -> Result<()> {
    let client = BatchdClient::new(&config.client)?;
    let ingestion_id = client.submit(ids, priority).await?;
    println!("{} Submitted ingestion: {}", "✓".green(), ingestion_id.to_string().cyan());
    Ok(())
}

/// Show ingestion status
async fn cmd_status(config: &Config, ingestion_id: &str, format: OutputFormat) -> Result<()> {
    let client = BatchdClient::new(&config.client)?;
    let Some(status) = client.status(ingestion_id).await? else {
        return Err(eyre::eyre!("Ingestion not found: {}", ingestion_id));
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Text => print_status(&status),
    }
    Ok(())
}

fn print_status(status: &IngestionStatus) {
    let overall = match status.status {
        IngestionState::Pending => status.status.to_string().yellow(),
        IngestionState::Running => status.status.to_string().cyan(),
        IngestionState::Done => status.status.to_string().green(),
        IngestionState::Failed => status.status.to_string().red(),
    };
    println!("Ingestion: {} [{}]", status.ingestion_id.to_string().cyan(), overall);
    for batch in &status.batches {
        let label = match batch.status {
            BatchStatus::Pending => batch.status.to_string().yellow(),
            BatchStatus::Running => batch.status.to_string().cyan(),
            BatchStatus::Done => batch.status.to_string().green(),
            BatchStatus::Failed => batch.status.to_string().red(),
        };
        println!("  {} {:?} {}", batch.batch_id.to_string().dimmed(), batch.ids, label);
    }
}
