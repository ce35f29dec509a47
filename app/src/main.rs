// ==============================================================================
// main.rs - VKGL Consensus Refresh Entry Point
// ==============================================================================
// Description: Rebuilds the consensus and comments tables from all lab tables
// Author: Matt Barham
// Created: 2026-10-12
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use vkgl_consensus::config::{PartialConfig, TableNames, DEFAULT_TABLE_PREFIX};
use vkgl_consensus::disease::DiseaseLookup;
use vkgl_consensus::molgenis::MolgenisClient;
use vkgl_consensus::refresher::SnapshotRefresher;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Legacy key=value config file (labs, url, account, password)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Comma-separated lab names, in processing order
    #[arg(long, env = "VKGL_LABS")]
    labs: Option<String>,

    /// MOLGENIS server URL
    #[arg(long, env = "MOLGENIS_URL")]
    url: Option<String>,

    /// MOLGENIS account name
    #[arg(long, env = "MOLGENIS_ACCOUNT")]
    account: Option<String>,

    /// MOLGENIS password (or use MOLGENIS_PASSWORD_FILE env var)
    #[arg(long, env = "MOLGENIS_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Gene to OMIM disease code lookup file
    #[arg(long, default_value = "omim.txt")]
    omim: PathBuf,

    /// Prefix of the lab, consensus and comments tables
    #[arg(long, default_value = DEFAULT_TABLE_PREFIX)]
    table_prefix: String,
}

// Single-threaded: every remote call completes before the next one starts
#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "vkgl_consensus=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    match run(args).await {
        Ok(()) => Ok(()),
        Err(e) => {
            error!("Consensus refresh failed: {:#}", e);
            Err(e)
        }
    }
}

async fn run(args: Args) -> Result<()> {
    let file_config = match &args.config {
        Some(path) => PartialConfig::from_file(path)?,
        None => PartialConfig::default(),
    };

    // Load password from file if MOLGENIS_PASSWORD_FILE is set
    let password = match args.password {
        Some(password) => Some(password),
        None => match std::env::var("MOLGENIS_PASSWORD_FILE") {
            Ok(file_path) => Some(
                std::fs::read_to_string(&file_path)
                    .with_context(|| format!("Failed to read MOLGENIS_PASSWORD_FILE {}", file_path))?
                    .trim()
                    .to_string(),
            ),
            Err(_) => None,
        },
    };

    let config = file_config
        .merge(PartialConfig {
            labs: args.labs,
            url: args.url,
            account: args.account,
            password,
        })
        .build()
        .context("Invalid configuration")?;

    info!("Configuration loaded: {:?}", config);

    let diseases = DiseaseLookup::from_path(&args.omim)
        .with_context(|| format!("Failed to load disease lookup {:?}", args.omim))?;

    let client = MolgenisClient::login(&config.url, &config.account, &config.password)
        .await
        .context("Failed to log in to MOLGENIS")?;

    let refresher = SnapshotRefresher::new(
        &client,
        TableNames::new(args.table_prefix),
        config.labs.clone(),
        &diseases,
    );
    let report = refresher.refresh().await?;

    info!(
        "Consensus refresh complete: {}",
        serde_json::to_string(&report).context("Failed to serialize refresh report")?
    );
    Ok(())
}
