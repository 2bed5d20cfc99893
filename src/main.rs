//! `reviews` command-line entry point.

use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use reviews_browser::config::{load_settings, Settings, SettingsArgs};
use reviews_browser::repository::{AppRepository, ReviewRepository};
use reviews_browser::scheduler::{CleanupScheduler, PollingScheduler, Shutdown};
use reviews_browser::scrapers::{AppStoreClient, HttpClient};
use reviews_browser::server;
use reviews_browser::services::ReviewHarvester;

#[derive(Parser)]
#[command(name = "reviews", version, about = "Harvest and browse App Store reviews")]
struct Cli {
    #[command(flatten)]
    settings: SettingsArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the HTTP API
    Api,

    /// Run the polling and cleanup schedulers until Ctrl-C
    Schedulers,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let settings = load_settings(&cli.settings)
        .await
        .context("invalid configuration")?;

    match cli.command {
        Command::Api => server::serve(&settings).await,
        Command::Schedulers => run_schedulers(&settings).await,
    }
}

async fn run_schedulers(settings: &Settings) -> anyhow::Result<()> {
    let apps = AppRepository::open(&settings.apps_csv)
        .with_context(|| format!("failed to open {}", settings.apps_csv.display()))?;
    let reviews = ReviewRepository::open(&settings.reviews_csv, settings.recency_cutoff())
        .with_context(|| format!("failed to open {}", settings.reviews_csv.display()))?;

    let http = HttpClient::new(settings.request_timeout(), settings.user_agent.as_deref())
        .context("failed to build HTTP client")?;
    let client = AppStoreClient::new(http, settings.reviews_url_template.clone());
    let harvester = ReviewHarvester::new(Arc::new(client), reviews.clone());

    let shutdown = Shutdown::new();
    let polling = PollingScheduler::new(apps, harvester, shutdown.clone());
    let cleanup = CleanupScheduler::new(reviews, settings.cleanup_interval(), shutdown.clone());

    let count = polling.start().await.context("failed to load apps")?;
    if count == 0 {
        warn!(path = %settings.apps_csv.display(), "No apps to poll");
    }
    cleanup.start();

    info!("Schedulers running, press Ctrl-C to stop");
    tokio::signal::ctrl_c().await?;

    info!("Stopping schedulers");
    polling.stop().await;
    info!("Schedulers stopped");
    Ok(())
}
