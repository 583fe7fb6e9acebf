//! tsync - Main entry point
//!
//! `tsync scrape` syncs LinkedIn recommendations into the Contentful
//! testimonials section; `tsync list` prints what is stored.

use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use tsync::cli::{Cli, Command};
use tsync::config::{log_level, RunConfig};
use tsync::services::{ContentfulClient, GeminiClient, LinkedInClient};
use tsync::workflow::{fetch_testimonials, format_testimonials, SyncOutcome, SyncWorkflow};
use tsync::{SyncError, SyncResult};
use tsync_common::config::{load_toml_config, resolve_config_path, TomlConfig};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load .env file if it exists
    if cli.env_file.exists() {
        dotenvy::from_path(&cli.env_file)
            .with_context(|| format!("Failed to load {}", cli.env_file.display()))?;
    }

    let toml_config = load_config(&cli)?;

    let level = log_level(cli.verbose, &toml_config);
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("warn,tsync={0},tsync_common={0}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = RunConfig::resolve(&cli, &toml_config).context("Invalid configuration")?;

    let store = ContentfulClient::new(&config.store.space_id, &config.store.cma_token)
        .context("Failed to create Contentful client")?
        .with_environment(&config.store.environment);

    match cli.command {
        Command::Scrape(_) => run_scrape(&config, &store).await,
        Command::List => run_list(&config, &store).await,
    }
}

/// Load the TOML file before the subscriber exists, still surfacing warnings
fn load_config(cli: &Cli) -> Result<TomlConfig> {
    let path = resolve_config_path(cli.config.as_deref());
    let bootstrap = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::WARN)
        .finish();

    tracing::subscriber::with_default(bootstrap, || load_toml_config(path.as_deref()))
        .context("Failed to load config file")
}

/// Bound a run by its configured time limit
async fn bounded<T>(limit: Duration, run: impl Future<Output = SyncResult<T>>) -> SyncResult<T> {
    tokio::time::timeout(limit, run)
        .await
        .map_err(|_| SyncError::Timeout(limit.as_secs()))?
}

async fn run_scrape(config: &RunConfig, store: &ContentfulClient) -> Result<()> {
    let (Some(scrape), Some(options)) = (config.scrape.as_ref(), config.sync_options()) else {
        anyhow::bail!("scrape settings were not resolved");
    };

    let source = LinkedInClient::new(&scrape.linkedin_cookie).context("Failed to create LinkedIn client")?;
    let translator = match &scrape.translator {
        Some(settings) => Some(
            GeminiClient::new(&settings.api_key)
                .context("Failed to create Gemini client")?
                .with_model(&settings.model),
        ),
        None => None,
    };

    let mut workflow = SyncWorkflow::new(store, store, &source);
    if let Some(translator) = &translator {
        info!(model = %translator.model(), "Translation enabled");
        workflow = workflow.with_translator(translator);
    }

    let report = bounded(config.scrape_timeout, workflow.run(&options))
        .await
        .context("Sync failed")?;

    match report.outcome {
        SyncOutcome::Synced => info!(
            total = report.total,
            new = report.newly_added,
            skipped_duplicates = report.skipped_duplicates,
            skipped_invalid = report.skipped_invalid,
            "Sync complete"
        ),
        SyncOutcome::UpToDate => info!(total = report.total, "Already up to date"),
        SyncOutcome::NothingScraped => info!("Nothing scraped, store left untouched"),
    }

    Ok(())
}

async fn run_list(config: &RunConfig, store: &ContentfulClient) -> Result<()> {
    let testimonials = bounded(config.list_timeout, fetch_testimonials(store))
        .await
        .context("Failed to fetch testimonials")?;

    print!("{}", format_testimonials(&testimonials));
    Ok(())
}
