//! Command-line interface

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Sync LinkedIn recommendations into Contentful testimonials
#[derive(Parser, Debug, Clone)]
#[command(name = "tsync")]
#[command(about = "Sync LinkedIn recommendations into Contentful testimonials", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// TOML config file (default: $TSYNC_CONFIG, then the platform config dir)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Path to .env file (optional)
    #[arg(long, global = true, env = "DOTENV_PATH", default_value = ".env")]
    pub env_file: PathBuf,

    /// Contentful space id (overrides CONTENTFUL_SPACE_ID)
    #[arg(long, global = true)]
    pub space_id: Option<String>,

    /// Contentful management token (overrides CONTENTFUL_CMA_TOKEN)
    #[arg(long, global = true)]
    pub cma_token: Option<String>,

    /// Contentful environment (default: master)
    #[arg(long, global = true)]
    pub environment: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Scrape LinkedIn recommendations and sync them to Contentful
    Scrape(ScrapeArgs),

    /// List the testimonials currently stored in Contentful
    List,
}

#[derive(clap::Args, Debug, Clone, PartialEq, Eq)]
pub struct ScrapeArgs {
    /// LinkedIn public profile identifier (e.g. janedoe)
    #[arg(long)]
    pub profile: String,

    /// Translate new quotes to English using Gemini
    #[arg(long)]
    pub translate: bool,

    /// Replace all existing testimonials instead of merging
    #[arg(long)]
    pub force: bool,

    /// LinkedIn `li_at` session cookie (overrides LINKEDIN_COOKIE)
    #[arg(long)]
    pub linkedin_cookie: Option<String>,

    /// Gemini API key (overrides GEMINI_API_KEY)
    #[arg(long)]
    pub gemini_api_key: Option<String>,

    /// Gemini model (overrides GEMINI_MODEL)
    #[arg(long)]
    pub gemini_model: Option<String>,
}
