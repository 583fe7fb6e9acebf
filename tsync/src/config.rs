//! Run configuration
//!
//! Built once per invocation from the command line, the environment and the
//! TOML file, then passed by reference into the workflow. Secrets resolve
//! through [`resolve_setting`] so a value present in several places is
//! reported.
//!
//! **Priority:** CLI → ENV → TOML → default

use std::time::Duration;
use tracing::info;
use tsync_common::build_log::TriggeredBy;
use tsync_common::config::{resolve_setting, TomlConfig};
use tsync_common::SyncMode;

use crate::cli::{Cli, Command, ScrapeArgs};
use crate::error::{SyncError, SyncResult};
use crate::services::contentful_client::DEFAULT_ENVIRONMENT;
use crate::services::gemini_client::DEFAULT_MODEL;
use crate::workflow::SyncOptions;

pub const ENV_SPACE_ID: &str = "CONTENTFUL_SPACE_ID";
pub const ENV_CMA_TOKEN: &str = "CONTENTFUL_CMA_TOKEN";
pub const ENV_LINKEDIN_COOKIE: &str = "LINKEDIN_COOKIE";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";
pub const ENV_GEMINI_MODEL: &str = "GEMINI_MODEL";
pub const ENV_GITHUB_ACTIONS: &str = "GITHUB_ACTIONS";

/// Contentful credentials
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreSettings {
    pub space_id: String,
    pub cma_token: String,
    pub environment: String,
}

/// Gemini settings, present only when translation was requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslatorSettings {
    pub api_key: String,
    pub model: String,
}

/// Settings specific to `scrape`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapeSettings {
    pub profile: String,
    pub mode: SyncMode,
    pub linkedin_cookie: String,
    pub translator: Option<TranslatorSettings>,
}

/// Everything one invocation needs
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub store: StoreSettings,
    /// `None` for `list`
    pub scrape: Option<ScrapeSettings>,
    pub triggered_by: TriggeredBy,
    pub scrape_timeout: Duration,
    pub list_timeout: Duration,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// Resolve a required setting or explain where it can be supplied
fn require(
    name: &str,
    flag: &str,
    env_name: &str,
    toml_key: &str,
    cli: Option<&str>,
    toml: Option<&str>,
) -> SyncResult<String> {
    let env = env_var(env_name);
    match resolve_setting(name, cli, env.as_deref(), toml) {
        Some((value, source)) => {
            info!("{} loaded from {}", name, source.as_str());
            Ok(value)
        }
        None => Err(SyncError::Config(format!(
            "{} not configured. Set one of: {} flag, {} environment variable, {} in the TOML config",
            name, flag, env_name, toml_key
        ))),
    }
}

impl RunConfig {
    /// Resolve the configuration for the parsed command line
    pub fn resolve(cli: &Cli, toml: &TomlConfig) -> SyncResult<Self> {
        let store = StoreSettings {
            space_id: require(
                "Contentful space id",
                "--space-id",
                ENV_SPACE_ID,
                "contentful.space_id",
                cli.space_id.as_deref(),
                toml.contentful.space_id.as_deref(),
            )?,
            cma_token: require(
                "Contentful CMA token",
                "--cma-token",
                ENV_CMA_TOKEN,
                "contentful.cma_token",
                cli.cma_token.as_deref(),
                toml.contentful.cma_token.as_deref(),
            )?,
            environment: resolve_setting(
                "Contentful environment",
                cli.environment.as_deref(),
                None,
                toml.contentful.environment.as_deref(),
            )
            .map(|(value, _)| value)
            .unwrap_or_else(|| DEFAULT_ENVIRONMENT.to_string()),
        };

        let scrape = match &cli.command {
            Command::Scrape(args) => Some(Self::resolve_scrape(args, toml)?),
            Command::List => None,
        };

        Ok(Self {
            store,
            scrape,
            triggered_by: TriggeredBy::detect(env_var(ENV_GITHUB_ACTIONS).as_deref()),
            scrape_timeout: Duration::from_secs(toml.timeouts.scrape_secs),
            list_timeout: Duration::from_secs(toml.timeouts.list_secs),
        })
    }

    fn resolve_scrape(args: &ScrapeArgs, toml: &TomlConfig) -> SyncResult<ScrapeSettings> {
        let profile = args.profile.trim().to_string();
        if profile.is_empty() {
            return Err(SyncError::Config("--profile must not be empty".to_string()));
        }

        let linkedin_cookie = require(
            "LinkedIn session cookie",
            "--linkedin-cookie",
            ENV_LINKEDIN_COOKIE,
            "linkedin.cookie",
            args.linkedin_cookie.as_deref(),
            toml.linkedin.cookie.as_deref(),
        )?;

        let translator = if args.translate {
            let api_key = require(
                "Gemini API key",
                "--gemini-api-key",
                ENV_GEMINI_API_KEY,
                "gemini.api_key",
                args.gemini_api_key.as_deref(),
                toml.gemini.api_key.as_deref(),
            )?;
            let env_model = env_var(ENV_GEMINI_MODEL);
            let model = resolve_setting(
                "Gemini model",
                args.gemini_model.as_deref(),
                env_model.as_deref(),
                toml.gemini.model.as_deref(),
            )
            .map(|(value, _)| value)
            .unwrap_or_else(|| DEFAULT_MODEL.to_string());

            Some(TranslatorSettings { api_key, model })
        } else {
            None
        };

        Ok(ScrapeSettings {
            profile,
            mode: if args.force { SyncMode::Replace } else { SyncMode::Merge },
            linkedin_cookie,
            translator,
        })
    }

    /// Workflow options for a `scrape` run
    pub fn sync_options(&self) -> Option<SyncOptions> {
        self.scrape.as_ref().map(|scrape| SyncOptions {
            profile: scrape.profile.clone(),
            mode: scrape.mode,
            triggered_by: self.triggered_by,
        })
    }
}

/// Default log filter when `RUST_LOG` is unset
pub fn log_level(verbose: bool, toml: &TomlConfig) -> String {
    if verbose {
        "debug".to_string()
    } else {
        toml.logging.level.clone()
    }
}
