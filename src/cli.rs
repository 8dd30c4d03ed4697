//! Command-line interface parsing for the badge enhancer
//!
//! This module handles parsing of CLI arguments using clap and turns them into
//! the runtime `Config`. Every option can also be set through an environment
//! variable, which is how the API key is normally supplied.

use std::path::PathBuf;

use clap::Parser;
use thiserror::Error;

use crate::cache::DEFAULT_TTL_HOURS;
use crate::data::steamsets::DEFAULT_ENDPOINT;
use crate::page::{Selector, SelectorError};
use crate::ui::{DEFAULT_ANCHOR_SELECTOR, DEFAULT_IMAGE_BASE};

/// Error types for CLI argument validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The anchor selector could not be parsed
    #[error("Invalid anchor selector '{selector}': {source}")]
    InvalidAnchor {
        selector: String,
        #[source]
        source: SelectorError,
    },

    /// The endpoint is not an absolute URL
    #[error("Invalid endpoint URL: '{0}'")]
    InvalidEndpoint(String),
}

/// Card Badge - show every badge of a game on its Steam game cards page
#[derive(Parser, Debug)]
#[command(name = "cardbadge")]
#[command(about = "Render badge artwork for a Steam game cards page")]
#[command(version)]
pub struct Cli {
    /// Game cards page URL, e.g. https://steamcommunity.com/id/me/gamecards/440/
    #[arg(value_name = "URL")]
    pub url: String,

    /// Bearer key for the SteamSets API
    #[arg(long, env = "CARDBADGE_API_KEY", default_value = "", hide_env_values = true)]
    pub api_key: String,

    /// Badge list endpoint
    #[arg(long, env = "CARDBADGE_ENDPOINT", default_value = DEFAULT_ENDPOINT)]
    pub endpoint: String,

    /// Base URL of the badge artwork CDN
    #[arg(long, env = "CARDBADGE_IMAGE_BASE", default_value = DEFAULT_IMAGE_BASE)]
    pub image_base: String,

    /// CSS selector of the element the badges are inserted after
    #[arg(long, env = "CARDBADGE_ANCHOR", default_value = DEFAULT_ANCHOR_SELECTOR)]
    pub anchor: String,

    /// Cache directory (defaults to the XDG cache directory)
    #[arg(long, env = "CARDBADGE_CACHE_DIR", value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Hours a cached badge list stays fresh
    #[arg(long, env = "CARDBADGE_TTL_HOURS", default_value_t = DEFAULT_TTL_HOURS)]
    pub ttl_hours: u64,

    /// Write the rendered page to a file instead of stdout
    #[arg(long, short, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, env = "CARDBADGE_LOG_LEVEL", default_value = "warn")]
    pub log_level: String,
}

/// Runtime configuration derived from CLI arguments
#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub api_key: String,
    pub endpoint: String,
    pub image_base: String,
    pub anchor: Selector,
    pub cache_dir: Option<PathBuf>,
    pub ttl: chrono::Duration,
    pub output: Option<PathBuf>,
    pub log_level: String,
}

impl Config {
    /// Validates parsed CLI arguments into a Config.
    ///
    /// # Returns
    /// * `Ok(Config)` with appropriate settings
    /// * `Err(CliError)` if the anchor selector or endpoint is malformed
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let anchor = Selector::parse(&cli.anchor).map_err(|source| CliError::InvalidAnchor {
            selector: cli.anchor.clone(),
            source,
        })?;

        if reqwest::Url::parse(&cli.endpoint).is_err() {
            return Err(CliError::InvalidEndpoint(cli.endpoint.clone()));
        }

        Ok(Config {
            url: cli.url.clone(),
            api_key: cli.api_key.clone(),
            endpoint: cli.endpoint.clone(),
            image_base: cli.image_base.clone(),
            anchor,
            cache_dir: cli.cache_dir.clone(),
            ttl: chrono::Duration::hours(cli.ttl_hours.min(i64::MAX as u64 / 3_600_000) as i64),
            output: cli.output.clone(),
            log_level: cli.log_level.clone(),
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}
