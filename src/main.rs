//! Card Badge - show every badge of a game on its Steam game cards page
//!
//! Renders a game cards page with the game's full badge set inserted after the
//! card row, using cached badge data when it is fresh and the SteamSets API
//! otherwise.

use std::process;

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cardbadge::app::{App, Outcome, Source};
use cardbadge::cache::BadgeCache;
use cardbadge::cli::{Cli, Config};
use cardbadge::data::SteamSetsClient;
use cardbadge::page::skeleton::game_cards_page;
use cardbadge::page::Page;
use cardbadge::ui::BadgeGrid;

/// Sets up logging to stderr so stdout only carries the rendered page
fn init_logging(config: &Config) {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = match Config::from_cli(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(2);
        }
    };

    init_logging(&config);

    if !config.has_api_key() {
        warn!("No API key configured (CARDBADGE_API_KEY); the badge API will likely reject requests");
    }

    let cache = config
        .cache_dir
        .clone()
        .or_else(BadgeCache::default_dir)
        .map(|dir| BadgeCache::with_ttl(dir, config.ttl));
    match &cache {
        Some(cache) => info!(path = %cache.root().display(), "using badge cache"),
        None => warn!("no cache directory available, every run will hit the API"),
    }

    let client = SteamSetsClient::new(config.api_key.clone()).with_endpoint(config.endpoint.clone());
    let grid = BadgeGrid::new(config.anchor.clone()).with_image_base(config.image_base.clone());

    // The replica page is complete before the load starts, so an anchor that
    // is missing now would never appear.
    let page = game_cards_page();
    if page.query(&config.anchor).is_none() {
        eprintln!(
            "Error: no element matches the anchor selector '{}'",
            config.anchor
        );
        process::exit(1);
    }

    let mut app = App::new(cache, client, grid);
    let outcome = app.load_page(&page, &config.url).await.finish().await;

    match outcome {
        Outcome::Rendered {
            app_id,
            source,
            count,
        } => {
            let from = match source {
                Source::Cache => "cache",
                Source::Remote => "API",
            };
            info!(app_id, count, from, "rendered badge grid");

            let html = page.to_html();
            match &config.output {
                Some(path) => std::fs::write(path, html)?,
                None => print!("{}", html),
            }
            Ok(())
        }
        Outcome::Aborted(abort) => {
            error!(error = %abort, "page load aborted");
            eprintln!("Error: {}", abort);
            process::exit(1);
        }
    }
}
