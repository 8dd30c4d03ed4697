//! Page-load sequence for the badge enhancer
//!
//! This module ties the cache, the badge API and the renderer together. One
//! call to `App::load_page` walks a page through its states: parse the app id
//! from the URL, wait for the anchor, resolve data from the cache or the API,
//! render. Every failure ends the sequence with a logged `Abort`; nothing is
//! retried and nothing propagates past the page load.

use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::cache::BadgeCache;
use crate::data::{AppId, BadgeRecord, BadgeSource, FetchError};
use crate::page::Page;
use crate::ui::{BadgeGrid, FOIL_STYLE};

/// Path segment that precedes the app id in game cards URLs
pub const GAMECARDS_SEGMENT: &str = "gamecards";

/// Where the page load currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadState {
    ParseIdentifier,
    AwaitAnchor,
    ResolveData,
    Fetch,
    Render,
    Done,
}

/// Where the rendered badges came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Remote,
}

/// Why a page load ended without rendering
#[derive(Debug, thiserror::Error)]
pub enum Abort {
    #[error("Could not extract an app id from the URL")]
    MissingIdentifier,

    #[error("No badge data found for this app")]
    NoBadges,

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Insertion point disappeared before rendering")]
    AnchorMissing,
}

/// How a page load ended
#[derive(Debug)]
pub enum Outcome {
    Rendered {
        app_id: AppId,
        source: Source,
        count: usize,
    },
    Aborted(Abort),
}

/// Result of one page load
///
/// The cache write scheduled after a remote fetch runs on its own task and is
/// not part of the outcome. A short-lived host can `finish` the load to let
/// that write land before exiting.
#[derive(Debug)]
pub struct PageLoad {
    pub outcome: Outcome,
    pub pending_write: Option<JoinHandle<()>>,
}

impl PageLoad {
    fn aborted(abort: Abort) -> Self {
        Self {
            outcome: Outcome::Aborted(abort),
            pending_write: None,
        }
    }

    /// Waits for the background cache write, if any, and returns the outcome
    pub async fn finish(self) -> Outcome {
        if let Some(write) = self.pending_write {
            if let Err(e) = write.await {
                error!(error = %e, "cache write task failed");
            }
        }
        self.outcome
    }
}

/// Extracts the app id from a game cards URL or path
///
/// The app id is the segment right after the first `gamecards` segment. As
/// with `parseInt`, leading digits are taken and anything after them is
/// ignored, so `/gamecards/440abc` yields 440.
pub fn parse_app_id(url: &str) -> Option<AppId> {
    let path = match reqwest::Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.to_string(),
    };

    let mut segments = path.split('/');
    segments.find(|s| *s == GAMECARDS_SEGMENT)?;
    let segment = segments.next()?;

    let digits: String = segment.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

/// Drives page loads
pub struct App<S> {
    /// Current state of the most recent page load
    pub state: LoadState,
    cache: Option<BadgeCache>,
    source: S,
    grid: BadgeGrid,
}

impl<S: BadgeSource> App<S> {
    /// Creates an App; without a cache every load goes to the API
    pub fn new(cache: Option<BadgeCache>, source: S, grid: BadgeGrid) -> Self {
        Self {
            state: LoadState::ParseIdentifier,
            cache,
            source,
            grid,
        }
    }

    /// Runs the full sequence for the page at `url`
    ///
    /// Waits for the anchor without a deadline; the host decides how long a
    /// page may take to appear.
    pub async fn load_page(&mut self, page: &impl Page, url: &str) -> PageLoad {
        page.inject_style(FOIL_STYLE);

        self.state = LoadState::ParseIdentifier;
        let Some(app_id) = parse_app_id(url) else {
            error!(url, "could not extract app id from the URL");
            self.state = LoadState::Done;
            return PageLoad::aborted(Abort::MissingIdentifier);
        };

        self.state = LoadState::AwaitAnchor;
        debug!(app_id, selector = %self.grid.anchor(), "waiting for insertion point");
        page.wait_for(self.grid.anchor()).await;

        let load = self.resolve(page, app_id).await;
        self.state = LoadState::Done;
        load
    }

    /// Cache lookup, then fetch on a miss, then render
    async fn resolve(&mut self, page: &impl Page, app_id: AppId) -> PageLoad {
        self.state = LoadState::ResolveData;
        let cached = match &self.cache {
            Some(cache) => cache.get(app_id).await,
            None => None,
        };

        if let Some(badges) = cached {
            info!(app_id, "using cached badge data");
            return PageLoad {
                outcome: self.render(page, &badges, app_id, Source::Cache),
                pending_write: None,
            };
        }

        info!(app_id, "cached data not found or stale, fetching from API");
        self.state = LoadState::Fetch;
        let badges = match self.source.fetch_badges(app_id).await {
            Ok(badges) if badges.is_empty() => {
                info!(app_id, "no badge data found for this app");
                return PageLoad::aborted(Abort::NoBadges);
            }
            Ok(badges) => badges,
            Err(e) => {
                error!(app_id, error = %e, "badge fetch failed");
                return PageLoad::aborted(e.into());
            }
        };

        info!(app_id, count = badges.len(), "fetched badge data");
        let outcome = self.render(page, &badges, app_id, Source::Remote);
        let pending_write = self.schedule_write(app_id, badges);

        PageLoad {
            outcome,
            pending_write,
        }
    }

    fn render(
        &mut self,
        page: &impl Page,
        badges: &[BadgeRecord],
        app_id: AppId,
        source: Source,
    ) -> Outcome {
        self.state = LoadState::Render;
        if self.grid.display(page, badges, app_id) {
            Outcome::Rendered {
                app_id,
                source,
                count: badges.len(),
            }
        } else {
            Outcome::Aborted(Abort::AnchorMissing)
        }
    }

    fn schedule_write(&self, app_id: AppId, badges: Vec<BadgeRecord>) -> Option<JoinHandle<()>> {
        let Some(cache) = self.cache.clone() else {
            warn!(app_id, "no cache configured, skipping write");
            return None;
        };
        debug!(app_id, "scheduling cache write");
        Some(tokio::spawn(async move { cache.put(app_id, badges).await }))
    }
}
