//! TTL cache of badge lists on top of the on-disk store
//!
//! Provides a `BadgeCache` that opens its store lazily on first use and never
//! lets a storage failure reach the caller: reads degrade to a miss and writes
//! are logged and dropped.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Duration, Utc};
use directories::ProjectDirs;
use tokio::sync::OnceCell;
use tracing::{debug, error, warn};

use super::store::{CacheEntry, StoreError, StoreHandle};
use crate::data::{AppId, BadgeRecord};

/// How long a cached badge list stays fresh
pub const DEFAULT_TTL_HOURS: u64 = 7 * 24;

#[derive(Debug)]
struct Inner {
    root: PathBuf,
    ttl: Duration,
    store: OnceCell<StoreHandle>,
    #[cfg(test)]
    opens: std::sync::atomic::AtomicUsize,
}

/// Badge list cache keyed by app id
///
/// Clones share one store handle. The store is opened on the first `get` or
/// `put`; callers that arrive while the open is in flight wait for that same
/// open instead of starting their own.
#[derive(Debug, Clone)]
pub struct BadgeCache {
    inner: Arc<Inner>,
}

impl BadgeCache {
    /// Creates a cache in the XDG cache directory (`~/.cache/cardbadge/` on Linux)
    ///
    /// Returns `None` if the cache directory cannot be determined.
    pub fn new() -> Option<Self> {
        Self::default_dir().map(Self::with_dir)
    }

    /// XDG cache directory for this application, if one can be determined
    pub fn default_dir() -> Option<PathBuf> {
        let project_dirs = ProjectDirs::from("", "", "cardbadge")?;
        Some(project_dirs.cache_dir().to_path_buf())
    }

    /// Creates a cache rooted at a specific directory with the default TTL
    pub fn with_dir(root: PathBuf) -> Self {
        Self::with_ttl(root, Duration::hours(DEFAULT_TTL_HOURS as i64))
    }

    /// Creates a cache rooted at `root` whose entries stay fresh for `ttl`
    pub fn with_ttl(root: PathBuf, ttl: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                root,
                ttl,
                store: OnceCell::new(),
                #[cfg(test)]
                opens: std::sync::atomic::AtomicUsize::new(0),
            }),
        }
    }

    pub fn root(&self) -> &Path {
        &self.inner.root
    }

    async fn store(&self) -> Result<&StoreHandle, StoreError> {
        self.inner
            .store
            .get_or_try_init(|| async {
                #[cfg(test)]
                self.inner
                    .opens
                    .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
                StoreHandle::open(&self.inner.root).await
            })
            .await
    }

    /// Returns the cached badges for `app_id` if they are younger than the TTL
    ///
    /// Stale entries are left on disk and reported as a miss. Any storage
    /// failure is logged and also reported as a miss.
    pub async fn get(&self, app_id: AppId) -> Option<Vec<BadgeRecord>> {
        let store = match self.store().await {
            Ok(store) => store,
            Err(e) => {
                warn!(app_id, error = %e, "badge store unavailable, treating as cache miss");
                return None;
            }
        };

        let entry = match store.get(app_id).await {
            Ok(Some(entry)) => entry,
            Ok(None) => {
                debug!(app_id, "no cached badges");
                return None;
            }
            Err(e) => {
                error!(app_id, error = %e, "failed to read cached badges");
                return None;
            }
        };

        let age = Utc::now() - entry.written_at;
        if age < self.inner.ttl {
            debug!(app_id, age_secs = age.num_seconds(), "found fresh cached badges");
            Some(entry.badges)
        } else {
            debug!(app_id, age_secs = age.num_seconds(), "cached badges are stale");
            None
        }
    }

    /// Stores `badges` for `app_id` stamped with the current time
    ///
    /// Failures are logged and swallowed.
    pub async fn put(&self, app_id: AppId, badges: Vec<BadgeRecord>) {
        let store = match self.store().await {
            Ok(store) => store,
            Err(e) => {
                warn!(app_id, error = %e, "badge store unavailable, dropping write");
                return;
            }
        };

        let entry = CacheEntry {
            app_id,
            badges,
            written_at: Utc::now(),
        };

        match store.put(&entry).await {
            Ok(()) => debug!(app_id, count = entry.badges.len(), "cached badge data"),
            Err(e) => error!(app_id, error = %e, "failed to cache badge data"),
        }
    }
}
