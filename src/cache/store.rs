//! Versioned on-disk table of badge records
//!
//! The store is a directory holding a `schema_version` file and one table
//! directory with a JSON file per app. Opening the store brings the on-disk
//! schema up to `SCHEMA_VERSION` by running each pending migration in order.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::data::{AppId, BadgeRecord};

/// Schema version this build writes
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the table directory holding one record per app
pub const TABLE_NAME: &str = "game_card_badges";

const VERSION_FILE: &str = "schema_version";

/// Suffix counter keeping temp file names unique within this process
static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// A migration brings the store at `root` from `version - 1` to `version`
struct Migration {
    version: u32,
    apply: fn(&Path) -> io::Result<()>,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    apply: create_badge_table,
}];

fn create_badge_table(root: &Path) -> io::Result<()> {
    std::fs::create_dir_all(root.join(TABLE_NAME))
}

/// Errors raised by the on-disk store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Store I/O failed: {0}")]
    Io(#[from] io::Error),

    #[error("Corrupt record: {0}")]
    Corrupt(#[from] serde_json::Error),

    #[error("Store schema version {found} is newer than supported version {supported}")]
    Downgrade { found: u32, supported: u32 },
}

/// Persisted wrapper around the badge list of one app
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Primary key
    #[serde(rename = "appId")]
    pub app_id: AppId,
    /// Badges as fetched
    #[serde(rename = "data")]
    pub badges: Vec<BadgeRecord>,
    /// When the entry was last written
    #[serde(rename = "timestamp")]
    pub written_at: DateTime<Utc>,
}

/// Handle to an opened, migrated store
#[derive(Debug)]
pub struct StoreHandle {
    root: PathBuf,
}

impl StoreHandle {
    /// Opens the store at `root`, creating and migrating it as needed
    pub async fn open(root: &Path) -> Result<Self, StoreError> {
        fs::create_dir_all(root).await?;

        let found = read_version(root).await?;
        if found > SCHEMA_VERSION {
            return Err(StoreError::Downgrade {
                found,
                supported: SCHEMA_VERSION,
            });
        }

        if found < SCHEMA_VERSION {
            info!(from = found, to = SCHEMA_VERSION, path = %root.display(), "upgrading badge store");
            for migration in MIGRATIONS.iter().filter(|m| m.version > found) {
                let path = root.to_path_buf();
                let apply = migration.apply;
                tokio::task::spawn_blocking(move || apply(&path))
                    .await
                    .map_err(io::Error::other)??;
                debug!(version = migration.version, "applied store migration");
            }
            fs::write(root.join(VERSION_FILE), SCHEMA_VERSION.to_string()).await?;
        }

        info!(path = %root.display(), "badge store opened");
        Ok(Self {
            root: root.to_path_buf(),
        })
    }

    fn record_path(&self, app_id: AppId) -> PathBuf {
        self.root.join(TABLE_NAME).join(format!("{}.json", app_id))
    }

    /// Reads the entry for `app_id`, if one exists
    pub async fn get(&self, app_id: AppId) -> Result<Option<CacheEntry>, StoreError> {
        let content = match fs::read_to_string(self.record_path(app_id)).await {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_str(&content)?))
    }

    /// Inserts or replaces the entry keyed by `entry.app_id`
    ///
    /// Each write goes to its own temp file, so overlapping writers for one
    /// app never share a partial file. The last rename wins.
    pub async fn put(&self, entry: &CacheEntry) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(entry)?;
        let path = self.record_path(entry.app_id);
        let tmp = path.with_extension(format!(
            "json.{}.{}.tmp",
            std::process::id(),
            TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
        ));

        let written = match fs::write(&tmp, json).await {
            Ok(()) => fs::rename(&tmp, &path).await,
            Err(e) => Err(e),
        };
        if let Err(e) = written {
            let _ = fs::remove_file(&tmp).await;
            return Err(e.into());
        }
        Ok(())
    }
}

/// Reads the on-disk schema version; a missing or unreadable marker is 0
///
/// Migrations are idempotent, so a damaged marker is repaired by running
/// them all again.
async fn read_version(root: &Path) -> Result<u32, StoreError> {
    let content = match fs::read_to_string(root.join(VERSION_FILE)).await {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
        Err(e) => return Err(e.into()),
    };

    match content.trim().parse::<u32>() {
        Ok(version) => Ok(version),
        Err(e) => {
            warn!(path = %root.display(), error = %e, "unreadable schema version, re-running migrations");
            Ok(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Scarcity;
    use tempfile::TempDir;

    fn entry(app_id: AppId, name: &str) -> CacheEntry {
        CacheEntry {
            app_id,
            badges: vec![BadgeRecord {
                name: name.to_string(),
                is_foil: false,
                base_level: Some(1),
                scarcity: Scarcity::Count(10),
                badge_image: "img.png".to_string(),
            }],
            written_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_open_creates_table_and_version() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let root = temp_dir.path().join("store");

        StoreHandle::open(&root).await.expect("Open should succeed");

        assert!(root.join(TABLE_NAME).is_dir());
        let version = std::fs::read_to_string(root.join(VERSION_FILE)).unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
    }

    #[tokio::test]
    async fn test_reopen_keeps_existing_rows() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");

        let store = StoreHandle::open(temp_dir.path()).await.unwrap();
        store.put(&entry(440, "kept")).await.unwrap();
        drop(store);

        let store = StoreHandle::open(temp_dir.path()).await.unwrap();
        let found = store.get(440).await.unwrap().expect("Row should survive reopen");
        assert_eq!(found.badges[0].name, "kept");
    }

    #[tokio::test]
    async fn test_open_rejects_newer_schema() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join(VERSION_FILE), "99").unwrap();

        let err = StoreHandle::open(temp_dir.path()).await.unwrap_err();
        assert!(matches!(err, StoreError::Downgrade { found: 99, .. }));
    }

    #[tokio::test]
    async fn test_get_missing_row_is_none() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = StoreHandle::open(temp_dir.path()).await.unwrap();

        assert!(store.get(1).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_overwrites_row() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = StoreHandle::open(temp_dir.path()).await.unwrap();

        store.put(&entry(730, "first")).await.unwrap();
        store.put(&entry(730, "second")).await.unwrap();

        let found = store.get(730).await.unwrap().unwrap();
        assert_eq!(found.badges[0].name, "second");
        assert_eq!(table_files(temp_dir.path()), vec!["730.json".to_string()]);
    }

    fn table_files(root: &Path) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(root.join(TABLE_NAME))
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_puts_for_one_app_all_succeed() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = std::sync::Arc::new(StoreHandle::open(temp_dir.path()).await.unwrap());

        for round in 0..20 {
            let mut writers = Vec::new();
            for i in 0..8 {
                let store = store.clone();
                let mut row = entry(7, &format!("round {} writer {}", round, i));
                // Alternate large and small bodies so writes overlap unevenly
                if i % 2 == 0 {
                    row.badges = vec![row.badges[0].clone(); 500];
                }
                writers.push(tokio::spawn(async move { store.put(&row).await }));
            }
            for writer in writers {
                writer.await.unwrap().expect("Every put should succeed");
            }

            let found = store.get(7).await.unwrap().expect("Row should exist");
            assert!(found.badges[0].name.starts_with(&format!("round {} ", round)));
        }

        assert_eq!(table_files(temp_dir.path()), vec!["7.json".to_string()]);
    }

    #[tokio::test]
    async fn test_open_repairs_unreadable_version_file() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        std::fs::write(temp_dir.path().join(VERSION_FILE), "\u{0}garbage").unwrap();

        let store = StoreHandle::open(temp_dir.path())
            .await
            .expect("Damaged version marker should not block the store");
        store.put(&entry(440, "healed")).await.unwrap();

        let version = std::fs::read_to_string(temp_dir.path().join(VERSION_FILE)).unwrap();
        assert_eq!(version, SCHEMA_VERSION.to_string());
        assert_eq!(store.get(440).await.unwrap().unwrap().badges[0].name, "healed");
    }

    #[tokio::test]
    async fn test_record_uses_stored_field_names() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = StoreHandle::open(temp_dir.path()).await.unwrap();
        store.put(&entry(570, "named")).await.unwrap();

        let raw =
            std::fs::read_to_string(temp_dir.path().join(TABLE_NAME).join("570.json")).unwrap();
        assert!(raw.contains("\"appId\": 570"));
        assert!(raw.contains("\"data\""));
        assert!(raw.contains("\"timestamp\""));
    }

    #[tokio::test]
    async fn test_corrupt_row_is_an_error() {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = StoreHandle::open(temp_dir.path()).await.unwrap();
        std::fs::write(temp_dir.path().join(TABLE_NAME).join("5.json"), "{not json").unwrap();

        assert!(matches!(store.get(5).await, Err(StoreError::Corrupt(_))));
    }
}
