//! Cache module for persisting fetched badge lists
//!
//! This module provides a versioned on-disk store with one record per app and
//! a cache manager on top of it that applies a fixed time-to-live. Storage
//! failures never propagate: a broken cache behaves like an empty one.

mod manager;
mod store;

pub use manager::{BadgeCache, DEFAULT_TTL_HOURS};
pub use store::{CacheEntry, StoreError, StoreHandle, SCHEMA_VERSION, TABLE_NAME};
