//! Core data models for the badge enhancer
//!
//! This module contains the badge records returned by the remote badge API
//! and the display ordering applied before rendering.

pub mod steamsets;

pub use steamsets::{BadgeSource, FetchError, SteamSetsClient};

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Numeric identifier of a game, taken from the page URL
pub type AppId = u32;

/// One badge of a game as issued by the remote badge API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BadgeRecord {
    /// Display name of the badge
    pub name: String,
    /// Whether this is the foil variant rather than a leveled badge
    pub is_foil: bool,
    /// Badge level, only meaningful for non-foil badges
    #[serde(default)]
    pub base_level: Option<u32>,
    /// How many of this badge exist
    #[serde(default)]
    pub scarcity: Scarcity,
    /// File name fragment of the badge artwork
    pub badge_image: String,
}

/// Rarity count as the API sends it
///
/// Usually a whole number, sometimes a string. Other numbers are kept as
/// given and a null or absent value becomes `Unknown`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Scarcity {
    Count(u64),
    Number(serde_json::Number),
    Text(String),
    #[default]
    Unknown,
}

impl fmt::Display for Scarcity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scarcity::Count(n) => write!(f, "{}", n),
            Scarcity::Number(n) => write!(f, "{}", n),
            Scarcity::Text(s) => f.write_str(s),
            Scarcity::Unknown => f.write_str("?"),
        }
    }
}

impl BadgeRecord {
    /// Label shown above the badge: "Foil" or "Level N"
    pub fn level_label(&self) -> String {
        match (self.is_foil, self.base_level) {
            (true, _) => "Foil".to_string(),
            (false, Some(level)) => format!("Level {}", level),
            (false, None) => "Level ?".to_string(),
        }
    }
}

/// Display order: leveled badges by ascending level, then foils.
///
/// Foils compare equal to each other, so they keep the order the API gave.
pub fn display_order(a: &BadgeRecord, b: &BadgeRecord) -> Ordering {
    match (a.is_foil, b.is_foil) {
        (false, false) => a
            .base_level
            .unwrap_or(0)
            .cmp(&b.base_level.unwrap_or(0)),
        (false, true) => Ordering::Less,
        (true, false) => Ordering::Greater,
        (true, true) => Ordering::Equal,
    }
}

/// Sorts badges into display order. The sort is stable.
pub fn sort_badges(badges: &mut [BadgeRecord]) {
    badges.sort_by(display_order);
}
