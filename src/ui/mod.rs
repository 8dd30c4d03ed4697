//! UI rendering module for the badge enhancer
//!
//! Contains the badge grid renderer and the stylesheet that decorates foils.

mod badge_grid;
mod style;

pub use badge_grid::{
    BadgeGrid, CONTAINER_CLASS, DEFAULT_ANCHOR_SELECTOR, DEFAULT_IMAGE_BASE, FOIL_CLASS,
    ITEM_CLASS, SPACER_CLASS,
};
pub use style::FOIL_STYLE;
