//! Badge grid renderer
//!
//! Builds the badge grid as an element tree and places it right after the
//! anchor element: a spacer, the grid container, another spacer. Anything a
//! previous render left behind the anchor is removed first.

use tracing::{debug, error};

use crate::data::{sort_badges, AppId, BadgeRecord};
use crate::page::{Element, Page, Selector};

/// Element the grid is inserted after on Steam game cards pages
pub const DEFAULT_ANCHOR_SELECTOR: &str = "#responsive_page_template_content > div.pagecontent > div.maincontent > div > div.badge_row_inner > div:nth-child(5)";

/// Base URL badge artwork is served from
pub const DEFAULT_IMAGE_BASE: &str =
    "https://cdn.fastly.steamstatic.com/steamcommunity/public/images/items";

pub const CONTAINER_CLASS: &str = "steam-badge-container";
pub const SPACER_CLASS: &str = "game_cards_clear";
pub const ITEM_CLASS: &str = "steam-badge-item";
pub const FOIL_CLASS: &str = "foil";

/// Renders badge lists into a page at a fixed anchor
#[derive(Debug, Clone)]
pub struct BadgeGrid {
    anchor: Selector,
    image_base: String,
}

impl BadgeGrid {
    pub fn new(anchor: Selector) -> Self {
        Self {
            anchor,
            image_base: DEFAULT_IMAGE_BASE.to_string(),
        }
    }

    pub fn with_image_base(mut self, image_base: impl Into<String>) -> Self {
        self.image_base = image_base.into();
        self
    }

    pub fn anchor(&self) -> &Selector {
        &self.anchor
    }

    /// `<image base>/<app id>/<badge image>`
    pub fn image_url(&self, app_id: AppId, badge: &BadgeRecord) -> String {
        format!(
            "{}/{}/{}",
            self.image_base.trim_end_matches('/'),
            app_id,
            badge.badge_image
        )
    }

    /// Builds the grid container holding one item per badge, in display order
    pub fn build(&self, badges: &[BadgeRecord], app_id: AppId) -> Element {
        let mut sorted = badges.to_vec();
        sort_badges(&mut sorted);

        sorted.iter().fold(
            Element::new("div")
                .class(CONTAINER_CLASS)
                .style("margin-top", "20px")
                .style("width", "1000px")
                .style("margin-left", "30px")
                .style("box-sizing", "border-box")
                .style("display", "flex")
                .style("flex-wrap", "wrap")
                .style("gap", "20px"),
            |container, badge| container.child(self.badge_item(badge, app_id)),
        )
    }

    fn badge_item(&self, badge: &BadgeRecord, app_id: AppId) -> Element {
        let mut item = Element::new("div")
            .class(ITEM_CLASS)
            .style("text-align", "center")
            .style("vertical-align", "top")
            .style("flex", "0 0 auto")
            .style("width", "120px")
            .style("padding", "5px")
            .style("border-radius", "5px");

        // Foil background comes from the stylesheet.
        item = if badge.is_foil {
            item.class(FOIL_CLASS)
        } else {
            item.style("background-color", "#1a1a1a")
        };

        let level = Element::new("div")
            .text(badge.level_label())
            .style("font-weight", "bold")
            .style("color", if badge.is_foil { "gold" } else { "#ccc" });

        let name = Element::new("div")
            .text(badge.name.clone())
            .style("font-weight", "normal")
            .style("font-size", "0.9em")
            .style("white-space", "nowrap")
            .style("overflow", "hidden")
            .style("text-overflow", "ellipsis")
            .style("color", "#ccc");

        let image = Element::new("img")
            .attr("src", self.image_url(app_id, badge))
            .attr("alt", badge.name.clone())
            .style("max-width", "100px")
            .style("height", "auto")
            .style("display", "block")
            .style("margin", "5px auto");

        let scarcity = Element::new("div")
            .text(format!("Scarcity: {}", badge.scarcity))
            .style("font-size", "0.8em")
            .style("color", "#888");

        item.child(level).child(name).child(image).child(scarcity)
    }

    /// Inserts the grid after the anchor, replacing an earlier render
    ///
    /// # Returns
    /// * `true` if the grid was inserted
    /// * `false` if the anchor is missing or detached; the page is left as is
    pub fn display(&self, page: &impl Page, badges: &[BadgeRecord], app_id: AppId) -> bool {
        let Some(anchor) = page.query(&self.anchor) else {
            error!(selector = %self.anchor, "could not find the insertion point element");
            return false;
        };

        let mut removed = 0;
        while let Some(next) = page.next_element_sibling(anchor) {
            if !(page.has_class(next, SPACER_CLASS) || page.has_class(next, CONTAINER_CLASS)) {
                break;
            }
            page.remove(next);
            removed += 1;
        }
        if removed > 0 {
            debug!(removed, "removed previous badge grid");
        }

        let Some(before) = page.insert_after(anchor, spacer()) else {
            error!(selector = %self.anchor, "insertion point has no parent element");
            return false;
        };
        let container = page
            .insert_after(before, self.build(badges, app_id))
            .and_then(|container| page.insert_after(container, spacer()));

        debug!(app_id, count = badges.len(), "displayed badges");
        container.is_some()
    }
}

fn spacer() -> Element {
    Element::new("div")
        .class(SPACER_CLASS)
        .style("clear", "both")
}
