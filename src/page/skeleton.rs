//! Replica of the Steam game cards page layout
//!
//! The CLI renders into this structure; it carries the element the default
//! anchor selector points at.

use super::{Element, MemoryPage};

/// Builds a game cards page with the badge row populated
pub fn game_cards_page() -> MemoryPage {
    let page = MemoryPage::new();
    page.append(
        page.head(),
        Element::new("title").text("Steam Community :: Game Cards"),
    );

    let badge_row = Element::new("div")
        .class("badge_row_inner")
        .child(Element::new("div").class("badge_title_row"))
        .child(Element::new("div").class("badge_progress_info"))
        .child(Element::new("div").class("gamecards_inventorylink"))
        .child(Element::new("div").class("game_cards_clear"))
        .child(
            Element::new("div")
                .class("badge_card_set_cards")
                .text("Card set"),
        )
        .child(Element::new("div").class("badge_cards_to_collect"));

    let content = Element::new("div")
        .id("responsive_page_template_content")
        .child(
            Element::new("div").class("pagecontent").child(
                Element::new("div")
                    .class("maincontent")
                    .child(Element::new("div").child(badge_row)),
            ),
        );

    page.append(page.body(), content);
    page
}
