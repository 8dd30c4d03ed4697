//! Integration tests for full page loads against a local badge API
//!
//! Each test binds a throwaway HTTP responder on 127.0.0.1 that answers one
//! request with a canned status and body, and hands back the raw request.

use cardbadge::app::{Abort, App, Outcome, Source};
use cardbadge::cache::{BadgeCache, TABLE_NAME};
use cardbadge::data::steamsets::BadResponse;
use cardbadge::data::{FetchError, SteamSetsClient};
use cardbadge::page::skeleton::game_cards_page;
use cardbadge::page::{MemoryPage, Selector};
use cardbadge::ui::{BadgeGrid, DEFAULT_ANCHOR_SELECTOR};
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

const BADGES: &str = r#"{"badges":[
    {"name":"Mann Co. Foil","isFoil":true,"baseLevel":1,"scarcity":"812","badgeImage":"foil.png"},
    {"name":"Level Two","isFoil":false,"baseLevel":2,"scarcity":90210,"badgeImage":"two.png"},
    {"name":"Level One","isFoil":false,"baseLevel":1,"scarcity":120345,"badgeImage":"one.png"}
]}"#;

/// Serves one HTTP response and returns the endpoint URL plus the captured request
async fn serve_once(status: u16, body: &'static str) -> (String, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("http://{}/v1/app.listBadges", listener.local_addr().unwrap());

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
            if let Some(end) = find_header_end(&request) {
                let headers = String::from_utf8_lossy(&request[..end]).to_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if request.len() >= end + 4 + length {
                    break;
                }
            }
        }

        let response = format!(
            "HTTP/1.1 {} Test\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            status,
            body.len(),
            body
        );
        socket.write_all(response.as_bytes()).await.unwrap();
        socket.shutdown().await.ok();
        String::from_utf8_lossy(&request).into_owned()
    });

    (url, handle)
}

fn find_header_end(request: &[u8]) -> Option<usize> {
    request.windows(4).position(|w| w == b"\r\n\r\n")
}

fn new_app(endpoint: &str, cache_dir: &TempDir) -> App<SteamSetsClient> {
    let cache = BadgeCache::with_dir(cache_dir.path().to_path_buf());
    let client = SteamSetsClient::new("test-key").with_endpoint(endpoint);
    let grid = BadgeGrid::new(Selector::parse(DEFAULT_ANCHOR_SELECTOR).unwrap());
    App::new(Some(cache), client, grid)
}

fn count(page: &MemoryPage, selector: &str) -> usize {
    page.query_all(&Selector::parse(selector).unwrap()).len()
}

#[tokio::test]
async fn test_remote_badges_are_rendered_and_cached() {
    let (endpoint, request) = serve_once(200, BADGES).await;
    let cache_dir = TempDir::new().unwrap();
    let mut app = new_app(&endpoint, &cache_dir);
    let page = game_cards_page();

    let outcome = app
        .load_page(&page, "https://steamcommunity.com/id/me/gamecards/440/")
        .await
        .finish()
        .await;

    assert!(matches!(
        outcome,
        Outcome::Rendered {
            app_id: 440,
            source: Source::Remote,
            count: 3
        }
    ));

    let request = request.await.unwrap();
    assert!(request.starts_with("POST /v1/app.listBadges"));
    assert!(request.to_lowercase().contains("authorization: bearer test-key"));
    assert!(request.ends_with(r#"{"appId":440}"#));

    assert_eq!(count(&page, ".steam-badge-container"), 1);
    assert_eq!(count(&page, ".steam-badge-item.foil"), 1);
    let html = page.to_html();
    let one = html.find("Level One").unwrap();
    let two = html.find("Level Two").unwrap();
    let foil = html.find("Mann Co. Foil").unwrap();
    assert!(one < two && two < foil);
    assert!(html.contains("/images/items/440/one.png"));

    assert!(cache_dir.path().join(TABLE_NAME).join("440.json").exists());
}

#[tokio::test]
async fn test_second_load_is_served_from_cache() {
    let (endpoint, _request) = serve_once(200, BADGES).await;
    let cache_dir = TempDir::new().unwrap();
    let url = "https://steamcommunity.com/id/me/gamecards/440/";

    new_app(&endpoint, &cache_dir)
        .load_page(&game_cards_page(), url)
        .await
        .finish()
        .await;

    // The responder is gone; only the cache can satisfy this load.
    let page = game_cards_page();
    let outcome = new_app(&endpoint, &cache_dir)
        .load_page(&page, url)
        .await
        .finish()
        .await;

    assert!(matches!(
        outcome,
        Outcome::Rendered {
            source: Source::Cache,
            count: 3,
            ..
        }
    ));
    assert_eq!(count(&page, ".steam-badge-item"), 3);
}

#[tokio::test]
async fn test_not_found_renders_nothing_and_writes_nothing() {
    let (endpoint, _request) = serve_once(404, r#"{"error":"not found"}"#).await;
    let cache_dir = TempDir::new().unwrap();
    let page = game_cards_page();

    let load = new_app(&endpoint, &cache_dir)
        .load_page(&page, "https://steamcommunity.com/id/me/gamecards/730/")
        .await;

    assert!(load.pending_write.is_none());
    assert!(matches!(
        load.outcome,
        Outcome::Aborted(Abort::Fetch(FetchError::BadResponse(BadResponse::Status(404))))
    ));
    assert_eq!(count(&page, ".steam-badge-container"), 0);
    assert!(!cache_dir.path().join(TABLE_NAME).join("730.json").exists());
}

#[tokio::test]
async fn test_empty_badge_list_renders_nothing() {
    let (endpoint, _request) = serve_once(200, r#"{"badges":[]}"#).await;
    let cache_dir = TempDir::new().unwrap();
    let page = game_cards_page();

    let load = new_app(&endpoint, &cache_dir)
        .load_page(&page, "https://steamcommunity.com/id/me/gamecards/570/")
        .await;

    assert!(matches!(load.outcome, Outcome::Aborted(Abort::NoBadges)));
    assert_eq!(count(&page, ".steam-badge-container"), 0);
}

#[tokio::test]
async fn test_missing_badges_field_is_bad_response() {
    let (endpoint, _request) = serve_once(200, r#"{"apps":[]}"#).await;
    let cache_dir = TempDir::new().unwrap();
    let page = game_cards_page();

    let load = new_app(&endpoint, &cache_dir)
        .load_page(&page, "https://steamcommunity.com/id/me/gamecards/570/")
        .await;

    assert!(matches!(
        load.outcome,
        Outcome::Aborted(Abort::Fetch(FetchError::BadResponse(
            BadResponse::MissingBadges
        )))
    ));
}
