//! SteamSets badge API client
//!
//! Fetches the badge list of a game from the SteamSets API and parses it
//! into `BadgeRecord`s. One attempt per call, no retries.

use std::future::Future;

use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::{AppId, BadgeRecord};

/// Endpoint listing the badges of one app
pub const DEFAULT_ENDPOINT: &str = "https://api.steamsets.com/v1/app.listBadges";

/// Errors that can occur when fetching badge data
#[derive(Debug, Error)]
pub enum FetchError {
    /// A response arrived but could not be used
    #[error("Bad response from badge API: {0}")]
    BadResponse(#[from] BadResponse),

    /// No response was received
    #[error("Network error while fetching badges: {0}")]
    Network(#[from] reqwest::Error),
}

/// Why a received response was rejected
#[derive(Debug, Error)]
pub enum BadResponse {
    #[error("request failed with status {0}")]
    Status(u16),

    #[error("body is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("response is missing the \"badges\" array")]
    MissingBadges,
}

/// Anything that can produce the badge list of an app
pub trait BadgeSource {
    fn fetch_badges(
        &self,
        app_id: AppId,
    ) -> impl Future<Output = Result<Vec<BadgeRecord>, FetchError>> + Send;
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ListBadgesRequest {
    app_id: AppId,
}

/// Client for the SteamSets `app.listBadges` endpoint
#[derive(Debug, Clone)]
pub struct SteamSetsClient {
    client: Client,
    endpoint: String,
    api_key: String,
}

impl SteamSetsClient {
    /// Create a client using the default endpoint and the given bearer key
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: api_key.into(),
        }
    }

    /// Point the client at a different endpoint
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

impl BadgeSource for SteamSetsClient {
    async fn fetch_badges(&self, app_id: AppId) -> Result<Vec<BadgeRecord>, FetchError> {
        info!(app_id, endpoint = %self.endpoint, "fetching badge data from API");

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&ListBadgesRequest { app_id })
            .send()
            .await?;

        let status = response.status().as_u16();
        let body = response.text().await?;
        debug!(app_id, status, bytes = body.len(), "badge API responded");

        parse_response(status, &body)
    }
}

/// Turn a raw HTTP status and body into a badge list
///
/// Records that do not look like badges are logged and skipped; the rest of
/// the list is still used.
///
/// # Returns
/// * `Ok(Vec<BadgeRecord>)` - The usable `badges` entries, possibly empty
/// * `Err(FetchError::BadResponse)` - Non-2xx status, invalid JSON, or no `badges` array
pub fn parse_response(status: u16, body: &str) -> Result<Vec<BadgeRecord>, FetchError> {
    if !(200..300).contains(&status) {
        return Err(BadResponse::Status(status).into());
    }

    let mut value: Value = serde_json::from_str(body).map_err(BadResponse::InvalidJson)?;

    let Some(Value::Array(items)) = value.get_mut("badges").map(Value::take) else {
        return Err(BadResponse::MissingBadges.into());
    };

    let badges: Vec<BadgeRecord> = items
        .into_iter()
        .enumerate()
        .filter_map(|(index, item)| match serde_json::from_value(item) {
            Ok(badge) => Some(badge),
            Err(e) => {
                warn!(index, error = %e, "skipping malformed badge record");
                None
            }
        })
        .collect();
    Ok(badges)
}
