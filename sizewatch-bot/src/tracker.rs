//! Client for the downstream tracker service.
//!
//! The tracker is the system of record for followed URLs and their selected
//! sizes. This client wraps its three endpoints:
//!
//! - `POST /follow/{chat_id}` with `{url}` - start tracking; the response
//!   may request a size selection
//! - `POST /follow/{chat_id}` with `{url, sizes}` - persist a confirmed
//!   selection
//! - `GET /follow/{chat_id}` - list tracked URLs for a chat

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tracker client error.
#[derive(Debug, thiserror::Error)]
pub enum TrackerError {
    #[error("tracker request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("tracker returned {status}: {body}")]
    Status {
        status: reqwest::StatusCode,
        body: String,
    },
}

/// Product details returned when the tracker requests a size selection.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowProduct {
    #[serde(rename = "productId")]
    pub product_id: String,
    pub url: String,
    pub name: String,
}

/// Response to a follow request.
///
/// `requires_size_selection` set with `sizes` and `product` means the bot
/// should open an interactive selection; otherwise this is a plain
/// acknowledgment.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowResponse {
    #[serde(default)]
    pub requires_size_selection: bool,
    #[serde(default)]
    pub sizes: Vec<String>,
    #[serde(default)]
    pub product: Option<FollowProduct>,
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Serialize)]
struct FollowRequest<'a> {
    url: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sizes: Option<&'a [String]>,
}

/// HTTP client for the tracker service.
pub struct TrackerClient {
    base_url: String,
    client: reqwest::Client,
}

impl TrackerClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();

        Self {
            base_url: base_url.into(),
            client,
        }
    }

    fn follow_url(&self, chat_id: i64) -> String {
        format!("{}/follow/{chat_id}", self.base_url.trim_end_matches('/'))
    }

    /// Start tracking a URL for a chat.
    pub async fn follow(&self, chat_id: i64, url: &str) -> Result<FollowResponse, TrackerError> {
        let body = FollowRequest { url, sizes: None };
        let resp = self
            .client
            .post(self.follow_url(chat_id))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        Ok(resp.json().await?)
    }

    /// Persist a confirmed size selection for an already-tracked URL.
    pub async fn confirm_sizes(
        &self,
        chat_id: i64,
        url: &str,
        sizes: &[String],
    ) -> Result<(), TrackerError> {
        let body = FollowRequest {
            url,
            sizes: Some(sizes),
        };
        let resp = self
            .client
            .post(self.follow_url(chat_id))
            .json(&body)
            .send()
            .await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        Ok(())
    }

    /// List the URLs currently tracked for a chat.
    pub async fn list(&self, chat_id: i64) -> Result<Vec<String>, TrackerError> {
        let resp = self.client.get(self.follow_url(chat_id)).send().await?;

        if !resp.status().is_success() {
            return Err(status_error(resp).await);
        }

        Ok(resp.json().await?)
    }
}

async fn status_error(resp: reqwest::Response) -> TrackerError {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    TrackerError::Status { status, body }
}
