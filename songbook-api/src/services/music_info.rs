//! External music info client
//!
//! Fetches release date, lyrics and link for a `(group, song)` pair from
//! the configured song details endpoint:
//!
//! ```text
//! GET {base_url}?group=Muse&song=Supermassive%20Black%20Hole
//! 200 {"releaseDate": "16.07.2006", "text": "...", "link": "https://..."}
//! ```

use songbook_common::db::SongDetail;
use std::time::Duration;
use thiserror::Error;

const USER_AGENT: &str = concat!("songbook-api/", env!("CARGO_PKG_VERSION"));

/// Music info client errors
#[derive(Debug, Error)]
pub enum MusicInfoError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Music info service returned status {0}")]
    Status(u16),

    #[error("Parse error: {0}")]
    Parse(String),
}

/// Client for the external song details endpoint
#[derive(Clone)]
pub struct MusicInfoClient {
    http_client: reqwest::Client,
    base_url: String,
}

impl MusicInfoClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, MusicInfoError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| MusicInfoError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    /// Look up details for a song
    pub async fn fetch(&self, group: &str, song: &str) -> Result<SongDetail, MusicInfoError> {
        tracing::info!(url = %self.base_url, group = %group, song = %song, "Requesting song details");

        let response = self
            .http_client
            .get(&self.base_url)
            .query(&[("group", group), ("song", song)])
            .send()
            .await
            .map_err(|e| MusicInfoError::Network(e.to_string()))?;

        let status = response.status();
        tracing::debug!(status = status.as_u16(), "Music info service responded");

        if !status.is_success() {
            return Err(MusicInfoError::Status(status.as_u16()));
        }

        response
            .json::<SongDetail>()
            .await
            .map_err(|e| MusicInfoError::Parse(e.to_string()))
    }
}
