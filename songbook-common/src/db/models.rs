//! Database models
//!
//! JSON field names follow the public API (`releaseDate`, not `release_date`).

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// A song row joined with its group name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Song {
    pub id: i64,
    pub song: String,
    pub group: String,
    pub text: String,
    pub release_date: String,
    pub link: String,
}

/// Substring filters for song listing
///
/// Every filter is optional; an absent or empty filter matches all rows.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongFilter {
    pub song: Option<String>,
    pub group: Option<String>,
    pub text: Option<String>,
    pub release_date: Option<String>,
    pub link: Option<String>,
}

/// Request body for creating a song
#[derive(Debug, Clone, Deserialize)]
pub struct NewSong {
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub song: String,
}

impl NewSong {
    /// Trim both names and reject blanks
    pub fn validate(self) -> Result<Self> {
        let group = self.group.trim().to_string();
        let song = self.song.trim().to_string();

        if group.is_empty() {
            return Err(Error::InvalidInput("group must not be empty".to_string()));
        }
        if song.is_empty() {
            return Err(Error::InvalidInput("song must not be empty".to_string()));
        }

        Ok(Self { group, song })
    }
}

/// Song details returned by the external music info service
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SongDetail {
    pub release_date: String,
    pub text: String,
    pub link: String,
}

/// Partial update of a song
///
/// `None` and empty strings both mean "leave unchanged".
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SongUpdate {
    pub song: Option<String>,
    pub group: Option<String>,
    pub text: Option<String>,
    pub release_date: Option<String>,
    pub link: Option<String>,
}

impl SongUpdate {
    pub fn song(&self) -> Option<&str> {
        non_empty(&self.song)
    }

    pub fn group(&self) -> Option<&str> {
        non_empty(&self.group).map(str::trim).filter(|g| !g.is_empty())
    }

    pub fn text(&self) -> Option<&str> {
        non_empty(&self.text)
    }

    pub fn release_date(&self) -> Option<&str> {
        non_empty(&self.release_date)
    }

    pub fn link(&self) -> Option<&str> {
        non_empty(&self.link)
    }

    /// True when no field would change anything
    pub fn is_empty(&self) -> bool {
        self.song().is_none()
            && self.group().is_none()
            && self.text().is_none()
            && self.release_date().is_none()
            && self.link().is_none()
    }
}

fn non_empty(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}
