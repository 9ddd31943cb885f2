//! Song service
//!
//! Sits between the HTTP handlers and [`SongRepository`]: applies
//! pagination, verse selection, input validation and the external
//! details lookup on create.

use serde::Serialize;
use songbook_common::db::{NewSong, Song, SongDetail, SongFilter, SongUpdate};
use songbook_common::lyrics;
use tracing::{info, warn};

use crate::db::SongRepository;
use crate::error::{ApiError, ApiResult};
use crate::pagination::{calculate_pagination, total_pages};
use crate::services::music_info::MusicInfoClient;

/// One page of songs
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SongPage {
    pub songs: Vec<Song>,
    pub total_pages: i64,
    pub current_page: i64,
    pub page_size: i64,
}

#[derive(Clone)]
pub struct SongService {
    repo: SongRepository,
    music_info: Option<MusicInfoClient>,
}

impl SongService {
    pub fn new(repo: SongRepository, music_info: Option<MusicInfoClient>) -> Self {
        Self { repo, music_info }
    }

    pub async fn list(&self, filter: &SongFilter, page: i64, page_size: i64) -> ApiResult<SongPage> {
        let p = calculate_pagination(page, page_size);
        let (songs, total) = self.repo.list(filter, p.page_size, p.offset).await?;

        Ok(SongPage {
            songs,
            total_pages: total_pages(total, p.page_size),
            current_page: p.page,
            page_size: p.page_size,
        })
    }

    /// Fetch a song; `verse > 0` replaces the text with that verse
    pub async fn get(&self, id: i64, verse: i64) -> ApiResult<Song> {
        let mut song = self
            .repo
            .get(id)
            .await?
            .ok_or_else(|| not_found(id))?;

        if verse != 0 {
            song.text = lyrics::verse(&song.text, verse)
                .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        }

        Ok(song)
    }

    pub async fn create(&self, new_song: NewSong) -> ApiResult<Song> {
        let new_song = new_song.validate()?;

        let detail = match &self.music_info {
            Some(client) => client.fetch(&new_song.group, &new_song.song).await?,
            None => {
                warn!(
                    group = %new_song.group,
                    song = %new_song.song,
                    "Music info service not configured, storing song without details"
                );
                SongDetail::default()
            }
        };

        info!(release_date = %detail.release_date, "Creating song");
        Ok(self.repo.create(&new_song.group, &new_song.song, &detail).await?)
    }

    pub async fn update(&self, id: i64, update: SongUpdate) -> ApiResult<Song> {
        if update.is_empty() {
            return Err(ApiError::BadRequest("no fields to update".to_string()));
        }

        self.repo
            .update(id, &update)
            .await?
            .ok_or_else(|| not_found(id))
    }

    pub async fn delete(&self, id: i64) -> ApiResult<()> {
        if self.repo.delete(id).await? {
            Ok(())
        } else {
            Err(not_found(id))
        }
    }
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("song with id {} not found", id))
}
