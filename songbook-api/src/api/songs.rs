//! Song CRUD endpoints
//!
//! - `GET    /songs`      filtered, paginated listing
//! - `POST   /songs`      create (enriched by the music info service)
//! - `GET    /songs/:id`  single song, `?vers=N` selects verse N
//! - `PATCH  /songs/:id`  partial update
//! - `DELETE /songs/:id`  delete

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use songbook_common::db::{NewSong, Song, SongFilter, SongUpdate};
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::pagination::{parse_param, DEFAULT_PAGE_SIZE};
use crate::services::SongPage;
use crate::AppState;

/// Query parameters for song listing
///
/// `page` and `pageSize` are kept as raw strings so unparsable values fall
/// back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub song: Option<String>,
    pub group: Option<String>,
    pub text: Option<String>,
    pub release_date: Option<String>,
    pub link: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> SongFilter {
        SongFilter {
            song: self.song.clone(),
            group: self.group.clone(),
            text: self.text.clone(),
            release_date: self.release_date.clone(),
            link: self.link.clone(),
        }
    }
}

/// Query parameters for single-song retrieval
#[derive(Debug, Default, Deserialize)]
pub struct VerseQuery {
    /// 1-based verse number; 0 or absent returns the full text
    pub vers: Option<String>,
}

/// GET /songs
pub async fn list_songs(
    State(state): State<AppState>,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<Json<SongPage>> {
    let Query(query) = query?;

    let page = parse_param(query.page.as_deref(), 1);
    let page_size = parse_param(query.page_size.as_deref(), DEFAULT_PAGE_SIZE);
    let filter = query.filter();
    info!(page, page_size, ?filter, "Listing songs");

    let result = state.songs.list(&filter, page, page_size).await?;
    Ok(Json(result))
}

/// GET /songs/:id
pub async fn get_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    query: Result<Query<VerseQuery>, QueryRejection>,
) -> ApiResult<Json<Song>> {
    let id = parse_song_id(&raw_id)?;
    let Query(query) = query?;
    let verse = parse_param(query.vers.as_deref(), 0);
    info!(song_id = id, verse, "Fetching song");

    Ok(Json(state.songs.get(id, verse).await?))
}

/// POST /songs
pub async fn create_song(
    State(state): State<AppState>,
    payload: Result<Json<NewSong>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Song>)> {
    let Json(new_song) = payload?;
    info!(group = %new_song.group, song = %new_song.song, "Creating song");

    let song = state.songs.create(new_song).await?;
    Ok((StatusCode::CREATED, Json(song)))
}

/// PATCH /songs/:id
pub async fn update_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    payload: Result<Json<SongUpdate>, JsonRejection>,
) -> ApiResult<Json<Song>> {
    let id = parse_song_id(&raw_id)?;
    let Json(update) = payload?;
    info!(song_id = id, "Updating song");

    Ok(Json(state.songs.update(id, update).await?))
}

/// DELETE /songs/:id
pub async fn delete_song(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_song_id(&raw_id)?;
    info!(song_id = id, "Deleting song");

    state.songs.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

fn parse_song_id(raw: &str) -> ApiResult<i64> {
    raw.parse::<i64>()
        .map_err(|_| ApiError::BadRequest(format!("invalid song id: {:?}", raw)))
}

/// Build song routes
pub fn song_routes() -> Router<AppState> {
    Router::new()
        .route("/songs", get(list_songs).post(create_song))
        .route(
            "/songs/:id",
            get(get_song).patch(update_song).delete(delete_song),
        )
}
