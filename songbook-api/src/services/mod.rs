//! Service layer for songbook-api

pub mod music_info;
pub mod songs;

pub use music_info::{MusicInfoClient, MusicInfoError};
pub use songs::{SongPage, SongService};
