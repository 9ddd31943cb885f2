//! Database access layer for songbook-api
//!
//! Connection setup and schema creation live in `songbook_common::db`;
//! this module holds the song queries.

pub mod songs;

pub use songs::SongRepository;
