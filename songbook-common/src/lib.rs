//! # Songbook Common Library
//!
//! Shared code for the songbook service including:
//! - Song/group models and database bootstrap
//! - Configuration loading
//! - Lyrics verse splitting
//! - Common error type

pub mod config;
pub mod db;
pub mod error;
pub mod lyrics;

pub use error::{Error, Result};
