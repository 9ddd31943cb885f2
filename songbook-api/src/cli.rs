//! Command-line arguments
//!
//! Every flag can also be set through its environment variable. A `.env`
//! file in the working directory is loaded before parsing.

use clap::Parser;
use songbook_common::config::ConfigOverrides;
use std::path::PathBuf;

/// Command-line arguments for songbook-api
#[derive(Parser, Debug)]
#[command(name = "songbook-api")]
#[command(about = "Song catalog HTTP API")]
#[command(version)]
pub struct Args {
    /// TOML config file (default: ./songbook.toml if present)
    #[arg(short, long, env = "SONGBOOK_CONFIG")]
    pub config: Option<PathBuf>,

    /// Address to bind
    #[arg(long, env = "SONGBOOK_HOST")]
    pub host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "SONGBOOK_PORT")]
    pub port: Option<u16>,

    /// SQLite database file
    #[arg(short, long, env = "SONGBOOK_DATABASE")]
    pub database: Option<PathBuf>,

    /// Song details endpoint used to enrich new songs
    #[arg(long, env = "SONGBOOK_MUSIC_INFO_URL")]
    pub music_info_url: Option<String>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "SONGBOOK_LOG_LEVEL")]
    pub log_level: Option<String>,
}

impl Args {
    /// Values that take precedence over the config file
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            database_path: self.database.clone(),
            music_info_url: self.music_info_url.clone(),
            log_level: self.log_level.clone(),
        }
    }
}
