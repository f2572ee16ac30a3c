//! Server configuration
//!
//! Priority: command line, then `CHORUS_*` environment variables, then the
//! TOML config file, then compiled defaults.

use chorus_common::config::{load_toml_config, pick, TomlConfig};
use chorus_common::{Error, Result};
use clap::Parser;
use std::path::PathBuf;

pub const DEFAULT_PORT: u16 = 4100;
pub const DEFAULT_ALLOWED_ORIGIN: &str = "http://localhost:5173";
pub const DEFAULT_UPLOADS_DIR: &str = "./uploads";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Command-line arguments
#[derive(Parser, Debug, Default)]
#[command(name = "chorus-server")]
#[command(about = "Choir rehearsal planner backend", long_about = None)]
#[command(version)]
pub struct Args {
    /// SQLite database URL (e.g. sqlite://chorus.db)
    #[arg(long, env = "CHORUS_DATABASE_URL")]
    pub database_url: Option<String>,

    /// HTTP port to listen on
    #[arg(short, long, env = "CHORUS_PORT")]
    pub port: Option<u16>,

    /// Origin allowed by CORS
    #[arg(long, env = "CHORUS_ALLOWED_ORIGIN")]
    pub allowed_origin: Option<String>,

    /// Directory holding uploaded recordings
    #[arg(long, env = "CHORUS_UPLOADS_DIR")]
    pub uploads_dir: Option<PathBuf>,

    /// Largest accepted request body, in bytes
    #[arg(long, env = "CHORUS_MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    /// Config file (default: <config dir>/chorus/config.toml)
    #[arg(short, long, env = "CHORUS_CONFIG")]
    pub config: Option<PathBuf>,
}

/// Fully resolved server settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub database_url: String,
    pub port: u16,
    pub allowed_origin: String,
    pub uploads_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl ServerConfig {
    /// Load the config file named by the arguments and merge
    pub fn load(args: Args) -> Result<Self> {
        let file = load_toml_config(args.config.as_deref())?;
        Self::resolve(args, file)
    }

    /// Merge arguments over file values over defaults
    pub fn resolve(args: Args, file: TomlConfig) -> Result<Self> {
        let database_url = args
            .database_url
            .or(file.database_url)
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                Error::Config(
                    "database_url is required (--database-url, CHORUS_DATABASE_URL or config file)"
                        .to_string(),
                )
            })?;

        Ok(Self {
            database_url,
            port: pick(args.port, file.port, DEFAULT_PORT),
            allowed_origin: pick(
                args.allowed_origin,
                file.allowed_origin,
                DEFAULT_ALLOWED_ORIGIN.to_string(),
            ),
            uploads_dir: pick(
                args.uploads_dir,
                file.uploads_dir,
                PathBuf::from(DEFAULT_UPLOADS_DIR),
            ),
            max_upload_bytes: pick(
                args.max_upload_bytes,
                file.max_upload_bytes,
                DEFAULT_MAX_UPLOAD_BYTES,
            ),
        })
    }
}
