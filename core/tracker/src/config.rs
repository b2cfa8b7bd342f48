use anyhow::{Context, Result};
use axum::http::HeaderValue;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

pub const DEFAULT_DB_PATH: &str = "goal_coach.db";
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8001";
pub const DEFAULT_CORS_ORIGIN: &str = "http://localhost:3000";

/// Command line flags; each one falls back to an environment variable, then a default
#[derive(Parser, Debug, Clone)]
#[command(name = "goal-coach")]
#[command(about = "Goal Coach tracker service")]
pub struct Args {
    /// Path to SQLite database file
    #[arg(long, short, env = "DB_PATH", default_value = DEFAULT_DB_PATH)]
    pub db_path: PathBuf,

    /// Address the HTTP server listens on
    #[arg(long, env = "BIND_ADDR", default_value = DEFAULT_BIND_ADDR)]
    pub bind: String,

    /// Origin allowed by CORS (the web client)
    #[arg(long, env = "CORS_ORIGIN", default_value = DEFAULT_CORS_ORIGIN)]
    pub cors_origin: String,
}

#[derive(Debug, Clone)]
pub struct TrackerConfig {
    pub db_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub cors_origin: HeaderValue,
}

impl TrackerConfig {
    pub fn from_args(args: Args) -> Result<Self> {
        let bind_addr = args
            .bind
            .parse::<SocketAddr>()
            .with_context(|| format!("invalid bind address '{}'", args.bind))?;

        let cors_origin = HeaderValue::from_str(&args.cors_origin)
            .with_context(|| format!("invalid CORS origin '{}'", args.cors_origin))?;

        Ok(Self {
            db_path: args.db_path,
            bind_addr,
            cors_origin,
        })
    }
}
