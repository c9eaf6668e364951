//! artpulse-feed - Personalized Content Feed Microservice
//!
//! Serves the two core endpoints of the content feed:
//! - `POST /app/analytics/batch` - telemetry ingestion pipeline
//! - `POST /app/feed/personalized` - feed ranking engine
//!
//! All other platform concerns (ticketing, artist workflows, payments,
//! messaging) live in sibling services and only share tables with this one.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use artpulse_common::config::ServiceConfig;
use artpulse_feed::AppState;

const DEFAULT_PORT: u16 = 5810;

#[derive(Debug, Parser)]
#[command(name = "artpulse-feed", about = "ArtPulse personalized feed service")]
struct Args {
    /// Path to TOML config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// SQLite database path (overrides config file)
    #[arg(long)]
    database: Option<PathBuf>,

    /// Listen port (overrides config file)
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServiceConfig::resolve(
        args.config.as_deref(),
        args.database.as_deref(),
        args.port,
        DEFAULT_PORT,
    )?;

    // Initialize tracing; RUST_LOG overrides the configured level
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Starting artpulse-feed (Personalized Content Feed)");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));
    info!("Database: {}", config.database_path.display());

    let db_pool = artpulse_common::db::init_database(&config.database_path).await?;
    info!("Database connection established");

    let state = AppState::new(db_pool);
    let app = artpulse_feed::build_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
