use anyhow::Result;
use clap::Parser;
use goal_coach_tracker::{router, AppState, Args, Database, TrackerConfig};
use tower_http::cors::{Any, CorsLayer};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Goal Coach Tracker Service v{}", env!("CARGO_PKG_VERSION"));

    let config = TrackerConfig::from_args(Args::parse())?;

    // Create directory if it doesn't exist
    if let Some(parent) = config.db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let db = Database::new(&config.db_path)?;
    info!("Database initialized at: {}", config.db_path.display());

    let state = AppState::new(db);

    // CORS layer for the web client
    let cors = CorsLayer::new()
        .allow_origin(config.cors_origin.clone())
        .allow_methods(Any)
        .allow_headers(Any);

    let app = router(state).layer(cors);

    info!("Starting HTTP server on http://{}", config.bind_addr);
    info!("API endpoint: http://{}/api", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
