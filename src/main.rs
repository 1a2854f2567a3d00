//! earshot service binary
//!
//! Wires the storage pool, debounce coordinator, sweep runner and publisher
//! together and serves the HTTP/websocket API.

use anyhow::Result;
use clap::Parser;
use earshot::api::{build_router, AppState};
use earshot::detect;
use earshot::detect::debounce::{Debouncer, LOOKBACK_US, QUIET_INTERVAL};
use earshot::publish::Publisher;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Command-line arguments for earshot
#[derive(Parser, Debug)]
#[command(name = "earshot")]
#[command(about = "Acoustic sensor network backend with TDOA shot localization")]
#[command(version)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "8000", env = "EARSHOT_PORT")]
    port: u16,

    /// Address to bind
    #[arg(short, long, default_value = "0.0.0.0", env = "EARSHOT_BIND")]
    bind: String,

    /// SQLite database path
    #[arg(short, long, default_value = "earshot.db", env = "EARSHOT_DB")]
    db_path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "earshot=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    info!("Starting earshot v{}", env!("CARGO_PKG_VERSION"));
    info!("Database path: {}", args.db_path.display());

    let pool = earshot::db::init::init_database(&args.db_path).await?;

    let publisher = Arc::new(Publisher::new());
    let (debouncer, windows) = Debouncer::new(QUIET_INTERVAL, LOOKBACK_US);

    // Serialized sweep runner; sweeps never run concurrently
    tokio::spawn(detect::run_sweeps(
        pool.clone(),
        Arc::clone(&publisher),
        windows,
    ));

    let state = AppState::new(pool, publisher, debouncer);
    let app = build_router(state);

    let addr = format!("{}:{}", args.bind, args.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("earshot listening on http://{}", addr);
    info!("push channel: ws://{}/ws", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
