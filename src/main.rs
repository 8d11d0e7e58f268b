use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use feria_api::app::{build_router, AppState};
use feria_api::auth::SystemClock;
use feria_api::config::AppConfig;
use feria_api::database::DatabaseManager;

#[derive(Parser)]
#[command(name = "feria-api", version, about = "Feria Puno administration API server")]
struct Args {
    /// Overrides PORT from the environment.
    #[arg(long)]
    port: Option<u16>,

    /// Apply pending migrations before accepting requests.
    #[arg(long)]
    migrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("feria_api=info,audit=info,tower_http=info")),
        )
        .init();

    let args = Args::parse();
    let mut config = AppConfig::from_env().context("invalid configuration")?;
    if let Some(port) = args.port {
        config.server.port = port;
    }
    tracing::info!("Starting Feria API in {:?} mode", config.environment);

    // The pool connects on first use so the server can start (and report
    // 503 from /health) while the database is still coming up.
    let database = DatabaseManager::connect_lazy(&config.database)?;
    if args.migrate {
        database.migrate().await.context("migrations failed")?;
        tracing::info!("Migrations applied");
    }

    let bind_addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    let state = AppState::new(config, database.clone(), Arc::new(SystemClock));
    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    tracing::info!("Feria API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
    }
    tracing::info!("Shutting down");
}
