//! Report Tracker (civix-rt) - Main entry point
//!
//! Serves the report API over HTTP: creation with geospatial duplicate
//! detection, listings, and crowd-verified status changes.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use civix_common::config::{
    database_path, default_config_path, ensure_root_folder, load_toml_config, RootFolderResolver,
    ServiceAreaConfig,
};
use civix_common::db::init_database;
use civix_rt::api::UuidTokenResolver;
use civix_rt::config::RuntimeSettings;
use civix_rt::services::ReportService;
use civix_rt::{build_router, AppState};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_PORT: u16 = 5810;
const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1";

/// Command-line arguments for civix-rt
#[derive(Parser, Debug)]
#[command(name = "civix-rt")]
#[command(about = "Report Tracker service for Civix")]
#[command(version)]
struct Args {
    /// Port to listen on (overrides the config file)
    #[arg(short, long, env = "CIVIX_RT_PORT")]
    port: Option<u16>,

    /// Root folder holding the database
    #[arg(short, long, env = "CIVIX_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    /// TOML bootstrap configuration file
    #[arg(short, long, env = "CIVIX_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_path = args
        .config
        .clone()
        .unwrap_or_else(|| default_config_path("civix-rt"));
    let toml_config = load_toml_config(&config_path)
        .with_context(|| format!("Failed to load config {}", config_path.display()))?;

    // RUST_LOG wins over the config file
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("civix_rt={0},civix_common={0},tower_http=info", toml_config.logging.level)
                    .into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting Civix Report Tracker (civix-rt) v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!("Config file: {}", config_path.display());

    let root_folder =
        RootFolderResolver::new("CIVIX_ROOT_FOLDER").resolve(args.root_folder.as_deref(), &toml_config);
    ensure_root_folder(&root_folder)?;
    info!("Root folder: {}", root_folder.display());

    let db_path = database_path(&root_folder, &toml_config);
    info!("Database path: {}", db_path.display());
    let pool = init_database(&db_path)
        .await
        .context("Failed to initialize database")?;

    let settings = RuntimeSettings::load(&pool)
        .await
        .context("Failed to load runtime settings")?;

    let service = ReportService::open(pool, settings)
        .await
        .context("Failed to open report service")?;

    let service_area = toml_config.service_area.unwrap_or_default();
    if service_area == ServiceAreaConfig::TORONTO {
        info!("Service area: City of Toronto (default)");
    }

    warn!("{}", UuidTokenResolver::TRUST_NOTICE);
    let state = AppState::new(Arc::new(service), Arc::new(UuidTokenResolver), service_area);
    let app = build_router(state);

    let port = args.port.or(toml_config.port).unwrap_or(DEFAULT_PORT);
    let bind_address = toml_config
        .bind_address
        .as_deref()
        .unwrap_or(DEFAULT_BIND_ADDRESS);
    let addr: SocketAddr = format!("{}:{}", bind_address, port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", bind_address, port))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("civix-rt listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
