use std::net::SocketAddr;
use std::sync::Arc;

use asset_registry::api::{build_app_router, AppState};
use asset_registry::config::DEFAULT_CONFIG_FILE;
use asset_registry::domain::ports::{Geocoder, Registry};
use asset_registry::utils::{logger, validation::Validate};
use asset_registry::{AppConfig, GeocodioClient, SnapshotStore};
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "asset-registry")]
#[command(about = "HTTP API for the community asset registry")]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = DEFAULT_CONFIG_FILE)]
    config: String,

    /// Override the listening port from config
    #[arg(short, long)]
    port: Option<u16>,

    /// Serve from memory only; nothing is loaded from or written to disk
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = match AppConfig::load(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file is valid TOML");
            std::process::exit(1);
        }
    };
    if let Some(port) = args.port {
        config.server.port = port;
    }

    logger::init_server_logger(config.server.json_logs);
    tracing::info!("🚀 Starting asset-registry API");

    if let Err(e) = config.validate() {
        e.report("Configuration validation failed");
        std::process::exit(e.exit_code());
    }

    let snapshots = (!args.ephemeral).then(|| SnapshotStore::from_config(&config.storage));
    let registry = match &snapshots {
        Some(store) => match store.load_registry().await {
            Ok(registry) => registry,
            Err(e) => {
                e.report("Failed to load registry snapshot");
                std::process::exit(e.exit_code());
            }
        },
        None => {
            tracing::warn!("⚠️ Ephemeral mode: changes will not be saved");
            asset_registry::InMemoryRegistry::new()
        }
    };
    tracing::info!("📁 Snapshot: {}", config.snapshot_path().display());

    let registry: Arc<dyn Registry> = Arc::new(registry);
    let geocoder: Arc<dyn Geocoder> = Arc::new(GeocodioClient::new(&config.geocoder)?);
    if config.geocoder.api_key.is_none() {
        tracing::warn!("⚠️ No geocoder API key configured; location splits will fail to geocode");
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    let state = AppState::new(registry, geocoder, snapshots, config);
    let app = build_app_router(state.clone());

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("✅ Listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down, saving registry");
    if let Err(e) = state.persist().await {
        e.report("Failed to save registry snapshot");
        std::process::exit(e.exit_code());
    }
    tracing::info!("✅ Registry saved");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
