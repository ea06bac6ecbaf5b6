use nyx_analyzer::ModelManager;
use nyx_core::config::AppConfig;
use nyx_core::Shutdown;
use tracing::{info, warn};

/// Analyzer: owns the singleton model manager and serves it over
/// the RPC surface.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    shutdown.install_signal_handler();

    let uplink = std::env::var("UPLINK").unwrap_or_else(|_| {
        warn!("UPLINK not set");
        std::process::exit(1);
    });
    let uplink_key = std::env::var("UPLINK_KEY").unwrap_or_else(|_| {
        warn!("UPLINK_KEY not set");
        std::process::exit(1);
    });

    let store = nyx_store::Catalogue::connect(&config.postgres.url()).await?;
    store.run_migrations().await?;

    let manager = ModelManager::start(store, &config.general.model_dir, shutdown.clone()).await;

    let app = nyx_rpc::router(manager, uplink_key);
    let listener = tokio::net::TcpListener::bind(&uplink).await?;
    info!(addr = %uplink, "analyzer listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.stopped().await })
        .await?;
    Ok(())
}
