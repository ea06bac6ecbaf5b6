use std::sync::Arc;

use nyx_core::config::AppConfig;
use nyx_core::Shutdown;
use nyx_sleeper::Sleeper;
use nyx_store::Catalogue;
use tracing::{info, warn};

/// Scheduler loop: single-shot per invocation.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    shutdown.install_signal_handler();

    let bus = match nyx_bus::MessageBus::connect(&config.mq.amqp_url()).await {
        Ok(b) => Arc::new(b),
        Err(e) => {
            warn!(error = %e, "could not connect to message bus");
            std::process::exit(1);
        }
    };

    let sleeper = Sleeper::new(nyx_sleeper::state_path_default(&config.general.data_dir));
    sleeper.sleep(1, &shutdown).await;

    let store = Catalogue::connect(&config.postgres.url()).await?;
    store.run_migrations().await?;

    let due = store.list_due(config.general.access_day_difference).await?;
    info!(count = due.len(), "scheduling due urls");

    for url in &due {
        let published = bus.publish(&config.mq.worker_queue, url.as_bytes()).await;
        if !published {
            warn!(url, "publish failed, stopping run early; url will be retried next pass");
            break;
        }
    }

    bus.close().await;
    Ok(())
}
