use std::path::Path;
use std::sync::Arc;

use futures_util::FutureExt;
use nyx_bus::AckDisposition;
use nyx_core::config::AppConfig;
use nyx_core::url_util::strip_quotes;
use nyx_core::{ScrapeResult, Shutdown};
use nyx_store::Catalogue;
use tracing::{info, warn};

/// Processor.
pub async fn run(config: AppConfig) -> anyhow::Result<()> {
    let shutdown = Shutdown::new();
    shutdown.install_signal_handler();

    let blacklist_path = Path::new(&config.general.data_dir).join("blacklist.txt");
    let blacklist = match nyx_blacklist::Blacklist::load(&blacklist_path) {
        Ok(b) => Arc::new(b),
        Err(e) => {
            warn!(error = %e, "blacklist missing or empty, exiting");
            std::process::exit(0);
        }
    };

    let bus = match nyx_bus::MessageBus::connect(&config.mq.amqp_url()).await {
        Ok(b) => Arc::new(b),
        Err(e) => {
            warn!(error = %e, "could not connect to message bus");
            std::process::exit(1);
        }
    };

    let store = Arc::new(Catalogue::connect(&config.postgres.url()).await?);
    store.run_migrations().await?;

    let handler = Arc::new({
        let store = store.clone();
        let blacklist = blacklist.clone();
        move |payload: Vec<u8>| {
            let store = store.clone();
            let blacklist = blacklist.clone();
            async move { process_one(payload, store, blacklist).await }.boxed()
        }
    });

    info!(queue = %config.mq.processor_queue, "processor starting consume loop");
    bus.consume(&config.mq.processor_queue, shutdown.token(), handler)
        .await?;
    Ok(())
}

async fn process_one(
    payload: Vec<u8>,
    store: Arc<Catalogue>,
    blacklist: Arc<nyx_blacklist::Blacklist>,
) -> AckDisposition {
    let result: ScrapeResult = match serde_json::from_slice(&payload) {
        Ok(r) => r,
        Err(e) => {
            warn!(error = %e, "malformed scrape result, dropping");
            return AckDisposition::Drop;
        }
    };

    if blacklist.is_blacklisted(&result.url) {
        info!(url = %result.url, "blacklisted url, dropping silently");
        return AckDisposition::Drop;
    }

    let existing = match store.get_by_url(&result.url).await {
        Ok(e) => e,
        Err(e) => {
            warn!(url = %result.url, error = %e, "failed to look up existing page, dropping");
            return AckDisposition::Drop;
        }
    };

    let save_result = if existing.is_some() {
        store.update_scraped(&result).await
    } else {
        store.insert_scraped(&result).await
    };
    if let Err(e) = save_result {
        warn!(url = %result.url, error = %e, "save failed, url will be retried next pass");
        return AckDisposition::Drop;
    }

    let existing_urls = match store.get_all_urls().await {
        Ok(u) => u,
        Err(e) => {
            warn!(error = %e, "failed to load known urls, skipping link discovery");
            return AckDisposition::Ack;
        }
    };

    for link in &result.links {
        let cleaned = strip_quotes(link);
        if blacklist.is_blacklisted(&cleaned) {
            continue;
        }
        if existing_urls.contains(&cleaned) {
            continue;
        }
        if let Err(e) = store.insert_placeholder(&cleaned, &result.url).await {
            warn!(url = %cleaned, error = %e, "failed to insert discovered link, skipping");
        }
    }

    AckDisposition::Ack
}
