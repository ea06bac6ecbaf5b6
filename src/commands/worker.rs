use std::sync::Arc;

use futures_util::FutureExt;
use nyx_bus::AckDisposition;
use nyx_core::config::AppConfig;
use nyx_core::Shutdown;
use tracing::{info, warn};
use url::Url;

/// Scraper worker.
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

    let tor = Arc::new(nyx_fetch::TorClient::new(&config.general.tor_proxy)?);
    let bus_for_handler = bus.clone();
    let processor_queue = config.mq.processor_queue.clone();

    let handler = Arc::new(move |payload: Vec<u8>| {
        let tor = tor.clone();
        let bus = bus_for_handler.clone();
        let processor_queue = processor_queue.clone();
        async move { process_one(payload, tor, bus, processor_queue).await }.boxed()
    });

    info!(queue = %config.mq.worker_queue, "worker starting consume loop");
    bus.consume(&config.mq.worker_queue, shutdown.token(), handler)
        .await?;
    Ok(())
}

async fn process_one(
    payload: Vec<u8>,
    tor: Arc<nyx_fetch::TorClient>,
    bus: Arc<nyx_bus::MessageBus>,
    processor_queue: String,
) -> AckDisposition {
    let Ok(url) = String::from_utf8(payload) else {
        warn!("non-utf8 worker_q payload, dropping");
        return AckDisposition::Drop;
    };

    let Ok(parsed_url) = Url::parse(&url) else {
        warn!(url, "invalid url, dropping");
        return AckDisposition::Drop;
    };

    let fetched = match tor.fetch(&url).await {
        Ok(f) => f,
        Err(e) => {
            warn!(url, error = %e, "scraping failed, dropping");
            return AckDisposition::Drop;
        }
    };

    let extracted = nyx_extract::parse_html(&fetched.body, &parsed_url);
    let result = nyx_core::ScrapeResult {
        url: url.clone(),
        page_title: extracted.title,
        page_content: Some(extracted.body_text),
        meta_tags: extracted.meta_tags,
        links: extracted.links,
    };

    let Ok(payload) = serde_json::to_vec(&result) else {
        warn!(url, "failed to serialize scrape result, dropping");
        return AckDisposition::Drop;
    };

    if bus.publish(&processor_queue, &payload).await {
        AckDisposition::Ack
    } else {
        AckDisposition::Requeue
    }
}
