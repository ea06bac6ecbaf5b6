use std::time::Duration;

use nyx_core::error::NyxError;
use url::Url;

/// Thin Tor-egress HTTP client. The scraper treats circuit
/// management and retry tuning as an external collaborator; this client's
/// only job is to put an HTTP request through the configured SOCKS proxy
/// and hand back bytes.
pub struct TorClient {
    client: reqwest::Client,
}

pub struct FetchedPage {
    pub url: Url,
    pub final_url: Url,
    pub status: u16,
    pub body: String,
}

impl TorClient {
    pub fn new(socks_proxy: &str) -> Result<Self, NyxError> {
        let proxy = reqwest::Proxy::all(format!("socks5h://{socks_proxy}"))
            .map_err(|e| NyxError::ScrapingFailed(format!("bad tor proxy: {e}")))?;

        let client = reqwest::Client::builder()
            .proxy(proxy)
            .connect_timeout(Duration::from_secs(30))
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| NyxError::ScrapingFailed(format!("failed to build client: {e}")))?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, url: &str) -> Result<FetchedPage, NyxError> {
        let parsed =
            Url::parse(url).map_err(|e| NyxError::InvalidUrl(format!("{url}: {e}")))?;

        let resp = self.client.get(parsed.as_str()).send().await.map_err(|e| {
            tracing::warn!(url, error = %e, "tor fetch failed");
            NyxError::ScrapingFailed(e.to_string())
        })?;

        let status = resp.status().as_u16();
        let final_url = Url::parse(resp.url().as_str()).unwrap_or_else(|_| parsed.clone());
        let body = resp.text().await.map_err(|e| {
            tracing::warn!(url, error = %e, "failed to read response body");
            NyxError::ScrapingFailed(e.to_string())
        })?;

        Ok(FetchedPage {
            url: parsed,
            final_url,
            status,
            body,
        })
    }
}
