use thiserror::Error;

#[derive(Error, Debug)]
pub enum NyxError {
    #[error("config error: {0}")]
    Config(String),

    #[error("broker unavailable: {0}")]
    Broker(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    #[error("scraping failed: {0}")]
    ScrapingFailed(String),

    #[error("blacklist missing or empty: {0}")]
    BlacklistMissing(String),

    #[error("model error: {0}")]
    Model(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}
