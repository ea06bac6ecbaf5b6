use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "nyx", about = "Dark-web crawl scheduling, scraping and topic search pipeline")]
pub struct Cli {
    /// Path to the INI config file. Defaults to config.conf inside a
    /// container, config_local.conf otherwise.
    #[arg(short, long)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Query due URLs and publish them to the worker queue, once.
    Schedule,
    /// Consume the worker queue, scrape through Tor, publish results.
    Worker,
    /// Consume the processor queue, update the catalogue, discover links.
    Process,
    /// Run the topic-model manager and serve query/heartbeat over HTTP.
    Analyze,
}
