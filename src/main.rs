mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

use nyx_core::config::AppConfig;

use crate::cli::{Cli, Commands};

fn main() -> Result<()> {
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async_main())
}

async fn async_main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.unwrap_or_else(AppConfig::default_path);
    let config = AppConfig::load(&config_path).unwrap_or_else(|e| {
        eprintln!("config error: {e}");
        std::process::exit(3);
    });

    match cli.command {
        Commands::Schedule => commands::schedule::run(config).await,
        Commands::Worker => commands::worker::run(config).await,
        Commands::Process => commands::process::run(config).await,
        Commands::Analyze => commands::analyze::run(config).await,
    }
}
