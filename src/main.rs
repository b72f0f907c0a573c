mod assets;
mod bundle;
mod config;
mod dom;
mod polling;
mod render;
mod scores;
mod server;
mod source;
mod templates;

use crate::config::{AppConfig, Overrides};
use crate::server::AppState;
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Run the FAIR EVA web client
#[derive(Debug, Parser)]
#[command(name = "fair-eva-web", version, about)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let mut config = AppConfig::from_env()?;
    config.apply_overrides(&cli.overrides);

    let state = AppState::from_config(config.clone())?;

    let addr = config.resolve_bind_addr().await?;
    tracing::info!(%addr, dev_mode = config.dev_mode, "starting fair-eva-web server");
    server::run(addr, state).await?;
    Ok(())
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init();
}
