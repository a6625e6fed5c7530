mod app;
mod capture;
mod config;
mod error;
mod host;
mod lookup;
mod messages;
mod notification;
mod services;
mod shortcuts;
mod stores;
mod telemetry;

use app::App;
use config::Config;

use anyhow::Result;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Starting SnapOdds");

    let config = Config::load()?;
    config.validate()?;

    App::new(config)?.run().await
}
