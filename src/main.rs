use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use tracing::info;

mod analysis;
mod config;
mod dashboard;
mod error;
mod pipeline;
mod sheet;
mod table;
mod tba;

use config::Config;
use dashboard::{AppState, SessionStore};
use sheet::SheetClient;
use tba::{MetricLocator, TbaClient};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialise tracing / logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    config.validate()?;

    let timeout = Duration::from_secs(config.fetch_timeout_secs);
    let tba = TbaClient::new(&config.tba_base_url, &config.season, timeout)?;
    let sheet = SheetClient::new(&config.sheet_url, timeout)?;
    let locator = MetricLocator {
        marker: config.opr_marker.clone(),
        segment: config.opr_segment,
    };
    info!(
        "Scraping {} (season {}), OPR locator: marker '{}' segment {}",
        config.tba_base_url, config.season, locator.marker, locator.segment
    );

    let state = AppState {
        tba,
        sheet,
        locator,
        sessions: SessionStore::new(config.max_sessions),
    };
    let app = dashboard::router(state);

    let addr: SocketAddr = config.listen_addr.parse()?;
    info!("Listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
