//! Serum Book Reporter binary.
//!
//! Logs the top of a Serum market's book on a poll interval until Ctrl-C.

use anyhow::Context;
use serum_book_reporter::{ReportService, ReporterConfig};
use serum_book_sdk::RpcClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,serum_book_reporter=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ReporterConfig::from_env().context("reading configuration")?;
    config.validate().context("validating configuration")?;
    let registry = config.load_registry()?;

    tracing::info!(
        rpc_url = %config.rpc_url,
        market = %config.market,
        depth = config.depth,
        "Starting Serum book reporter"
    );

    let rpc = RpcClient::new(config.client_config())?;
    let service = ReportService::connect(config, rpc, registry.as_ref())
        .await
        .context("loading market")?;

    tokio::select! {
        () = service.run() => {}
        result = tokio::signal::ctrl_c() => {
            result.context("waiting for Ctrl-C")?;
            service.stop();
        }
    }
    tracing::info!(stats = ?service.stats().snapshot(), "Shutting down reporter");

    Ok(())
}
