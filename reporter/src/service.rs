//! Reporter service.
//!
//! Loads a market once, then polls both sides of its book and logs the best
//! levels in token units until stopped.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use serum_book_sdk::codec::serde_pubkey;
use serum_book_sdk::{
    fetch_book, fetch_market, AccountFetcher, ClientError, MarketMeta, MarketRegistry, PriceLevel,
    SdkError,
};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use super::config::{ConfigError, ReporterConfig};
use super::stats::ReportStats;

/// Errors raised by the reporter service.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Invalid configuration.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Fetching accounts failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Converting levels to token units failed.
    #[error("conversion failed: {0}")]
    Conversion(#[from] SdkError),
}

/// One poll's worth of book data in token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookReport {
    /// Market address.
    #[serde(with = "serde_pubkey")]
    pub market: Pubkey,

    /// Registry name, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Bid levels, best first.
    pub bids: Vec<PriceLevel>,

    /// Ask levels, best first.
    pub asks: Vec<PriceLevel>,

    /// Best ask minus best bid, in quote tokens. `None` when a side is
    /// empty or the bid is above the ask.
    pub spread: Option<Decimal>,

    /// True if the best bid is at or above the best ask.
    pub crossed: bool,

    /// When the book was fetched.
    pub timestamp: DateTime<Utc>,
}

impl fmt::Display for BookReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => writeln!(f, "{} ({}) at {}", name, self.market, self.timestamp)?,
            None => writeln!(f, "{} at {}", self.market, self.timestamp)?,
        }
        writeln!(f, "  Asks:")?;
        for level in self.asks.iter().rev() {
            writeln!(f, "    {}", level)?;
        }
        writeln!(f, "  Bids:")?;
        for level in &self.bids {
            writeln!(f, "    {}", level)?;
        }
        Ok(())
    }
}

/// The reporter service.
pub struct ReportService<F> {
    /// Configuration.
    config: ReporterConfig,

    /// Account source.
    fetcher: F,

    /// Market metadata loaded at startup.
    meta: MarketMeta,

    /// Counters.
    stats: Arc<ReportStats>,

    /// Whether the service is running.
    running: Arc<AtomicBool>,
}

impl<F: AccountFetcher> ReportService<F> {
    /// Creates a service for already-loaded market metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(config: ReporterConfig, fetcher: F, meta: MarketMeta) -> Result<Self, ServiceError> {
        config.validate()?;
        Ok(Self {
            config,
            fetcher,
            meta,
            stats: Arc::new(ReportStats::new()),
            running: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Resolves the configured market, loads its metadata and creates the
    /// service. Registry names are attached when the registry knows the
    /// market.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, the market cannot
    /// be resolved, or the market or its mints cannot be fetched.
    pub async fn connect(
        config: ReporterConfig,
        fetcher: F,
        registry: Option<&MarketRegistry>,
    ) -> Result<Self, ServiceError> {
        config.validate()?;
        let address = config.resolve_market(registry)?;

        let mut meta = fetch_market(&fetcher, &address).await?;
        if let Some(entry) = registry.and_then(|registry| registry.by_address(&address)) {
            meta = entry.annotate(meta);
            if meta.deprecated {
                warn!(market = %address, name = %entry.name, "market is deprecated");
            }
        }
        info!(market = %meta, "market loaded");

        Self::new(config, fetcher, meta)
    }

    /// Returns the market metadata.
    #[must_use]
    pub const fn meta(&self) -> &MarketMeta {
        &self.meta
    }

    /// Returns the counters.
    #[must_use]
    pub fn stats(&self) -> Arc<ReportStats> {
        Arc::clone(&self.stats)
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &ReporterConfig {
        &self.config
    }

    /// Returns true if the service is running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Relaxed)
    }

    /// Stops the service after the current cycle.
    pub fn stop(&self) {
        self.running.store(false, Ordering::Relaxed);
        info!("Reporter stop requested");
    }

    /// Polls until stopped. Failed polls are logged and counted.
    pub async fn run(&self) {
        self.running.store(true, Ordering::Relaxed);
        info!(
            market = %self.meta.address,
            depth = self.config.depth,
            poll_interval_ms = self.config.poll_interval_ms,
            "Reporter started"
        );

        let poll_interval = Duration::from_millis(self.config.poll_interval_ms);

        while self.is_running() {
            if let Err(e) = self.poll_once().await {
                warn!(market = %self.meta.address, error = %e, "poll failed");
            }
            tokio::time::sleep(poll_interval).await;
        }

        info!(stats = ?self.stats.snapshot(), "Reporter stopped");
    }

    /// Runs a single poll cycle and logs the result.
    ///
    /// # Errors
    ///
    /// Returns an error if either side cannot be fetched or decoded, or a
    /// level cannot be converted.
    pub async fn poll_once(&self) -> Result<BookReport, ServiceError> {
        self.stats.record_poll();

        let report = self.build_report().await.inspect_err(|_| {
            self.stats.record_failure();
        })?;
        self.stats.record_report(report.crossed);

        let market = report.name.as_deref().unwrap_or("market");
        info!(
            %market,
            best_bid = ?report.bids.first().map(|l| l.price),
            best_ask = ?report.asks.first().map(|l| l.price),
            spread = ?report.spread,
            "top of book"
        );
        if report.crossed {
            warn!(%market, "book is crossed");
        }
        for level in &report.asks {
            debug!(side = "ask", price = %level.price, size = %level.size, orders = level.order_count, "level");
        }
        for level in &report.bids {
            debug!(side = "bid", price = %level.price, size = %level.size, orders = level.order_count, "level");
        }

        Ok(report)
    }

    async fn build_report(&self) -> Result<BookReport, ServiceError> {
        let snapshot = fetch_book(&self.fetcher, &self.meta, self.config.depth).await?;

        let spread = snapshot
            .spread()
            .map(|lots| self.meta.price_lots_to_number(lots.value()))
            .transpose()?;

        Ok(BookReport {
            market: self.meta.address,
            name: self.meta.name.clone(),
            bids: self.meta.levels_to_number(&snapshot.bids)?,
            asks: self.meta.levels_to_number(&snapshot.asks)?,
            spread,
            crossed: snapshot.is_crossed(),
            timestamp: snapshot.timestamp,
        })
    }
}
