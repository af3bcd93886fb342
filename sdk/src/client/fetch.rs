//! Market and book fetching.
//!
//! The network is reached only through [`AccountFetcher`]. Everything after
//! the bytes arrive is the pure decode and traversal layer.

use std::future::Future;

use chrono::Utc;
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, warn};

use super::error::ClientError;
use crate::error::SdkError;
use crate::state::{MarketV2, Mint, Orderbook, MARKET_V2_SIZE};
use crate::types::{BookSnapshot, MarketMeta, Side};

/// Source of raw account bytes.
///
/// Timeouts, retries and cancellation are the implementor's business.
pub trait AccountFetcher {
    /// Returns the data of the account at `address`.
    fn get_account_data(
        &self,
        address: &Pubkey,
    ) -> impl Future<Output = Result<Vec<u8>, ClientError>> + Send;
}

/// Fetches a market and the mints of both of its tokens.
///
/// # Errors
///
/// Returns `ClientError::Decode` wrapping `SdkError::UnsupportedAccountSize`
/// if the market account is not a MarketV2, and fetch or decode errors for
/// the market and its mints.
pub async fn fetch_market<F: AccountFetcher>(
    fetcher: &F,
    address: &Pubkey,
) -> Result<MarketMeta, ClientError> {
    let data = fetcher.get_account_data(address).await?;
    if data.len() != MARKET_V2_SIZE {
        return Err(SdkError::UnsupportedAccountSize(data.len()).into());
    }
    let market = MarketV2::decode(&data)?;
    if !market.is_initialized_market() {
        warn!(%address, flags = %market.account_flags, "market account flags unexpected");
    }

    let (base, quote) = tokio::try_join!(
        fetcher.get_account_data(&market.base_mint),
        fetcher.get_account_data(&market.quote_mint),
    )?;
    let base_mint = Mint::decode(&base)?;
    let quote_mint = Mint::decode(&quote)?;

    debug!(
        %address,
        base_decimals = base_mint.decimals,
        quote_decimals = quote_mint.decimals,
        base_lot_size = market.base_lot_size,
        quote_lot_size = market.quote_lot_size,
        "loaded market"
    );
    Ok(MarketMeta::new(*address, market, base_mint, quote_mint))
}

/// Fetches and decodes one side of a book.
///
/// # Errors
///
/// Returns fetch errors and `ClientError::Decode` for malformed slabs.
pub async fn fetch_orderbook<F: AccountFetcher>(
    fetcher: &F,
    address: &Pubkey,
) -> Result<Orderbook, ClientError> {
    let data = fetcher.get_account_data(address).await?;
    let book = Orderbook::decode(&data)?;
    debug!(
        %address,
        bump_index = book.header.bump_index,
        leaf_count = book.header.leaf_count,
        "decoded slab"
    );
    Ok(book)
}

/// Fetches both sides of a market's book and aggregates the best `depth`
/// levels of each.
///
/// Bids are walked from the highest price down, asks from the lowest up.
///
/// # Errors
///
/// Returns fetch errors and `ClientError::Decode` for malformed slabs.
pub async fn fetch_book<F: AccountFetcher>(
    fetcher: &F,
    meta: &MarketMeta,
    depth: usize,
) -> Result<BookSnapshot, ClientError> {
    let (bids, asks) = tokio::try_join!(
        fetch_orderbook(fetcher, &meta.market.bids),
        fetch_orderbook(fetcher, &meta.market.asks),
    )?;

    for (book, side) in [(&bids, Side::Bid), (&asks, Side::Ask)] {
        if book.side() != Some(side) {
            warn!(market = %meta.address, %side, flags = %book.account_flags, "slab flags do not match side");
        }
    }

    let snapshot = BookSnapshot {
        market: meta.address,
        bids: bids.levels(Side::Bid.best_first(), depth)?,
        asks: asks.levels(Side::Ask.best_first(), depth)?,
        timestamp: Utc::now(),
    };
    info!(
        market = %meta.address,
        bid_levels = snapshot.bids.len(),
        ask_levels = snapshot.asks.len(),
        "book snapshot"
    );
    Ok(snapshot)
}
