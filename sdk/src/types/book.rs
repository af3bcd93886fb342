//! Aggregated book levels and snapshots.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::primitives::{Price, Quantity, Side};
use crate::codec::serde_pubkey;
use crate::error::SdkError;

/// All resting size at one exact lot price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookLevel {
    /// Price in quote lots per base lot.
    pub price: Price,

    /// Total size in base lots.
    pub quantity: Quantity,

    /// Number of orders coalesced into this level.
    pub order_count: u32,
}

impl BookLevel {
    /// Starts a level from a single order.
    #[must_use]
    pub const fn new(price: Price, quantity: Quantity) -> Self {
        Self {
            price,
            quantity,
            order_count: 1,
        }
    }

    /// Adds one more order at the same price.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Overflow` if the summed size does not fit a `u64`.
    pub fn absorb(&mut self, quantity: Quantity) -> Result<(), SdkError> {
        self.quantity = self.quantity.checked_add(quantity)?;
        self.order_count = self.order_count.saturating_add(1);
        Ok(())
    }
}

impl fmt::Display for BookLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({} orders)",
            self.quantity, self.price, self.order_count
        )
    }
}

/// A level converted to human units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceLevel {
    /// Quote tokens per base token.
    pub price: Decimal,

    /// Base tokens.
    pub size: Decimal,

    /// Number of orders at this price.
    pub order_count: u32,
}

impl fmt::Display for PriceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} @ {} ({} orders)",
            self.size, self.price, self.order_count
        )
    }
}

/// Both sides of a market's book, in lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookSnapshot {
    /// Market address.
    #[serde(with = "serde_pubkey")]
    pub market: Pubkey,

    /// Bid levels, best (highest) first.
    pub bids: Vec<BookLevel>,

    /// Ask levels, best (lowest) first.
    pub asks: Vec<BookLevel>,

    /// When the accounts were fetched.
    pub timestamp: DateTime<Utc>,
}

impl BookSnapshot {
    /// Returns the levels of one side.
    #[must_use]
    pub fn levels(&self, side: Side) -> &[BookLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    /// Returns the best bid level.
    #[must_use]
    pub fn best_bid(&self) -> Option<&BookLevel> {
        self.bids.first()
    }

    /// Returns the best ask level.
    #[must_use]
    pub fn best_ask(&self) -> Option<&BookLevel> {
        self.asks.first()
    }

    /// Returns best ask minus best bid in lots.
    ///
    /// `None` if a side is empty or the bid is above the ask.
    #[must_use]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => ask.price.checked_sub(bid.price),
            _ => None,
        }
    }

    /// Returns true if the best bid is at or above the best ask.
    #[must_use]
    pub fn is_crossed(&self) -> bool {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid.price >= ask.price,
            _ => false,
        }
    }

    /// Sums the size of the first `depth` levels of one side.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Overflow` if the sum does not fit a `u64`.
    pub fn total_quantity(&self, side: Side, depth: usize) -> Result<Quantity, SdkError> {
        self.levels(side)
            .iter()
            .take(depth)
            .try_fold(Quantity::zero(), |acc, level| acc.checked_add(level.quantity))
    }

    /// Returns true if neither side has any level.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }
}

impl fmt::Display for BookSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Book {} at {}", self.market, self.timestamp)?;
        writeln!(f, "  Asks:")?;
        for level in self.asks.iter().rev() {
            writeln!(f, "    {}", level)?;
        }
        writeln!(f, "  ---")?;
        writeln!(f, "  Bids:")?;
        for level in &self.bids {
            writeln!(f, "    {}", level)?;
        }
        Ok(())
    }
}
