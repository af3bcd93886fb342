//! Lot-denominated primitives.
//!
//! Serum stores prices as quote lots per base lot and sizes as base lots.
//! These wrappers keep the two apart until a [`MarketMeta`] converts them.
//!
//! [`MarketMeta`]: super::market::MarketMeta

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::SdkError;

/// A limit price in quote lots per base lot.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Price(u64);

impl Price {
    /// Wraps a raw lot price.
    #[must_use]
    pub const fn new(lots: u64) -> Self {
        Self(lots)
    }

    /// Returns the raw lot price.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns `self - other`, or `None` if `other` is higher.
    #[must_use]
    pub const fn checked_sub(self, other: Self) -> Option<Self> {
        match self.0.checked_sub(other.0) {
            Some(diff) => Some(Self(diff)),
            None => None,
        }
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Price {
    fn from(lots: u64) -> Self {
        Self(lots)
    }
}

impl From<Price> for u64 {
    fn from(price: Price) -> Self {
        price.0
    }
}

/// A size in base lots.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Quantity(u64);

impl Quantity {
    /// Wraps a raw lot size.
    #[must_use]
    pub const fn new(lots: u64) -> Self {
        Self(lots)
    }

    /// Returns the raw lot size.
    #[must_use]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Returns zero lots.
    #[must_use]
    pub const fn zero() -> Self {
        Self(0)
    }

    /// Returns true if the size is zero.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checked addition.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Overflow` if the sum does not fit a `u64`.
    pub fn checked_add(self, other: Self) -> Result<Self, SdkError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or(SdkError::Overflow)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Quantity {
    fn from(lots: u64) -> Self {
        Self(lots)
    }
}

impl From<Quantity> for u64 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    /// Buy side.
    Bid,
    /// Sell side.
    Ask,
}

impl Side {
    /// Returns true for the buy side.
    #[must_use]
    pub const fn is_bid(&self) -> bool {
        matches!(self, Self::Bid)
    }

    /// Returns the opposite side.
    #[must_use]
    pub const fn opposite(&self) -> Self {
        match self {
            Self::Bid => Self::Ask,
            Self::Ask => Self::Bid,
        }
    }

    /// Returns the traversal direction that yields best prices first.
    ///
    /// Bids are walked from the highest price down, asks from the lowest up.
    #[must_use]
    pub const fn best_first(&self) -> bool {
        match self {
            Self::Bid => false,
            Self::Ask => true,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bid => write!(f, "bid"),
            Self::Ask => write!(f, "ask"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_price_accessors() {
        let price = Price::new(1827);
        assert_eq!(price.value(), 1827);
        assert_eq!(u64::from(price), 1827);
        assert_eq!(Price::new(9).checked_sub(Price::from(5u64)), Some(Price::new(4)));
        assert_eq!(Price::new(5).checked_sub(Price::new(9)), None);
        assert_eq!(price.to_string(), "1827");
    }

    #[test]
    fn test_quantity_checked_add() {
        let a = Quantity::new(100);
        assert_eq!(a.checked_add(Quantity::new(50)), Ok(Quantity::new(150)));
        assert_eq!(
            Quantity::new(u64::MAX).checked_add(Quantity::new(1)),
            Err(SdkError::Overflow)
        );
        assert!(Quantity::zero().is_zero());
    }

    #[test]
    fn test_side() {
        assert!(Side::Bid.is_bid());
        assert_eq!(Side::Bid.opposite(), Side::Ask);
        assert!(!Side::Bid.best_first());
        assert!(Side::Ask.best_first());
        assert_eq!(Side::Ask.to_string(), "ask");
    }

    #[test]
    fn test_serde() {
        assert_eq!(
            serde_json::to_string(&Price::new(1000)).expect("serialize"),
            "1000"
        );
        assert_eq!(
            serde_json::to_string(&Side::Bid).expect("serialize"),
            "\"bid\""
        );
        let parsed: Quantity = serde_json::from_str("500").expect("deserialize");
        assert_eq!(parsed, Quantity::new(500));
    }
}
