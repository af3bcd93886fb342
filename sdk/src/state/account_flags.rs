//! Serum account flags.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Bit set stored in the first word of every Serum account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountFlags(pub u64);

impl AccountFlags {
    /// Account has been initialized.
    pub const INITIALIZED: u64 = 1 << 0;
    /// Market state account.
    pub const MARKET: u64 = 1 << 1;
    /// Open orders account.
    pub const OPEN_ORDERS: u64 = 1 << 2;
    /// Request queue account.
    pub const REQUEST_QUEUE: u64 = 1 << 3;
    /// Event queue account.
    pub const EVENT_QUEUE: u64 = 1 << 4;
    /// Bids slab account.
    pub const BIDS: u64 = 1 << 5;
    /// Asks slab account.
    pub const ASKS: u64 = 1 << 6;
    /// Market disabled.
    pub const DISABLED: u64 = 1 << 7;

    const NAMES: [(u64, &'static str); 8] = [
        (Self::INITIALIZED, "initialized"),
        (Self::MARKET, "market"),
        (Self::OPEN_ORDERS, "open_orders"),
        (Self::REQUEST_QUEUE, "request_queue"),
        (Self::EVENT_QUEUE, "event_queue"),
        (Self::BIDS, "bids"),
        (Self::ASKS, "asks"),
        (Self::DISABLED, "disabled"),
    ];

    /// Returns true if every bit of `flag` is set.
    #[must_use]
    pub const fn is(&self, flag: u64) -> bool {
        self.0 & flag == flag
    }

    /// Returns the raw value.
    #[must_use]
    pub const fn bits(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for AccountFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMES
            .iter()
            .filter(|(flag, _)| self.is(*flag))
            .map(|(_, name)| *name)
            .collect();
        if names.is_empty() {
            write!(f, "none")
        } else {
            write!(f, "{}", names.join(" | "))
        }
    }
}
