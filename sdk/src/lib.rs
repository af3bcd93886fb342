//! Serum Book SDK - decoder for Serum DEX order books.
//!
//! A Serum market keeps each side of its book in a slab account: a flat
//! array of fixed-width nodes forming a critbit tree keyed by price and
//! sequence number. This crate decodes those accounts, walks them in price
//! order, aggregates the walk into price levels and converts lot-denominated
//! values into token units.
//!
//! # Core Types
//!
//! - [`Orderbook`] — A decoded bids or asks slab
//! - [`SlabNode`], [`LeafNode`] — Slab records and resting orders
//! - [`MarketV2`], [`Mint`] — Market state and token mints
//! - [`MarketMeta`] — Market plus mints, with lot conversions
//! - [`BookLevel`], [`PriceLevel`] — Aggregated levels in lots and tokens
//!
//! # Example
//!
//! ```rust
//! use std::ops::ControlFlow;
//! use serum_book_sdk::{Orderbook, SdkError};
//!
//! fn best_ask(data: &[u8]) -> Result<Option<u64>, SdkError> {
//!     let book = Orderbook::decode(data)?;
//!     let mut best = None;
//!     book.items(true, |leaf| {
//!         best = Some(leaf.price());
//!         ControlFlow::Break(())
//!     })?;
//!     Ok(best)
//! }
//! ```

pub mod client;
pub mod codec;
pub mod error;
pub mod registry;
pub mod state;
pub mod types;

pub use client::{fetch_book, fetch_market, AccountFetcher, ClientConfig, ClientError, RpcClient};
pub use error::{CorruptionReason, SdkError};
pub use registry::{DexVersion, MarketRegistry, RegistryEntry};
pub use state::{
    AccountFlags, EventQueue, InnerNode, LeafNode, MarketV2, Mint, OrderId, Orderbook, SlabNode,
};
pub use types::{BookLevel, BookSnapshot, MarketMeta, Price, PriceLevel, Quantity, Side};
