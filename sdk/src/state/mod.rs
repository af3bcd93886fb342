//! On-chain Serum account layouts.
//!
//! Every decoder here is a pure function of an account's raw bytes and
//! returns an owned value. Nothing is decoded lazily and no I/O happens.

pub mod account_flags;
pub mod event_queue;
pub mod market_v2;
pub mod mint;
pub mod node;
pub mod slab;
pub mod traversal;

#[cfg(any(test, feature = "test-utils"))]
pub mod fixtures;

pub use account_flags::AccountFlags;
pub use event_queue::{Event, EventFlags, EventQueue};
pub use market_v2::{MarketV2, MARKET_V2_SIZE};
pub use mint::Mint;
pub use node::{FreeNode, InnerNode, LeafNode, OrderId, SlabNode};
pub use slab::{Orderbook, SlabHeader};
pub use traversal::{coalesce_levels, Leaves};
