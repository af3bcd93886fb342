//! Book and market value types.
//!
//! Lot-denominated values ([`Price`], [`Quantity`], [`BookLevel`],
//! [`BookSnapshot`]) come straight out of a decoded slab. [`MarketMeta`]
//! turns them into token units ([`PriceLevel`]).

pub mod book;
pub mod market;
pub mod primitives;

pub use book::{BookLevel, BookSnapshot, PriceLevel};
pub use market::MarketMeta;
pub use primitives::{Price, Quantity, Side};
