//! Account fetching.
//!
//! [`AccountFetcher`] is the only seam between the decode layer and the
//! network. [`RpcClient`] implements it over Solana JSON-RPC; tests and
//! callers with their own transport can supply any other implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use serum_book_sdk::client::{fetch_book, fetch_market, RpcClient};
//! use serum_book_sdk::codec::parse_pubkey;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let rpc = RpcClient::with_url("https://api.mainnet-beta.solana.com")?;
//!     let address = parse_pubkey("9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT")?;
//!
//!     let meta = fetch_market(&rpc, &address).await?;
//!     let book = fetch_book(&rpc, &meta, 10).await?;
//!     for level in meta.levels_to_number(&book.asks)? {
//!         println!("{}", level);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod fetch;
pub mod rpc;

pub use config::{ClientConfig, Commitment};
pub use error::ClientError;
pub use fetch::{fetch_book, fetch_market, fetch_orderbook, AccountFetcher};
pub use rpc::{AccountData, RpcClient};
