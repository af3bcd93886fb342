//! Serum market state account (version 2 layout).

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::account_flags::AccountFlags;
use super::slab::{ACCOUNT_HEAD_PADDING, ACCOUNT_TAIL_PADDING};
use crate::codec::{serde_pubkey, AccountReader};
use crate::error::SdkError;

/// Exact size of a MarketV2 account.
pub const MARKET_V2_SIZE: usize = 388;

/// Decoded market state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketV2 {
    /// Account flags; `INITIALIZED | MARKET` for a live market.
    pub account_flags: AccountFlags,

    /// Address of this market account.
    #[serde(with = "serde_pubkey")]
    pub own_address: Pubkey,

    /// Nonce of the vault signer PDA.
    pub vault_signer_nonce: u64,

    /// Base token mint.
    #[serde(with = "serde_pubkey")]
    pub base_mint: Pubkey,

    /// Quote token mint.
    #[serde(with = "serde_pubkey")]
    pub quote_mint: Pubkey,

    /// Base token vault.
    #[serde(with = "serde_pubkey")]
    pub base_vault: Pubkey,

    /// Native base tokens deposited.
    pub base_deposits_total: u64,

    /// Native base fees accrued.
    pub base_fees_accrued: u64,

    /// Quote token vault.
    #[serde(with = "serde_pubkey")]
    pub quote_vault: Pubkey,

    /// Native quote tokens deposited.
    pub quote_deposits_total: u64,

    /// Native quote fees accrued.
    pub quote_fees_accrued: u64,

    /// Quote dust threshold.
    pub quote_dust_threshold: u64,

    /// Request queue account.
    #[serde(with = "serde_pubkey")]
    pub request_queue: Pubkey,

    /// Event queue account.
    #[serde(with = "serde_pubkey")]
    pub event_queue: Pubkey,

    /// Bids slab account.
    #[serde(with = "serde_pubkey")]
    pub bids: Pubkey,

    /// Asks slab account.
    #[serde(with = "serde_pubkey")]
    pub asks: Pubkey,

    /// Native base tokens per base lot.
    pub base_lot_size: u64,

    /// Native quote tokens per quote lot.
    pub quote_lot_size: u64,

    /// Taker fee rate in basis points.
    pub fee_rate_bps: u64,

    /// Referrer rebates accrued.
    pub referrer_rebates_accrued: u64,
}

impl MarketV2 {
    /// Decodes a market account.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::UnsupportedAccountSize` unless `data` is exactly
    /// [`MARKET_V2_SIZE`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self, SdkError> {
        if data.len() != MARKET_V2_SIZE {
            return Err(SdkError::UnsupportedAccountSize(data.len()));
        }

        let mut r = AccountReader::new(data);
        r.skip(ACCOUNT_HEAD_PADDING.len())?;
        let market = Self {
            account_flags: AccountFlags(r.read_u64()?),
            own_address: r.read_pubkey()?,
            vault_signer_nonce: r.read_u64()?,
            base_mint: r.read_pubkey()?,
            quote_mint: r.read_pubkey()?,
            base_vault: r.read_pubkey()?,
            base_deposits_total: r.read_u64()?,
            base_fees_accrued: r.read_u64()?,
            quote_vault: r.read_pubkey()?,
            quote_deposits_total: r.read_u64()?,
            quote_fees_accrued: r.read_u64()?,
            quote_dust_threshold: r.read_u64()?,
            request_queue: r.read_pubkey()?,
            event_queue: r.read_pubkey()?,
            bids: r.read_pubkey()?,
            asks: r.read_pubkey()?,
            base_lot_size: r.read_u64()?,
            quote_lot_size: r.read_u64()?,
            fee_rate_bps: r.read_u64()?,
            referrer_rebates_accrued: r.read_u64()?,
        };
        r.skip(ACCOUNT_TAIL_PADDING.len())?;
        Ok(market)
    }

    /// Returns true if the flags mark an initialized market.
    #[must_use]
    pub const fn is_initialized_market(&self) -> bool {
        self.account_flags
            .is(AccountFlags::INITIALIZED | AccountFlags::MARKET)
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::state::fixtures::market_bytes;

    fn key(s: &str) -> Pubkey {
        Pubkey::from_str(s).expect("pubkey")
    }

    #[test]
    fn test_decode_mainnet_market() {
        let market = MarketV2::decode(&market_bytes()).expect("decode");

        assert_eq!(market.account_flags, AccountFlags(3));
        assert!(market.is_initialized_market());
        assert_eq!(
            market.own_address,
            key("7LVJtqSrF6RudMaz5rKGTmR3F3V5TKoDcN6bnk68biYZ")
        );
        assert_eq!(market.vault_signer_nonce, 1);
        assert_eq!(
            market.base_mint,
            key("AR1Mtgh7zAtxuxGd2XPovXPVjcSdY3i4rQYisNadjfKy")
        );
        assert_eq!(
            market.quote_mint,
            key("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
        );
        assert_eq!(
            market.base_vault,
            key("87a8TfnDvt6eAM5ghbL3ZPzcbjbxoZAfdAFJqSBiPCh9")
        );
        assert_eq!(market.base_deposits_total, 13_557_000_000);
        assert_eq!(market.base_fees_accrued, 0);
        assert_eq!(
            market.quote_vault,
            key("4hdpAaBAyJsEiBMuobdKTqgcVy4MhJsk5ByxjF6p8z8q")
        );
        assert_eq!(market.quote_deposits_total, 19_599_552_825);
        assert_eq!(market.quote_fees_accrued, 219_687_450);
        assert_eq!(market.quote_dust_threshold, 100);
        assert_eq!(
            market.request_queue,
            key("CiKK9fAUhv8sUesC39FeUk69eHnHeGKxTMqdoUAR5eSF")
        );
        assert_eq!(
            market.event_queue,
            key("13iGJcA4w5hcJZDjJbJQor1zUiDLE4jv2rMW9HkD5Eo1")
        );
        assert_eq!(
            market.bids,
            key("4eV5nNQWQRYTNXUYE8tzsLk3zwTBQ6Wh9fvMGKh3jPU3")
        );
        assert_eq!(
            market.asks,
            key("GfVFWDFt5gv5uQSy2gGo9EfcU1aDmajGFrYWef2s2ZQB")
        );
        assert_eq!(market.base_lot_size, 10_000);
        assert_eq!(market.quote_lot_size, 10);
        assert_eq!(market.fee_rate_bps, 0);
        assert_eq!(market.referrer_rebates_accrued, 11_211);
    }

    #[test]
    fn test_rejects_other_sizes() {
        let bytes = market_bytes();
        assert_eq!(
            MarketV2::decode(&bytes[..MARKET_V2_SIZE - 1]),
            Err(SdkError::UnsupportedAccountSize(387))
        );
        let mut longer = bytes;
        longer.push(0);
        assert_eq!(
            MarketV2::decode(&longer),
            Err(SdkError::UnsupportedAccountSize(389))
        );
    }

    #[test]
    fn test_json_uses_base58() {
        let market = MarketV2::decode(&market_bytes()).expect("decode");
        let json = serde_json::to_value(&market).expect("serialize");
        assert_eq!(json["bids"], "4eV5nNQWQRYTNXUYE8tzsLk3zwTBQ6Wh9fvMGKh3jPU3");
        assert_eq!(json["baseLotSize"], 10_000);

        let parsed: MarketV2 = serde_json::from_value(json).expect("deserialize");
        assert_eq!(parsed, market);
    }
}
