//! Market metadata and lot conversions.
//!
//! Serum prices are quote lots per base lot and sizes are base lots. Turning
//! them into token units multiplies lot sizes by powers of ten of the mint
//! decimals, which can exceed 64 bits long before the division brings the
//! value back down. All products are taken in `U256`; only the final
//! quotient becomes a [`Decimal`].

use std::fmt;

use alloy_primitives::U256;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::book::{BookLevel, PriceLevel};
use crate::codec::serde_pubkey;
use crate::error::SdkError;
use crate::state::{MarketV2, Mint};

/// Most fractional digits kept when a quotient is not exact.
pub const MAX_FRACTION_DIGITS: u32 = 18;

/// A decoded market together with the mints needed to interpret its lots.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketMeta {
    /// Market account address.
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,

    /// Registry name, e.g. `"SOL/USDC"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Whether the registry marks this market deprecated.
    #[serde(default)]
    pub deprecated: bool,

    /// Market state.
    pub market: MarketV2,

    /// Base token mint.
    pub base_mint: Mint,

    /// Quote token mint.
    pub quote_mint: Mint,
}

impl MarketMeta {
    /// Creates metadata for an unnamed market.
    #[must_use]
    pub fn new(address: Pubkey, market: MarketV2, base_mint: Mint, quote_mint: Mint) -> Self {
        Self {
            address,
            name: None,
            deprecated: false,
            market,
            base_mint,
            quote_mint,
        }
    }

    /// Sets the registry name.
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the deprecated flag.
    #[must_use]
    pub const fn with_deprecated(mut self, deprecated: bool) -> Self {
        self.deprecated = deprecated;
        self
    }

    /// Base token decimals.
    #[must_use]
    pub const fn base_decimals(&self) -> u8 {
        self.base_mint.decimals
    }

    /// Quote token decimals.
    #[must_use]
    pub const fn quote_decimals(&self) -> u8 {
        self.quote_mint.decimals
    }

    /// Converts a lot price to quote tokens per base token.
    ///
    /// `lots * quote_lot_size * 10^base_decimals / (base_lot_size * 10^quote_decimals)`
    ///
    /// # Errors
    ///
    /// Returns `SdkError::DivisionByZero` if `base_lot_size` is zero, and
    /// `SdkError::ConversionOverflow` if the result does not fit a `Decimal`.
    pub fn price_lots_to_number(&self, lots: u64) -> Result<Decimal, SdkError> {
        let numerator = product(&[
            U256::from(lots),
            U256::from(self.market.quote_lot_size),
            pow10(u32::from(self.base_decimals()))?,
        ])?;
        let denominator = product(&[
            U256::from(self.market.base_lot_size),
            pow10(u32::from(self.quote_decimals()))?,
        ])?;
        ratio_to_decimal(numerator, denominator)
    }

    /// Converts a size in base lots to base tokens.
    ///
    /// `lots * base_lot_size / 10^base_decimals`
    ///
    /// # Errors
    ///
    /// Returns `SdkError::ConversionOverflow` if the result does not fit a
    /// `Decimal`.
    pub fn base_size_lots_to_number(&self, lots: u64) -> Result<Decimal, SdkError> {
        let numerator = product(&[U256::from(lots), U256::from(self.market.base_lot_size)])?;
        ratio_to_decimal(numerator, pow10(u32::from(self.base_decimals()))?)
    }

    /// Converts a price in quote tokens per base token to lots, truncating.
    ///
    /// `price * base_lot_size * 10^quote_decimals / (quote_lot_size * 10^base_decimals)`
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidPrice` for a negative price,
    /// `SdkError::DivisionByZero` if `quote_lot_size` is zero, and
    /// `SdkError::ConversionOverflow` if the result does not fit a `u64`.
    pub fn price_number_to_lots(&self, price: Decimal) -> Result<u64, SdkError> {
        let (mantissa, scale) =
            unsigned_parts(price).ok_or_else(|| SdkError::InvalidPrice(price.to_string()))?;
        let numerator = product(&[
            mantissa,
            U256::from(self.market.base_lot_size),
            pow10(u32::from(self.quote_decimals()))?,
        ])?;
        let denominator = product(&[
            scale,
            U256::from(self.market.quote_lot_size),
            pow10(u32::from(self.base_decimals()))?,
        ])?;
        ratio_to_lots(numerator, denominator)
    }

    /// Converts a size in base tokens to base lots, truncating.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::InvalidPrice` for a negative size,
    /// `SdkError::DivisionByZero` if `base_lot_size` is zero, and
    /// `SdkError::ConversionOverflow` if the result does not fit a `u64`.
    pub fn base_size_number_to_lots(&self, size: Decimal) -> Result<u64, SdkError> {
        let (mantissa, scale) =
            unsigned_parts(size).ok_or_else(|| SdkError::InvalidPrice(size.to_string()))?;
        let numerator = product(&[mantissa, pow10(u32::from(self.base_decimals()))?])?;
        let denominator = product(&[scale, U256::from(self.market.base_lot_size)])?;
        ratio_to_lots(numerator, denominator)
    }

    /// Smallest price increment in quote tokens.
    ///
    /// # Errors
    ///
    /// Same as [`MarketMeta::price_lots_to_number`].
    pub fn tick_size(&self) -> Result<Decimal, SdkError> {
        self.price_lots_to_number(1)
    }

    /// Smallest order size in base tokens.
    ///
    /// # Errors
    ///
    /// Same as [`MarketMeta::base_size_lots_to_number`].
    pub fn min_order_size(&self) -> Result<Decimal, SdkError> {
        self.base_size_lots_to_number(1)
    }

    /// Converts an aggregated lot level to token units.
    ///
    /// # Errors
    ///
    /// Propagates conversion errors.
    pub fn level_to_number(&self, level: &BookLevel) -> Result<PriceLevel, SdkError> {
        Ok(PriceLevel {
            price: self.price_lots_to_number(level.price.value())?,
            size: self.base_size_lots_to_number(level.quantity.value())?,
            order_count: level.order_count,
        })
    }

    /// Converts a run of lot levels to token units.
    ///
    /// # Errors
    ///
    /// Returns the first conversion error.
    pub fn levels_to_number(&self, levels: &[BookLevel]) -> Result<Vec<PriceLevel>, SdkError> {
        levels.iter().map(|l| self.level_to_number(l)).collect()
    }
}

impl fmt::Display for MarketMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{} ({})", name, self.address),
            None => write!(f, "{}", self.address),
        }
    }
}

fn pow10(exponent: u32) -> Result<U256, SdkError> {
    U256::from(10u64)
        .checked_pow(U256::from(exponent))
        .ok_or(SdkError::ConversionOverflow)
}

fn product(factors: &[U256]) -> Result<U256, SdkError> {
    factors
        .iter()
        .try_fold(U256::from(1u64), |acc, factor| acc.checked_mul(*factor))
        .ok_or(SdkError::ConversionOverflow)
}

/// Splits a non-negative decimal into `(mantissa, 10^scale)`.
fn unsigned_parts(value: Decimal) -> Option<(U256, U256)> {
    let mantissa = u128::try_from(value.mantissa()).ok()?;
    let scale = pow10(value.scale()).ok()?;
    Some((U256::from(mantissa), scale))
}

fn ratio_to_lots(numerator: U256, denominator: U256) -> Result<u64, SdkError> {
    let quotient = numerator
        .checked_div(denominator)
        .ok_or(SdkError::DivisionByZero)?;
    u64::try_from(quotient).map_err(|_| SdkError::ConversionOverflow)
}

/// Truncates `numerator / denominator` toward zero at the largest scale whose
/// mantissa fits a `Decimal`, then drops trailing zeros.
fn ratio_to_decimal(numerator: U256, denominator: U256) -> Result<Decimal, SdkError> {
    if denominator.is_zero() {
        return Err(SdkError::DivisionByZero);
    }
    let mantissa_limit = U256::from(1u128 << 96);

    for scale in (0..=MAX_FRACTION_DIGITS).rev() {
        let Some(scaled) = numerator.checked_mul(pow10(scale)?) else {
            continue;
        };
        let quotient = scaled / denominator;
        if quotient >= mantissa_limit {
            continue;
        }
        let mantissa = u128::try_from(quotient)
            .ok()
            .and_then(|m| i128::try_from(m).ok())
            .ok_or(SdkError::ConversionOverflow)?;
        return Decimal::try_from_i128_with_scale(mantissa, scale)
            .map(|d| d.normalize())
            .map_err(|_| SdkError::ConversionOverflow);
    }
    Err(SdkError::ConversionOverflow)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;
    use crate::state::fixtures::{market_bytes, mint_bytes};
    use crate::types::{Price, Quantity};

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).expect("decimal")
    }

    fn mint(decimals: u8) -> Mint {
        Mint::decode(&mint_bytes(decimals, 0)).expect("mint")
    }

    fn meta(base_lot: u64, quote_lot: u64, base_dec: u8, quote_dec: u8) -> MarketMeta {
        let mut market = MarketV2::decode(&market_bytes()).expect("market");
        market.base_lot_size = base_lot;
        market.quote_lot_size = quote_lot;
        MarketMeta::new(market.own_address, market, mint(base_dec), mint(quote_dec))
    }

    fn mainnet_meta() -> MarketMeta {
        let market = MarketV2::decode(&market_bytes()).expect("market");
        MarketMeta::new(market.own_address, market, mint(6), mint(6)).with_name("ALEPH/USDC")
    }

    #[test]
    fn test_price_lots_to_number() {
        let meta = mainnet_meta();
        // 1827 * 10 * 10^6 / (10000 * 10^6)
        assert_eq!(meta.price_lots_to_number(1827), Ok(dec("1.827")));
        assert_eq!(meta.tick_size(), Ok(dec("0.001")));
    }

    #[test]
    fn test_base_size_lots_to_number() {
        let meta = mainnet_meta();
        assert_eq!(meta.base_size_lots_to_number(11494), Ok(dec("114.94")));
        assert_eq!(meta.min_order_size(), Ok(dec("0.01")));
    }

    #[test]
    fn test_price_number_to_lots() {
        let meta = mainnet_meta();
        assert_eq!(meta.price_number_to_lots(dec("1.827")), Ok(1827));
        // Sub-tick remainder is truncated.
        assert_eq!(meta.price_number_to_lots(dec("1.8279")), Ok(1827));
        assert_eq!(meta.base_size_number_to_lots(dec("114.949")), Ok(11494));
    }

    #[test]
    fn test_unit_lots_round_trip() {
        let meta = meta(1, 1, 6, 6);
        for lots in [0u64, 1, 7, 1_000_000, u64::MAX] {
            let price = meta.price_lots_to_number(lots).expect("to number");
            assert_eq!(price, Decimal::from(lots));
            assert_eq!(meta.price_number_to_lots(price), Ok(lots));
        }
    }

    #[test]
    fn test_lots_round_trip_within_one_lot() {
        let markets = [
            (10_000, 10, 6, 6),
            (100_000_000, 100, 8, 6),
            (1_000, 1, 9, 6),
            (30_000, 7, 6, 6),
            (3, 1, 0, 0),
        ];
        let samples = [
            0u64,
            1,
            2,
            7,
            999_999,
            1_000_000,
            123_456_789_012,
            u64::MAX - 1,
            u64::MAX,
        ];

        for (base_lot, quote_lot, base_dec, quote_dec) in markets {
            let meta = meta(base_lot, quote_lot, base_dec, quote_dec);
            for lots in samples {
                let price = meta.price_lots_to_number(lots).expect("to number");
                let back = meta.price_number_to_lots(price).expect("to lots");
                assert!(back <= lots, "{base_lot}/{quote_lot}: {lots} -> {back}");
                assert!(lots.abs_diff(back) <= 1, "{base_lot}/{quote_lot}: {lots} -> {back}");

                let size = meta.base_size_lots_to_number(lots).expect("to number");
                let back = meta.base_size_number_to_lots(size).expect("to lots");
                assert!(lots.abs_diff(back) <= 1, "{base_lot}: size {lots} -> {back}");
            }
        }
    }

    #[test]
    fn test_non_decimal_ratio_loses_at_most_one_lot() {
        let meta = meta(30_000, 7, 6, 6);
        // 7 / 30000 has no finite decimal expansion.
        let price = meta.price_lots_to_number(1_000_000).expect("to number");
        assert_eq!(price, dec("233.333333333333333333"));
        assert_eq!(meta.price_number_to_lots(price), Ok(999_999));
    }

    #[test]
    fn test_ratio_below_decimal_resolution() {
        // One price lot is 1/3 * 10^-18 quote tokens, below 18 fractional digits.
        let meta = meta(3_000_000_000_000, 1, 0, 6);
        let price = meta.price_lots_to_number(8).expect("to number");
        assert_eq!(price, dec("0.000000000000000002"));
        assert_eq!(meta.price_number_to_lots(price), Ok(6));
    }

    #[test]
    fn test_truncates_toward_zero() {
        let meta = meta(3, 1, 0, 0);
        assert_eq!(
            meta.price_lots_to_number(1),
            Ok(dec("0.333333333333333333"))
        );
        assert_eq!(
            meta.price_lots_to_number(2),
            Ok(dec("0.666666666666666666"))
        );
    }

    #[test]
    fn test_wide_intermediate() {
        let meta = meta(1000, 1, 9, 6);
        // u64::MAX * 1000 overflows u64 but the quotient is exact.
        assert_eq!(
            meta.base_size_lots_to_number(u64::MAX),
            Ok(dec("18446744073709.551615"))
        );
    }

    #[test]
    fn test_result_too_large_for_decimal() {
        let meta = meta(1, u64::MAX, 18, 0);
        assert_eq!(
            meta.price_lots_to_number(u64::MAX),
            Err(SdkError::ConversionOverflow)
        );
    }

    #[test]
    fn test_extreme_decimals() {
        let meta = meta(1, 1, 200, 0);
        assert_eq!(meta.price_lots_to_number(1), Err(SdkError::ConversionOverflow));
    }

    #[test]
    fn test_number_to_lots_overflow() {
        let meta = meta(1, 1, 0, 0);
        assert_eq!(
            meta.price_number_to_lots(dec("18446744073709551616")),
            Err(SdkError::ConversionOverflow)
        );
    }

    #[test]
    fn test_negative_price_rejected() {
        let meta = mainnet_meta();
        assert!(matches!(
            meta.price_number_to_lots(dec("-1.5")),
            Err(SdkError::InvalidPrice(_))
        ));
        assert!(matches!(
            meta.base_size_number_to_lots(dec("-0.01")),
            Err(SdkError::InvalidPrice(_))
        ));
    }

    #[test]
    fn test_zero_lot_sizes() {
        let meta = meta(0, 0, 6, 6);
        assert_eq!(meta.price_lots_to_number(5), Err(SdkError::DivisionByZero));
        assert_eq!(
            meta.price_number_to_lots(dec("1")),
            Err(SdkError::DivisionByZero)
        );
        assert_eq!(
            meta.base_size_number_to_lots(dec("1")),
            Err(SdkError::DivisionByZero)
        );
    }

    #[test]
    fn test_level_to_number() {
        let meta = mainnet_meta();
        let level = BookLevel {
            price: Price::new(1827),
            quantity: Quantity::new(11494),
            order_count: 3,
        };
        assert_eq!(
            meta.level_to_number(&level),
            Ok(PriceLevel {
                price: dec("1.827"),
                size: dec("114.94"),
                order_count: 3,
            })
        );
    }

    #[test]
    fn test_display() {
        let meta = mainnet_meta();
        assert_eq!(
            meta.to_string(),
            "ALEPH/USDC (7LVJtqSrF6RudMaz5rKGTmR3F3V5TKoDcN6bnk68biYZ)"
        );
    }
}
