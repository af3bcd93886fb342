//! Known-market registry.
//!
//! A [`MarketRegistry`] is an ordinary value loaded from a JSON list. The
//! caller owns it and passes it where lookups are needed.

use std::str::FromStr;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::codec::serde_pubkey;
use crate::error::SdkError;
use crate::types::MarketMeta;

/// Serum DEX program v2.
pub const DEX_PROGRAM_ID_V2: &str = "EUqojwWA2rd19FZrzeBncJsm38Jm1hEhE3zsmX3bRc2o";

/// Serum DEX program v3.
pub const DEX_PROGRAM_ID_V3: &str = "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin";

/// Deployed DEX program versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DexVersion {
    /// Program v2.
    V2,
    /// Program v3.
    V3,
}

impl DexVersion {
    /// Identifies the version deployed at `program_id`.
    #[must_use]
    pub fn from_program_id(program_id: &Pubkey) -> Option<Self> {
        [Self::V2, Self::V3]
            .into_iter()
            .find(|version| version.program_id().ok().as_ref() == Some(program_id))
    }

    /// Returns the program id of this version.
    ///
    /// # Errors
    ///
    /// Never fails for the built-in ids.
    pub fn program_id(&self) -> Result<Pubkey, SdkError> {
        let raw = match self {
            Self::V2 => DEX_PROGRAM_ID_V2,
            Self::V3 => DEX_PROGRAM_ID_V3,
        };
        Pubkey::from_str(raw).map_err(|_| SdkError::InvalidAddress(raw.to_string()))
    }
}

/// One known market.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// Market account address.
    #[serde(with = "serde_pubkey")]
    pub address: Pubkey,

    /// Display name, e.g. `"SOL/USDC"`.
    pub name: String,

    /// Whether the market has been retired.
    #[serde(default)]
    pub deprecated: bool,

    /// Program that owns the market.
    #[serde(with = "serde_pubkey")]
    pub program_id: Pubkey,
}

impl RegistryEntry {
    /// Returns the DEX version the market runs on, if known.
    #[must_use]
    pub fn dex_version(&self) -> Option<DexVersion> {
        DexVersion::from_program_id(&self.program_id)
    }

    /// Copies the registry name and deprecation flag onto fetched metadata.
    #[must_use]
    pub fn annotate(&self, meta: MarketMeta) -> MarketMeta {
        meta.with_name(self.name.clone())
            .with_deprecated(self.deprecated)
    }
}

/// A list of known markets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarketRegistry {
    entries: Vec<RegistryEntry>,
}

impl MarketRegistry {
    /// Wraps a list of entries.
    #[must_use]
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    /// Parses a JSON array of entries.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Deserialization` for malformed JSON or addresses.
    pub fn from_json(json: &str) -> Result<Self, SdkError> {
        serde_json::from_str(json).map_err(|e| SdkError::Deserialization(e.to_string()))
    }

    /// Returns every entry.
    #[must_use]
    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    /// Returns entries that are not deprecated.
    pub fn active(&self) -> impl Iterator<Item = &RegistryEntry> {
        self.entries.iter().filter(|entry| !entry.deprecated)
    }

    /// Finds a market by name, preferring a live market over a deprecated
    /// one with the same name.
    #[must_use]
    pub fn by_name(&self, name: &str) -> Option<&RegistryEntry> {
        let mut matches = self.entries.iter().filter(|entry| entry.name == name);
        let first = matches.clone().next();
        matches.find(|entry| !entry.deprecated).or(first)
    }

    /// Finds a market by address.
    #[must_use]
    pub fn by_address(&self, address: &Pubkey) -> Option<&RegistryEntry> {
        self.entries.iter().find(|entry| &entry.address == address)
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MARKETS: &str = r#"[
        {
            "address": "7kgkDyW7dmyMeP8KFXzbcUZz1R2WHsovDZ7n3ihZuNDS",
            "deprecated": true,
            "name": "MSRM/USDT",
            "programId": "EUqojwWA2rd19FZrzeBncJsm38Jm1hEhE3zsmX3bRc2o"
        },
        {
            "address": "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT",
            "deprecated": false,
            "name": "SOL/USDC",
            "programId": "9xQeWvG816bUx9EPjHmaT23yvVM2ZWbrrpZb9PusVFin"
        },
        {
            "address": "7xMDbYTCqQEcK2aM9LbetGtNFJpzKdfXzLL5juaLh4GJ",
            "deprecated": true,
            "name": "SOL/USDC",
            "programId": "EUqojwWA2rd19FZrzeBncJsm38Jm1hEhE3zsmX3bRc2o"
        },
        {
            "address": "7LVJtqSrF6RudMaz5rKGTmR3F3V5TKoDcN6bnk68biYZ",
            "name": "ALEPH/USDC",
            "programId": "11111111111111111111111111111111"
        }
    ]"#;

    fn registry() -> MarketRegistry {
        MarketRegistry::from_json(MARKETS).expect("registry")
    }

    #[test]
    fn test_load() {
        let registry = registry();
        assert_eq!(registry.len(), 4);
        assert_eq!(registry.active().count(), 2);
        assert!(!registry.entries()[3].deprecated);
    }

    #[test]
    fn test_by_name_prefers_live_market() {
        let registry = registry();
        let entry = registry.by_name("SOL/USDC").expect("SOL/USDC");
        assert_eq!(
            entry.address.to_string(),
            "9wFFyRfZBsuAha4YcuxcXLKwMxJR43S7fPfQLusDBzvT"
        );
        assert_eq!(entry.dex_version(), Some(DexVersion::V3));

        let retired = registry.by_name("MSRM/USDT").expect("MSRM/USDT");
        assert!(retired.deprecated);
        assert_eq!(retired.dex_version(), Some(DexVersion::V2));
        assert!(registry.by_name("BTC/USDC").is_none());
    }

    #[test]
    fn test_by_address() {
        let registry = registry();
        let address =
            Pubkey::from_str("7LVJtqSrF6RudMaz5rKGTmR3F3V5TKoDcN6bnk68biYZ").expect("pubkey");
        let entry = registry.by_address(&address).expect("entry");
        assert_eq!(entry.name, "ALEPH/USDC");
        assert_eq!(entry.dex_version(), None);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(
            MarketRegistry::from_json(r#"[{"address": "bad", "name": "X", "programId": "bad"}]"#),
            Err(SdkError::Deserialization(_))
        ));
    }

    #[test]
    fn test_dex_version_round_trip() {
        for version in [DexVersion::V2, DexVersion::V3] {
            let id = version.program_id().expect("program id");
            assert_eq!(DexVersion::from_program_id(&id), Some(version));
        }
    }

    #[test]
    fn test_annotate() {
        use crate::state::fixtures::{market_bytes, mint_bytes};
        use crate::state::{MarketV2, Mint};

        let market = MarketV2::decode(&market_bytes()).expect("market");
        let mint = Mint::decode(&mint_bytes(6, 0)).expect("mint");
        let meta = MarketMeta::new(market.own_address, market, mint.clone(), mint);

        let registry = registry();
        let entry = registry.by_address(&meta.address).expect("entry");
        let named = entry.annotate(meta);
        assert_eq!(named.name.as_deref(), Some("ALEPH/USDC"));
        assert!(!named.deprecated);
    }

    #[test]
    fn test_serialize_back() {
        let registry = registry();
        let json = serde_json::to_string(&registry).expect("serialize");
        assert_eq!(MarketRegistry::from_json(&json), Ok(registry));
    }
}
