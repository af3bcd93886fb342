//! SPL token mint accounts.

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::codec::AccountReader;
use crate::error::SdkError;

/// Size of the base SPL mint layout.
pub const MINT_SIZE: usize = 82;

/// Decoded SPL mint. Only the base layout is read; extension data after it
/// is ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mint {
    /// Authority allowed to mint new tokens.
    #[serde(default, with = "optional_pubkey")]
    pub mint_authority: Option<Pubkey>,

    /// Total supply in native units.
    pub supply: u64,

    /// Decimal places of one whole token.
    pub decimals: u8,

    /// Whether the mint has been initialized.
    pub is_initialized: bool,

    /// Authority allowed to freeze token accounts.
    #[serde(default, with = "optional_pubkey")]
    pub freeze_authority: Option<Pubkey>,
}

impl Mint {
    /// Decodes a mint account.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if `data` is shorter than
    /// [`MINT_SIZE`], and `SdkError::Deserialization` for an invalid option
    /// tag.
    pub fn decode(data: &[u8]) -> Result<Self, SdkError> {
        let mut r = AccountReader::new(data);
        r.require(MINT_SIZE)?;
        Ok(Self {
            mint_authority: read_coption_pubkey(&mut r)?,
            supply: r.read_u64()?,
            decimals: r.read_u8()?,
            is_initialized: r.read_u8()? != 0,
            freeze_authority: read_coption_pubkey(&mut r)?,
        })
    }

    /// Returns `10^decimals`, the number of native units in one token.
    #[must_use]
    pub fn unit(&self) -> Option<u64> {
        10u64.checked_pow(u32::from(self.decimals))
    }
}

fn read_coption_pubkey(r: &mut AccountReader<'_>) -> Result<Option<Pubkey>, SdkError> {
    let tag = r.read_u32()?;
    let key = r.read_pubkey()?;
    match tag {
        0 => Ok(None),
        1 => Ok(Some(key)),
        other => Err(SdkError::Deserialization(format!(
            "invalid option tag {} at offset {}",
            other,
            r.offset().saturating_sub(36)
        ))),
    }
}

mod optional_pubkey {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    pub fn serialize<S: Serializer>(key: &Option<Pubkey>, serializer: S) -> Result<S::Ok, S::Error> {
        match key {
            Some(key) => serializer.serialize_some(&key.to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Pubkey>, D::Error> {
        Option::<String>::deserialize(deserializer)?
            .map(|raw| Pubkey::from_str(&raw).map_err(|e| D::Error::custom(e.to_string())))
            .transpose()
    }
}
