//! Little-endian account byte reader.
//!
//! All on-chain layouts in this crate are packed little-endian structs. The
//! [`AccountReader`] walks such a buffer front to back and reports a
//! [`SdkError::TruncatedBuffer`] instead of panicking when a read runs past
//! the end.

use solana_sdk::pubkey::Pubkey;

use crate::error::SdkError;

/// Width of a serialized public key.
pub const PUBKEY_LEN: usize = 32;

/// Cursor over a borrowed account buffer.
#[derive(Debug, Clone)]
pub struct AccountReader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> AccountReader<'a> {
    /// Creates a reader positioned at the start of `data`.
    #[must_use]
    pub const fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Returns the current read offset.
    #[must_use]
    pub const fn offset(&self) -> usize {
        self.offset
    }

    /// Returns the number of unread bytes.
    #[must_use]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.offset)
    }

    /// Fails unless at least `needed` bytes remain.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if the buffer is too short.
    pub fn require(&self, needed: usize) -> Result<(), SdkError> {
        if self.remaining() < needed {
            return Err(self.truncated(needed));
        }
        Ok(())
    }

    /// Reads `len` raw bytes.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than `len` bytes remain.
    pub fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], SdkError> {
        let end = self
            .offset
            .checked_add(len)
            .ok_or_else(|| self.truncated(len))?;
        let bytes = self
            .data
            .get(self.offset..end)
            .ok_or_else(|| self.truncated(len))?;
        self.offset = end;
        Ok(bytes)
    }

    /// Reads a fixed-size byte array.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than `N` bytes remain.
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N], SdkError> {
        let bytes = self.read_bytes(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    /// Skips `len` bytes of padding.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than `len` bytes remain.
    pub fn skip(&mut self, len: usize) -> Result<(), SdkError> {
        self.read_bytes(len).map(|_| ())
    }

    /// Reads a `u8`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` at end of buffer.
    pub fn read_u8(&mut self) -> Result<u8, SdkError> {
        self.read_array::<1>().map(|b| b[0])
    }

    /// Reads a little-endian `u32`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than 4 bytes remain.
    pub fn read_u32(&mut self) -> Result<u32, SdkError> {
        self.read_array().map(u32::from_le_bytes)
    }

    /// Reads a little-endian `u64`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than 8 bytes remain.
    pub fn read_u64(&mut self) -> Result<u64, SdkError> {
        self.read_array().map(u64::from_le_bytes)
    }

    /// Reads a little-endian `u128`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than 16 bytes remain.
    pub fn read_u128(&mut self) -> Result<u128, SdkError> {
        self.read_array().map(u128::from_le_bytes)
    }

    /// Reads a 32-byte public key.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if fewer than 32 bytes remain.
    pub fn read_pubkey(&mut self) -> Result<Pubkey, SdkError> {
        self.read_array::<PUBKEY_LEN>().map(Pubkey::new_from_array)
    }

    fn truncated(&self, needed: usize) -> SdkError {
        SdkError::TruncatedBuffer {
            offset: self.offset,
            needed,
            remaining: self.remaining(),
        }
    }
}

/// Serde adapter writing a [`Pubkey`] as its base58 string.
pub mod serde_pubkey {
    use std::str::FromStr;

    use serde::{de::Error, Deserialize, Deserializer, Serializer};
    use solana_sdk::pubkey::Pubkey;

    /// Serializes the key as base58.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(key: &Pubkey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_string())
    }

    /// Parses a base58 key.
    ///
    /// # Errors
    ///
    /// Fails if the string is not a valid public key.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Pubkey, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Pubkey::from_str(&raw).map_err(|e| D::Error::custom(format!("{}: {}", raw, e)))
    }
}

/// Serde adapter writing a `u128` as a decimal string.
pub mod serde_u128 {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    /// Serializes the value as a decimal string.
    ///
    /// # Errors
    ///
    /// Propagates serializer errors.
    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_string())
    }

    /// Parses a decimal string.
    ///
    /// # Errors
    ///
    /// Fails if the string is not a valid `u128`.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

/// Parses a base58 address.
///
/// # Errors
///
/// Returns `SdkError::InvalidAddress` if the string is not 32 base58 bytes.
pub fn parse_pubkey(address: &str) -> Result<Pubkey, SdkError> {
    let bytes = bs58::decode(address)
        .into_vec()
        .map_err(|_| SdkError::InvalidAddress(address.to_string()))?;
    let array: [u8; PUBKEY_LEN] = bytes
        .try_into()
        .map_err(|_| SdkError::InvalidAddress(address.to_string()))?;
    Ok(Pubkey::new_from_array(array))
}
