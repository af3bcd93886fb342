//! Slab node records.
//!
//! A slab is a flat array of fixed-width records. Each record starts with a
//! little-endian `u32` tag selecting one of five layouts; the payload is
//! padded to the width of the largest variant (the leaf).

use std::fmt;
use std::io;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::codec::{serde_pubkey, serde_u128, AccountReader};
use crate::error::SdkError;
use crate::types::Side;

/// Payload width of every node variant.
pub const NODE_PAYLOAD_SIZE: usize = 68;

/// Full record width: tag plus payload.
pub const NODE_SIZE: usize = 4 + NODE_PAYLOAD_SIZE;

/// Tag of a slot that was never written.
pub const TAG_UNINITIALIZED: u32 = 0;
/// Tag of an internal critbit node.
pub const TAG_INNER: u32 = 1;
/// Tag of a resting order.
pub const TAG_LEAF: u32 = 2;
/// Tag of a reclaimed slot.
pub const TAG_FREE: u32 = 3;
/// Tag of the free list terminator.
pub const TAG_LAST_FREE: u32 = 4;

const INNER_PADDING: usize = NODE_PAYLOAD_SIZE - (4 + 16 + 8);
const FREE_PADDING: usize = NODE_PAYLOAD_SIZE - 4;

/// Internal critbit node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InnerNode {
    /// Number of leading key bits shared by every leaf below this node.
    pub prefix_len: u32,

    /// Key bits, of which the top `prefix_len` are meaningful.
    #[serde(with = "serde_u128")]
    pub key: u128,

    /// Slot indices of the children: `[critbit clear, critbit set]`.
    pub children: [u32; 2],
}

impl InnerNode {
    /// Returns the mask of the bit that separates the two children.
    ///
    /// `None` if `prefix_len` is not a valid bit position.
    #[must_use]
    pub fn critbit_mask(&self) -> Option<u128> {
        127u32.checked_sub(self.prefix_len).map(|shift| 1u128 << shift)
    }

    /// Returns true if `search_key` has this node's critbit clear.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Overflow` if `prefix_len` is not a valid bit position.
    pub fn is_bit_zero(&self, search_key: u128) -> Result<bool, SdkError> {
        let index = 127u32
            .checked_sub(self.prefix_len)
            .ok_or(SdkError::Overflow)?;
        is_bit_zero(search_key, index)
    }

    /// Returns the child a search for `search_key` descends into.
    #[must_use]
    pub fn child_for(&self, search_key: u128) -> Option<u32> {
        let [low, high] = self.children;
        let zero = self.is_bit_zero(search_key).ok()?;
        Some(if zero { low } else { high })
    }

    /// Returns the children in the order they must be pushed onto a
    /// traversal stack so that pops come out in the requested direction.
    #[must_use]
    pub const fn push_order(&self, ascending: bool) -> [u32; 2] {
        let [low, high] = self.children;
        if ascending {
            [high, low]
        } else {
            [low, high]
        }
    }
}

/// A resting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeafNode {
    /// Slot of the order in the owner's open orders account.
    pub owner_slot: u8,

    /// Fee tier of the owner.
    pub fee_tier: u8,

    /// Order key: price in the upper 64 bits, sequence number in the lower.
    #[serde(with = "serde_u128")]
    pub key: u128,

    /// Open orders account that owns this order.
    #[serde(with = "serde_pubkey")]
    pub owner: Pubkey,

    /// Remaining size in base lots.
    pub quantity: u64,

    /// Client supplied order id.
    pub client_order_id: u64,
}

impl LeafNode {
    /// Returns the limit price in quote lots per base lot.
    #[must_use]
    pub const fn price(&self) -> u64 {
        (self.key >> 64) as u64
    }

    /// Returns the order id wrapping this leaf's key.
    #[must_use]
    pub const fn order_id(&self) -> OrderId {
        OrderId(self.key)
    }
}

/// Reclaimed slot threading the free list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeNode {
    /// Next slot on the free list.
    pub next: u32,
}

/// One decoded slab record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlabNode {
    /// Slot never written.
    Uninitialized,
    /// Internal critbit node.
    InnerNode(InnerNode),
    /// Resting order.
    LeafNode(LeafNode),
    /// Reclaimed slot.
    FreeNode(FreeNode),
    /// Free list terminator.
    LastFreeNode,
}

impl SlabNode {
    /// Decodes one fixed-width record.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if `record` is shorter than
    /// [`NODE_SIZE`], and `SdkError::MalformedTag` for an unknown tag.
    pub fn decode(record: &[u8]) -> Result<Self, SdkError> {
        Self::decode_from(&mut AccountReader::new(record))
    }

    /// Decodes one record from `reader`, consuming exactly [`NODE_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Same as [`SlabNode::decode`].
    pub fn decode_from(reader: &mut AccountReader<'_>) -> Result<Self, SdkError> {
        reader.require(NODE_SIZE)?;
        let tag = reader.read_u32()?;
        let mut payload = AccountReader::new(reader.read_bytes(NODE_PAYLOAD_SIZE)?);

        match tag {
            TAG_UNINITIALIZED => Ok(Self::Uninitialized),
            TAG_INNER => Ok(Self::InnerNode(InnerNode {
                prefix_len: payload.read_u32()?,
                key: payload.read_u128()?,
                children: [payload.read_u32()?, payload.read_u32()?],
            })),
            TAG_LEAF => {
                let owner_slot = payload.read_u8()?;
                let fee_tier = payload.read_u8()?;
                payload.skip(2)?;
                Ok(Self::LeafNode(LeafNode {
                    owner_slot,
                    fee_tier,
                    key: payload.read_u128()?,
                    owner: payload.read_pubkey()?,
                    quantity: payload.read_u64()?,
                    client_order_id: payload.read_u64()?,
                }))
            }
            TAG_FREE => Ok(Self::FreeNode(FreeNode {
                next: payload.read_u32()?,
            })),
            TAG_LAST_FREE => Ok(Self::LastFreeNode),
            tag => Err(SdkError::MalformedTag { tag }),
        }
    }

    /// Returns the on-chain discriminant.
    #[must_use]
    pub const fn tag(&self) -> u32 {
        match self {
            Self::Uninitialized => TAG_UNINITIALIZED,
            Self::InnerNode(_) => TAG_INNER,
            Self::LeafNode(_) => TAG_LEAF,
            Self::FreeNode(_) => TAG_FREE,
            Self::LastFreeNode => TAG_LAST_FREE,
        }
    }

    /// Returns a short name for the variant.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Uninitialized => "uninitialized",
            Self::InnerNode(_) => "inner",
            Self::LeafNode(_) => "leaf",
            Self::FreeNode(_) => "free",
            Self::LastFreeNode => "last free",
        }
    }

    /// Returns the leaf if this is one.
    #[must_use]
    pub const fn as_leaf(&self) -> Option<&LeafNode> {
        match self {
            Self::LeafNode(leaf) => Some(leaf),
            _ => None,
        }
    }

    /// Returns the inner node if this is one.
    #[must_use]
    pub const fn as_inner(&self) -> Option<&InnerNode> {
        match self {
            Self::InnerNode(inner) => Some(inner),
            _ => None,
        }
    }
}

impl BorshSerialize for SlabNode {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.tag(), writer)?;
        match self {
            Self::Uninitialized | Self::LastFreeNode => {
                writer.write_all(&[0u8; NODE_PAYLOAD_SIZE])
            }
            Self::InnerNode(inner) => {
                BorshSerialize::serialize(&inner.prefix_len, writer)?;
                BorshSerialize::serialize(&inner.key, writer)?;
                BorshSerialize::serialize(&inner.children, writer)?;
                writer.write_all(&[0u8; INNER_PADDING])
            }
            Self::LeafNode(leaf) => {
                BorshSerialize::serialize(&leaf.owner_slot, writer)?;
                BorshSerialize::serialize(&leaf.fee_tier, writer)?;
                writer.write_all(&[0u8; 2])?;
                BorshSerialize::serialize(&leaf.key, writer)?;
                BorshSerialize::serialize(&leaf.owner.to_bytes(), writer)?;
                BorshSerialize::serialize(&leaf.quantity, writer)?;
                BorshSerialize::serialize(&leaf.client_order_id, writer)
            }
            Self::FreeNode(free) => {
                BorshSerialize::serialize(&free.next, writer)?;
                writer.write_all(&[0u8; FREE_PADDING])
            }
        }
    }
}

/// A 128-bit Serum order id.
///
/// The upper 64 bits are the limit price. The lower 64 bits are the order's
/// sequence number for asks and its bitwise complement for bids, so that
/// earlier bids sort after later ones at the same price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OrderId(pub u128);

impl OrderId {
    /// Parses a 32-digit hex order id, with or without a `0x` prefix.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::Deserialization` if the string is not valid hex.
    pub fn from_hex(value: &str) -> Result<Self, SdkError> {
        let digits = value.strip_prefix("0x").unwrap_or(value);
        u128::from_str_radix(digits, 16)
            .map(Self)
            .map_err(|e| SdkError::Deserialization(format!("order id {}: {}", value, e)))
    }

    /// Upper 64 bits.
    #[must_use]
    pub const fn hi(&self) -> u64 {
        (self.0 >> 64) as u64
    }

    /// Lower 64 bits.
    #[must_use]
    pub const fn lo(&self) -> u64 {
        self.0 as u64
    }

    /// Returns the limit price in lots.
    #[must_use]
    pub const fn price(&self) -> u64 {
        self.hi()
    }

    /// Returns the sequence number for an order on `side`.
    #[must_use]
    pub const fn seq_num(&self, side: Side) -> u64 {
        match side {
            Side::Bid => !self.lo(),
            Side::Ask => self.lo(),
        }
    }

    /// Returns the id as 32 hex digits, optionally `0x` prefixed.
    #[must_use]
    pub fn hex_string(&self, with_prefix: bool) -> String {
        if with_prefix {
            format!("0x{:032x}", self.0)
        } else {
            format!("{:032x}", self.0)
        }
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.hex_string(true))
    }
}

/// Returns true if bit `index` (0 = least significant) of `value` is clear.
///
/// # Errors
///
/// Returns `SdkError::Overflow` if `index` is not below 128.
pub fn is_bit_zero(value: u128, index: u32) -> Result<bool, SdkError> {
    if index >= u128::BITS {
        return Err(SdkError::Overflow);
    }
    Ok(value & (1u128 << index) == 0)
}
