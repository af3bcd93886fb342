//! Bids/asks slab accounts.
//!
//! An [`Orderbook`] is a fully materialized snapshot of one side of a market:
//! the account flags, the slab header and every physical slot up to
//! `bump_index`. Slots reference each other by index only.

use std::io;

use borsh::BorshSerialize;
use serde::{Deserialize, Serialize};

use super::account_flags::AccountFlags;
use super::node::{SlabNode, NODE_SIZE};
use crate::codec::AccountReader;
use crate::error::{CorruptionReason, SdkError};
use crate::types::Side;

/// Leading padding of every Serum account (`"serum"`).
pub const ACCOUNT_HEAD_PADDING: &[u8; 5] = b"serum";

/// Trailing padding of every Serum account (`"padding"`).
pub const ACCOUNT_TAIL_PADDING: &[u8; 7] = b"padding";

/// Encoded width of [`SlabHeader`].
pub const SLAB_HEADER_SIZE: usize = 32;

/// Bytes preceding the node array: padding, flags and header.
pub const SLAB_PREFIX_SIZE: usize = ACCOUNT_HEAD_PADDING.len() + 8 + SLAB_HEADER_SIZE;

/// Slab bookkeeping.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlabHeader {
    /// High-water mark of the node array; every stored index is below it.
    pub bump_index: u32,

    /// Number of slots on the free list.
    pub free_list_len: u32,

    /// First slot of the free list.
    pub free_list_head: u32,

    /// Root of the critbit tree; meaningless when `leaf_count` is zero.
    pub root: u32,

    /// Number of live leaves reachable from the root.
    pub leaf_count: u32,
}

impl SlabHeader {
    /// Decodes the header, consuming [`SLAB_HEADER_SIZE`] bytes.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if the buffer is too short.
    pub fn decode_from(reader: &mut AccountReader<'_>) -> Result<Self, SdkError> {
        reader.require(SLAB_HEADER_SIZE)?;
        let bump_index = reader.read_u32()?;
        reader.skip(4)?;
        let free_list_len = reader.read_u32()?;
        reader.skip(4)?;
        let free_list_head = reader.read_u32()?;
        let root = reader.read_u32()?;
        let leaf_count = reader.read_u32()?;
        reader.skip(4)?;

        Ok(Self {
            bump_index,
            free_list_len,
            free_list_head,
            root,
            leaf_count,
        })
    }
}

impl BorshSerialize for SlabHeader {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        BorshSerialize::serialize(&self.bump_index, writer)?;
        writer.write_all(&[0u8; 4])?;
        BorshSerialize::serialize(&self.free_list_len, writer)?;
        writer.write_all(&[0u8; 4])?;
        BorshSerialize::serialize(&self.free_list_head, writer)?;
        BorshSerialize::serialize(&self.root, writer)?;
        BorshSerialize::serialize(&self.leaf_count, writer)?;
        writer.write_all(&[0u8; 4])
    }
}

/// A decoded bids or asks account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Orderbook {
    /// Account flags; `BIDS` or `ASKS` identifies the side.
    pub account_flags: AccountFlags,

    /// Slab header.
    #[serde(flatten)]
    pub header: SlabHeader,

    /// Every physical slot, `bump_index` of them, in array order.
    pub nodes: Vec<SlabNode>,
}

impl Orderbook {
    /// Decodes a raw bids or asks account.
    ///
    /// All `bump_index` slots are decoded up front. Bytes after the last
    /// slot (unused capacity and the trailing padding) are ignored.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if the buffer is shorter than the
    /// header and node array require, or `SdkError::MalformedTag` if any slot
    /// carries an unknown tag.
    pub fn decode(data: &[u8]) -> Result<Self, SdkError> {
        let mut reader = AccountReader::new(data);
        reader.skip(ACCOUNT_HEAD_PADDING.len())?;
        let account_flags = AccountFlags(reader.read_u64()?);
        let header = SlabHeader::decode_from(&mut reader)?;

        let count = header.bump_index as usize;
        let needed = count.checked_mul(NODE_SIZE).ok_or(SdkError::TruncatedBuffer {
            offset: reader.offset(),
            needed: usize::MAX,
            remaining: reader.remaining(),
        })?;
        reader.require(needed)?;

        let nodes = (0..count)
            .map(|_| SlabNode::decode_from(&mut reader))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            account_flags,
            header,
            nodes,
        })
    }

    /// Returns the side named by the account flags, if any.
    #[must_use]
    pub const fn side(&self) -> Option<Side> {
        if self.account_flags.is(AccountFlags::BIDS) {
            Some(Side::Bid)
        } else if self.account_flags.is(AccountFlags::ASKS) {
            Some(Side::Ask)
        } else {
            None
        }
    }

    /// Returns the number of live orders.
    #[must_use]
    pub const fn leaf_count(&self) -> u32 {
        self.header.leaf_count
    }

    /// Returns true if the book holds no orders.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.header.leaf_count == 0
    }

    /// Returns the slot at `index`.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::StructuralCorruption` if `index` is not below
    /// `bump_index`.
    pub fn node(&self, index: u32) -> Result<&SlabNode, SdkError> {
        self.nodes.get(index as usize).ok_or(SdkError::corruption(
            index,
            CorruptionReason::IndexOutOfRange {
                bump_index: self.header.bump_index,
            },
        ))
    }

    /// Walks the free list from its head and returns the visited slots.
    ///
    /// The walk must reach a `LastFreeNode` after exactly `free_list_len`
    /// slots, counting the terminator.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::StructuralCorruption` if the list leaves the node
    /// array, reaches a non-free slot, loops, or disagrees with
    /// `free_list_len`.
    pub fn free_slots(&self) -> Result<Vec<u32>, SdkError> {
        let expected = self.header.free_list_len;
        let mut slots = Vec::new();
        if expected == 0 {
            return Ok(slots);
        }

        let limit = self.header.bump_index;
        let mut index = self.header.free_list_head;
        loop {
            if slots.len() >= limit as usize {
                return Err(SdkError::corruption(
                    index,
                    CorruptionReason::StepLimitExceeded { limit },
                ));
            }
            let node = self.node(index)?;
            slots.push(index);
            match node {
                SlabNode::FreeNode(free) => index = free.next,
                SlabNode::LastFreeNode => break,
                other => {
                    return Err(SdkError::corruption(
                        index,
                        CorruptionReason::UnexpectedNode {
                            found: other.kind(),
                        },
                    ))
                }
            }
        }

        let visited = u32::try_from(slots.len()).unwrap_or(u32::MAX);
        if visited != expected {
            return Err(SdkError::corruption(
                self.header.free_list_head,
                CorruptionReason::FreeListMismatch { expected, visited },
            ));
        }
        Ok(slots)
    }

    /// Checks every structural invariant of the slab.
    ///
    /// Every child index stored in an inner node and every `next` stored in a
    /// free node must be below `bump_index`, a full traversal must reach
    /// exactly `leaf_count` leaves, and the free list must match its header.
    ///
    /// # Errors
    ///
    /// Returns the first violation found as `SdkError::StructuralCorruption`.
    pub fn validate(&self) -> Result<(), SdkError> {
        let bump_index = self.header.bump_index;
        let out_of_range = |index: u32| {
            SdkError::corruption(index, CorruptionReason::IndexOutOfRange { bump_index })
        };

        for node in &self.nodes {
            match node {
                SlabNode::InnerNode(inner) => {
                    if let Some(child) = inner.children.iter().find(|c| **c >= bump_index) {
                        return Err(out_of_range(*child));
                    }
                }
                SlabNode::FreeNode(free) if free.next >= bump_index => {
                    return Err(out_of_range(free.next));
                }
                _ => {}
            }
        }

        for leaf in self.leaves(true) {
            leaf?;
        }
        self.free_slots()?;
        Ok(())
    }
}

impl BorshSerialize for Orderbook {
    fn serialize<W: io::Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(ACCOUNT_HEAD_PADDING)?;
        BorshSerialize::serialize(&self.account_flags.bits(), writer)?;
        BorshSerialize::serialize(&self.header, writer)?;
        for node in &self.nodes {
            BorshSerialize::serialize(node, writer)?;
        }
        writer.write_all(ACCOUNT_TAIL_PADDING)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::fixtures::{book_bytes, BookFixture};
    use crate::state::node::FreeNode;

    #[test]
    fn test_decode_header_and_nodes() {
        let fixture = BookFixture::asks(&[(100, 5), (101, 7), (103, 1)]);
        let book = Orderbook::decode(&book_bytes(&fixture.book)).expect("decode");

        assert_eq!(book, fixture.book);
        assert_eq!(book.side(), Some(Side::Ask));
        assert_eq!(book.leaf_count(), 3);
        assert_eq!(book.nodes.len(), book.header.bump_index as usize);
        assert!(book.validate().is_ok());
    }

    #[test]
    fn test_encode_layout() {
        let fixture = BookFixture::bids(&[(10, 1), (12, 3)]).with_free_slots(1);
        let bytes = book_bytes(&fixture.book);
        let node_count = fixture.book.nodes.len();

        assert_eq!(
            bytes.len(),
            SLAB_PREFIX_SIZE + node_count * NODE_SIZE + ACCOUNT_TAIL_PADDING.len()
        );
        assert_eq!(&bytes[..5], ACCOUNT_HEAD_PADDING);
        assert_eq!(&bytes[bytes.len() - 7..], ACCOUNT_TAIL_PADDING);
        assert_eq!(
            bytes[5..13],
            (AccountFlags::INITIALIZED | AccountFlags::BIDS).to_le_bytes()
        );
        assert_eq!(bytes[13..17], (node_count as u32).to_le_bytes());
        assert_eq!(bytes[17..21], [0u8; 4]);
        assert_eq!(bytes[21..25], 1u32.to_le_bytes());
        assert_eq!(bytes[41..45], [0u8; 4]);

        let mut node = Vec::new();
        BorshSerialize::serialize(&fixture.book.nodes[0], &mut node).expect("encode node");
        assert_eq!(node.len(), NODE_SIZE);
        assert_eq!(&bytes[SLAB_PREFIX_SIZE..SLAB_PREFIX_SIZE + NODE_SIZE], node.as_slice());

        assert_eq!(Orderbook::decode(&bytes), Ok(fixture.book));
    }

    #[test]
    fn test_decode_truncated_header() {
        let bytes = book_bytes(&BookFixture::bids(&[(10, 1)]).book);
        let result = Orderbook::decode(&bytes[..20]);
        assert!(matches!(result, Err(SdkError::TruncatedBuffer { .. })));
    }

    #[test]
    fn test_decode_truncated_nodes() {
        let bytes = book_bytes(&BookFixture::bids(&[(10, 1), (11, 2)]).book);
        let cut = SLAB_PREFIX_SIZE + NODE_SIZE + 10;
        let result = Orderbook::decode(&bytes[..cut]);
        assert_eq!(
            result,
            Err(SdkError::TruncatedBuffer {
                offset: SLAB_PREFIX_SIZE,
                needed: 3 * NODE_SIZE,
                remaining: NODE_SIZE + 10,
            })
        );
    }

    #[test]
    fn test_decode_huge_bump_index() {
        let mut bytes = book_bytes(&BookFixture::bids(&[(10, 1)]).book);
        bytes[13..17].copy_from_slice(&u32::MAX.to_le_bytes());
        assert!(matches!(
            Orderbook::decode(&bytes),
            Err(SdkError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_decode_malformed_slot() {
        let mut bytes = book_bytes(&BookFixture::bids(&[(10, 1), (12, 1)]).book);
        bytes[SLAB_PREFIX_SIZE..SLAB_PREFIX_SIZE + 4].copy_from_slice(&77u32.to_le_bytes());
        assert_eq!(
            Orderbook::decode(&bytes),
            Err(SdkError::MalformedTag { tag: 77 })
        );
    }

    #[test]
    fn test_trailing_capacity_ignored() {
        let fixture = BookFixture::asks(&[(5, 5)]);
        let mut bytes = book_bytes(&fixture.book);
        bytes.extend_from_slice(&[0u8; NODE_SIZE * 4]);
        assert_eq!(Orderbook::decode(&bytes), Ok(fixture.book));
    }

    #[test]
    fn test_empty_book() {
        let book = Orderbook {
            account_flags: AccountFlags(AccountFlags::INITIALIZED | AccountFlags::BIDS),
            header: SlabHeader::default(),
            nodes: Vec::new(),
        };
        let decoded = Orderbook::decode(&book_bytes(&book)).expect("decode");
        assert!(decoded.is_empty());
        assert_eq!(decoded.side(), Some(Side::Bid));
        assert!(decoded.validate().is_ok());
    }

    #[test]
    fn test_free_list_walk() {
        let fixture = BookFixture::asks(&[(1, 1), (2, 2)]).with_free_slots(3);
        let book = &fixture.book;
        let slots = book.free_slots().expect("free list");
        assert_eq!(slots.len(), 3);
        assert_eq!(slots.first(), Some(&book.header.free_list_head));
        assert!(matches!(
            book.node(*slots.last().expect("last")),
            Ok(SlabNode::LastFreeNode)
        ));
        assert!(book.validate().is_ok());
    }

    #[test]
    fn test_free_list_length_mismatch() {
        let mut book = BookFixture::asks(&[(1, 1)]).with_free_slots(2).book;
        book.header.free_list_len = 5;
        assert!(matches!(
            book.free_slots(),
            Err(SdkError::StructuralCorruption {
                reason: CorruptionReason::FreeListMismatch {
                    expected: 5,
                    visited: 2
                },
                ..
            })
        ));
    }

    #[test]
    fn test_free_list_cycle() {
        let mut book = BookFixture::asks(&[(1, 1)]).with_free_slots(2).book;
        let head = book.header.free_list_head;
        let slots = book.free_slots().expect("free list");
        let last = *slots.last().expect("last");
        book.nodes[last as usize] = SlabNode::FreeNode(FreeNode { next: head });

        assert!(matches!(
            book.free_slots(),
            Err(SdkError::StructuralCorruption {
                reason: CorruptionReason::StepLimitExceeded { .. },
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_out_of_range_child() {
        let mut book = BookFixture::bids(&[(1, 1), (2, 1)]).book;
        let root = book.header.root as usize;
        if let SlabNode::InnerNode(inner) = &mut book.nodes[root] {
            inner.children[1] = 999;
        }
        assert!(matches!(
            book.validate(),
            Err(SdkError::StructuralCorruption {
                index: 999,
                reason: CorruptionReason::IndexOutOfRange { .. },
            })
        ));
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let fixture = BookFixture::bids(&[(7, 1), (7, 2), (9, 3)]).with_free_slots(2);
        let first = serde_json::to_string(&fixture.book).expect("serialize");

        let decoded = Orderbook::decode(&book_bytes(&fixture.book)).expect("decode");
        let second = serde_json::to_string(&decoded).expect("serialize");
        assert_eq!(first, second);

        let parsed: Orderbook = serde_json::from_str(&second).expect("deserialize");
        assert_eq!(parsed, decoded);
    }
}
