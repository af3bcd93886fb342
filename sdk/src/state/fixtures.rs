//! Synthetic accounts for tests.
//!
//! Compiled for this crate's tests and, with the `test-utils` feature, for
//! downstream test suites.

#![allow(clippy::expect_used, clippy::indexing_slicing)]

use solana_sdk::pubkey::Pubkey;

use super::account_flags::AccountFlags;
use super::node::{FreeNode, InnerNode, LeafNode, SlabNode};
use super::slab::{Orderbook, SlabHeader};

/// A 388-byte MarketV2 account captured from mainnet.
pub const MARKET_V2_BASE64: &str = "c2VydW0DAAAAAAAAAF4kKlwSa8cc6xshYrDN0SrwrDDLBBUwemtddQHhfjgKAQAAAAAAAACL34duLBe2W5K3QFyI1rhNSESYe+cR/nc2UqvgE9x1VMb6evO+2606PWXzaqvJdDGxu+TC0vbg5HymAgNFL11habDAgiZH59TQw5/Y/52i1DhnPZFYOUB4C3G0hhSSXiRAZw8oAwAAAAAAAAAAAAAANvvq/rQwheCOf85MPshRgZEhXzDFAUh3IjalXs/zJ3I5cTmQBAAAABoqGA0AAAAAZAAAAAAAAACuBhNqk2KYdlbj/V5jbAGnnybh+XBss48/P00r053wbACx0Z1WrY+X9jL+huHdyUdpKzL/JScDimaQlNfzjpWANi1Nu6kEazO0bu0NkhnKFyQt2psF0SRCimAVpNimaOjou1Esrd0dKTtLbedHvt62Vi1bRJYveY74GEP6vkH/qBAnAAAAAAAACgAAAAAAAAAAAAAAAAAAAMsrAAAAAAAAcGFkZGluZw==";

/// Decodes [`MARKET_V2_BASE64`].
pub fn market_bytes() -> Vec<u8> {
    use base64::Engine;
    base64::engine::general_purpose::STANDARD
        .decode(MARKET_V2_BASE64)
        .expect("market fixture")
}

/// Encodes an initialized SPL mint with the given decimals.
pub fn mint_bytes(decimals: u8, supply: u64) -> Vec<u8> {
    let mut data = Vec::with_capacity(82);
    data.extend_from_slice(&1u32.to_le_bytes());
    data.extend_from_slice(&[9u8; 32]);
    data.extend_from_slice(&supply.to_le_bytes());
    data.push(decimals);
    data.push(1);
    data.extend_from_slice(&0u32.to_le_bytes());
    data.extend_from_slice(&[0u8; 32]);
    data
}

/// Encodes a book into its on-chain layout.
pub fn book_bytes(book: &Orderbook) -> Vec<u8> {
    borsh::to_vec(book).expect("encode book")
}

/// Builds well-formed critbit slabs from `(price, quantity)` orders.
pub struct BookFixture {
    /// The assembled book.
    pub book: Orderbook,
}

impl BookFixture {
    /// Builds a bids slab. Sequence numbers follow the input order.
    pub fn bids(orders: &[(u64, u64)]) -> Self {
        Self::build(AccountFlags::BIDS, orders, |seq| !seq)
    }

    /// Builds an asks slab. Sequence numbers follow the input order.
    pub fn asks(orders: &[(u64, u64)]) -> Self {
        Self::build(AccountFlags::ASKS, orders, |seq| seq)
    }

    fn build(side: u64, orders: &[(u64, u64)], low_bits: fn(u64) -> u64) -> Self {
        let mut leaves: Vec<LeafNode> = orders
            .iter()
            .zip(1u64..)
            .map(|(&(price, quantity), seq)| LeafNode {
                owner_slot: (seq % 128) as u8,
                fee_tier: 0,
                key: (u128::from(price) << 64) | u128::from(low_bits(seq)),
                owner: Pubkey::new_from_array([seq as u8; 32]),
                quantity,
                client_order_id: seq,
            })
            .collect();
        leaves.sort_by_key(|leaf| leaf.key);

        let mut nodes = Vec::new();
        let root = if leaves.is_empty() {
            0
        } else {
            insert_subtree(&mut nodes, &leaves)
        };

        let book = Orderbook {
            account_flags: AccountFlags(AccountFlags::INITIALIZED | side),
            header: SlabHeader {
                bump_index: nodes.len() as u32,
                free_list_len: 0,
                free_list_head: 0,
                root,
                leaf_count: leaves.len() as u32,
            },
            nodes,
        };
        Self { book }
    }

    /// Appends `count` reclaimed slots threaded into a free list.
    ///
    /// The head is the last appended slot; the terminator is the first.
    pub fn with_free_slots(mut self, count: u32) -> Self {
        if count == 0 {
            return self;
        }
        let base = self.book.nodes.len() as u32;
        self.book.nodes.push(SlabNode::LastFreeNode);
        for index in base + 1..base + count {
            self.book
                .nodes
                .push(SlabNode::FreeNode(FreeNode { next: index - 1 }));
        }
        let header = &mut self.book.header;
        header.bump_index = self.book.nodes.len() as u32;
        header.free_list_len = count;
        header.free_list_head = base + count - 1;
        self
    }
}

/// Places a subtree over sorted, distinct keys and returns its slot.
fn insert_subtree(nodes: &mut Vec<SlabNode>, leaves: &[LeafNode]) -> u32 {
    let slot = nodes.len() as u32;
    let (first, last) = match leaves {
        [leaf] => {
            nodes.push(SlabNode::LeafNode(*leaf));
            return slot;
        }
        [first, .., last] => (first, last),
        [] => unreachable!("empty subtree"),
    };

    let prefix_len = (first.key ^ last.key).leading_zeros();
    let mask = 1u128 << (127 - prefix_len);
    let split = leaves.partition_point(|leaf| leaf.key & mask == 0);

    nodes.push(SlabNode::Uninitialized);
    let low = insert_subtree(nodes, &leaves[..split]);
    let high = insert_subtree(nodes, &leaves[split..]);
    nodes[slot as usize] = SlabNode::InnerNode(InnerNode {
        prefix_len,
        key: first.key,
        children: [low, high],
    });
    slot
}
