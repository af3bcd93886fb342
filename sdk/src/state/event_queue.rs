//! Event queue accounts.
//!
//! The queue is a ring buffer of fixed-width events behind a small header.
//! Only the `count` events starting at `head` are live; the rest of the ring
//! holds stale data and is not decoded.

use std::fmt;

use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use super::account_flags::AccountFlags;
use super::node::OrderId;
use super::slab::{ACCOUNT_HEAD_PADDING, ACCOUNT_TAIL_PADDING};
use crate::codec::{serde_pubkey, serde_u128, AccountReader};
use crate::error::SdkError;
use crate::types::Side;

/// Encoded width of the queue header, including leading padding.
pub const EVENT_QUEUE_HEADER_SIZE: usize = ACCOUNT_HEAD_PADDING.len() + 8 * 4;

/// Encoded width of one event.
pub const EVENT_SIZE: usize = 88;

/// Event flag bits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventFlags(pub u8);

impl EventFlags {
    /// A trade against a resting order.
    pub const FILL: u8 = 0x1;
    /// An order left the book.
    pub const OUT: u8 = 0x2;
    /// The order was a bid.
    pub const BID: u8 = 0x4;
    /// The order was resting (maker side).
    pub const MAKER: u8 = 0x8;

    /// Returns true if every bit of `flag` is set.
    #[must_use]
    pub const fn is(&self, flag: u8) -> bool {
        self.0 & flag == flag
    }
}

impl fmt::Display for EventFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = [
            (Self::FILL, "FILL"),
            (Self::OUT, "OUT"),
            (Self::BID, "BID"),
            (Self::MAKER, "MAKER"),
        ]
        .iter()
        .filter(|(flag, _)| self.is(*flag))
        .map(|(_, name)| *name)
        .collect();
        write!(f, "{}", names.join(" | "))
    }
}

/// One fill or out event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event kind and side.
    pub flags: EventFlags,

    /// Slot of the order in the owner's open orders account.
    pub owner_slot: u8,

    /// Fee tier of the owner.
    pub fee_tier: u8,

    /// Native tokens released to the owner.
    pub native_qty_released: u64,

    /// Native tokens paid by the owner.
    pub native_qty_paid: u64,

    /// Fee paid, or rebate received by a maker.
    pub native_fee_or_rebate: u64,

    /// Key of the order involved.
    #[serde(with = "serde_u128")]
    pub order_id: u128,

    /// Open orders account of the owner.
    #[serde(with = "serde_pubkey")]
    pub owner: Pubkey,

    /// Client supplied order id.
    pub client_order_id: u64,
}

impl Event {
    fn decode_from(r: &mut AccountReader<'_>) -> Result<Self, SdkError> {
        r.require(EVENT_SIZE)?;
        let flags = EventFlags(r.read_u8()?);
        let owner_slot = r.read_u8()?;
        let fee_tier = r.read_u8()?;
        r.skip(5)?;
        Ok(Self {
            flags,
            owner_slot,
            fee_tier,
            native_qty_released: r.read_u64()?,
            native_qty_paid: r.read_u64()?,
            native_fee_or_rebate: r.read_u64()?,
            order_id: r.read_u128()?,
            owner: r.read_pubkey()?,
            client_order_id: r.read_u64()?,
        })
    }

    /// Returns the side of the order involved.
    #[must_use]
    pub const fn side(&self) -> Side {
        if self.flags.is(EventFlags::BID) {
            Side::Bid
        } else {
            Side::Ask
        }
    }

    /// Returns true for fill events.
    #[must_use]
    pub const fn is_fill(&self) -> bool {
        self.flags.is(EventFlags::FILL)
    }

    /// Returns true if the owner was the resting side.
    #[must_use]
    pub const fn is_maker(&self) -> bool {
        self.flags.is(EventFlags::MAKER)
    }

    /// Returns the order id.
    #[must_use]
    pub const fn order(&self) -> OrderId {
        OrderId(self.order_id)
    }
}

/// Decoded event queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventQueue {
    /// Account flags; `INITIALIZED | EVENT_QUEUE` for a live queue.
    pub account_flags: AccountFlags,

    /// Ring slot of the oldest live event.
    pub head: u64,

    /// Number of live events.
    pub count: u64,

    /// Sequence number of the next event to be pushed.
    pub seq_num: u64,

    /// Live events, oldest first.
    pub events: Vec<Event>,
}

impl EventQueue {
    /// Decodes an event queue account, reading the live events in ring
    /// order.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::TruncatedBuffer` if the header does not fit, and
    /// `SdkError::Deserialization` if `head` or `count` do not fit the ring.
    pub fn decode(data: &[u8]) -> Result<Self, SdkError> {
        let mut r = AccountReader::new(data);
        r.require(EVENT_QUEUE_HEADER_SIZE + ACCOUNT_TAIL_PADDING.len())?;
        r.skip(ACCOUNT_HEAD_PADDING.len())?;
        let account_flags = AccountFlags(r.read_u64()?);
        let head = r.read_u64()?;
        let count = r.read_u64()?;
        let seq_num = r.read_u64()?;

        let ring = r.read_bytes(r.remaining() - ACCOUNT_TAIL_PADDING.len())?;
        let capacity = (ring.len() / EVENT_SIZE) as u64;
        if count > capacity || (count > 0 && head >= capacity) {
            return Err(SdkError::Deserialization(format!(
                "event queue head {} count {} exceed capacity {}",
                head, count, capacity
            )));
        }

        let events = (0..count)
            .map(|i| {
                let slot = (head + i) % capacity;
                let offset = slot as usize * EVENT_SIZE;
                let record = ring.get(offset..).unwrap_or_default();
                Event::decode_from(&mut AccountReader::new(record))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            account_flags,
            head,
            count,
            seq_num,
            events,
        })
    }

    /// Returns the fill events.
    pub fn fills(&self) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(|event| event.is_fill())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_bytes(flags: u8, qty: u64, seq: u8) -> Vec<u8> {
        let mut data = vec![flags, seq, 0, 0, 0, 0, 0, 0];
        data.extend_from_slice(&qty.to_le_bytes());
        data.extend_from_slice(&(qty * 2).to_le_bytes());
        data.extend_from_slice(&3u64.to_le_bytes());
        data.extend_from_slice(&((u128::from(seq) << 64) | 7).to_le_bytes());
        data.extend_from_slice(&[seq; 32]);
        data.extend_from_slice(&u64::from(seq).to_le_bytes());
        data
    }

    fn queue_bytes(head: u64, count: u64, ring: &[Vec<u8>]) -> Vec<u8> {
        let mut data = b"serum".to_vec();
        data.extend_from_slice(&(AccountFlags::INITIALIZED | AccountFlags::EVENT_QUEUE).to_le_bytes());
        data.extend_from_slice(&head.to_le_bytes());
        data.extend_from_slice(&count.to_le_bytes());
        data.extend_from_slice(&42u64.to_le_bytes());
        for event in ring {
            data.extend_from_slice(event);
        }
        data.extend_from_slice(b"padding");
        data
    }

    #[test]
    fn test_event_layout() {
        assert_eq!(event_bytes(0, 0, 0).len(), EVENT_SIZE);
        assert_eq!(EVENT_QUEUE_HEADER_SIZE, 37);
    }

    #[test]
    fn test_decode_wraps_ring() {
        let ring = vec![
            event_bytes(EventFlags::FILL | EventFlags::BID, 10, 1),
            event_bytes(EventFlags::OUT, 20, 2),
            event_bytes(EventFlags::FILL | EventFlags::MAKER, 30, 3),
        ];
        let queue = EventQueue::decode(&queue_bytes(2, 2, &ring)).expect("decode");

        assert!(queue.account_flags.is(AccountFlags::EVENT_QUEUE));
        assert_eq!(queue.seq_num, 42);
        assert_eq!(queue.events.len(), 2);

        let first = &queue.events[0];
        assert_eq!(first.owner_slot, 3);
        assert!(first.is_fill());
        assert!(first.is_maker());
        assert_eq!(first.side(), Side::Ask);
        assert_eq!(first.native_qty_released, 30);
        assert_eq!(first.native_qty_paid, 60);
        assert_eq!(first.order().price(), 3);

        let second = &queue.events[1];
        assert_eq!(second.side(), Side::Bid);
        assert_eq!(second.client_order_id, 1);
        assert_eq!(queue.fills().count(), 2);
    }

    #[test]
    fn test_empty_queue() {
        let queue = EventQueue::decode(&queue_bytes(0, 0, &[])).expect("decode");
        assert!(queue.events.is_empty());
    }

    #[test]
    fn test_count_exceeds_capacity() {
        let ring = vec![event_bytes(EventFlags::OUT, 1, 1)];
        assert!(matches!(
            EventQueue::decode(&queue_bytes(0, 2, &ring)),
            Err(SdkError::Deserialization(_))
        ));
        assert!(matches!(
            EventQueue::decode(&queue_bytes(5, 1, &ring)),
            Err(SdkError::Deserialization(_))
        ));
    }

    #[test]
    fn test_truncated_header() {
        assert!(matches!(
            EventQueue::decode(b"serum"),
            Err(SdkError::TruncatedBuffer { .. })
        ));
    }

    #[test]
    fn test_flags_display() {
        let flags = EventFlags(EventFlags::FILL | EventFlags::BID | EventFlags::MAKER);
        assert_eq!(flags.to_string(), "FILL | BID | MAKER");
    }
}
