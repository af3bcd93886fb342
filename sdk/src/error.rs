//! SDK error types.
//!
//! Every decode, traversal and conversion failure is reported through
//! [`SdkError`]. Nothing in this crate panics on malformed account bytes.

use std::fmt;

/// Why a slab failed a structural check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorruptionReason {
    /// A stored slot index is not below `bump_index`.
    IndexOutOfRange {
        /// The number of physical slots in the slab.
        bump_index: u32,
    },

    /// A node of the wrong kind was reached.
    UnexpectedNode {
        /// Name of the node kind that was found.
        found: &'static str,
    },

    /// More pops than physical slots: the tree or free list loops.
    StepLimitExceeded {
        /// The step bound that was exceeded.
        limit: u32,
    },

    /// Traversal visited a different number of leaves than the header claims.
    LeafCountMismatch {
        /// Leaf count stored in the header.
        expected: u32,
        /// Leaves actually reached from the root.
        visited: u32,
    },

    /// The free list length disagrees with the header.
    FreeListMismatch {
        /// Free list length stored in the header.
        expected: u32,
        /// Free nodes actually reached from the head.
        visited: u32,
    },
}

impl fmt::Display for CorruptionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::IndexOutOfRange { bump_index } => {
                write!(f, "index out of range (bump index {})", bump_index)
            }
            Self::UnexpectedNode { found } => write!(f, "unexpected {} node", found),
            Self::StepLimitExceeded { limit } => {
                write!(f, "step limit of {} exceeded, slab contains a cycle", limit)
            }
            Self::LeafCountMismatch { expected, visited } => write!(
                f,
                "leaf count mismatch: header says {}, visited {}",
                expected, visited
            ),
            Self::FreeListMismatch { expected, visited } => write!(
                f,
                "free list mismatch: header says {}, visited {}",
                expected, visited
            ),
        }
    }
}

/// SDK errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SdkError {
    /// A slab record carried a discriminant outside the known variants.
    #[error("malformed slab node tag: {tag}")]
    MalformedTag {
        /// The unknown discriminant.
        tag: u32,
    },

    /// Fewer bytes remain than a fixed-width record requires.
    #[error("truncated buffer at offset {offset}: needed {needed} bytes, {remaining} remaining")]
    TruncatedBuffer {
        /// Offset at which the read was attempted.
        offset: usize,
        /// Bytes the read required.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// The slab violates one of its structural invariants.
    #[error("structural corruption at slot {index}: {reason}")]
    StructuralCorruption {
        /// Slot index at which the violation was detected.
        index: u32,
        /// What was wrong.
        reason: CorruptionReason,
    },

    /// An intermediate or final conversion value does not fit its type.
    #[error("conversion overflow")]
    ConversionOverflow,

    /// Invalid price value.
    #[error("invalid price: {0}")]
    InvalidPrice(String),

    /// Invalid address.
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    /// The account has a size no known layout matches.
    #[error("unsupported account size: {0} bytes")]
    UnsupportedAccountSize(usize),

    /// Deserialization error.
    #[error("deserialization error: {0}")]
    Deserialization(String),

    /// Arithmetic overflow.
    #[error("arithmetic overflow")]
    Overflow,

    /// Division by zero.
    #[error("division by zero")]
    DivisionByZero,
}

impl SdkError {
    /// Shorthand for a [`SdkError::StructuralCorruption`].
    #[must_use]
    pub const fn corruption(index: u32, reason: CorruptionReason) -> Self {
        Self::StructuralCorruption { index, reason }
    }

    /// Returns true if the error was caused by malformed account bytes.
    #[must_use]
    pub const fn is_decode_error(&self) -> bool {
        matches!(
            self,
            Self::MalformedTag { .. }
                | Self::TruncatedBuffer { .. }
                | Self::StructuralCorruption { .. }
                | Self::UnsupportedAccountSize(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SdkError::InvalidPrice("negative value".to_string());
        assert_eq!(err.to_string(), "invalid price: negative value");
    }

    #[test]
    fn test_malformed_tag_display() {
        let err = SdkError::MalformedTag { tag: 9 };
        assert_eq!(err.to_string(), "malformed slab node tag: 9");
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_truncated_display() {
        let err = SdkError::TruncatedBuffer {
            offset: 45,
            needed: 72,
            remaining: 10,
        };
        assert_eq!(
            err.to_string(),
            "truncated buffer at offset 45: needed 72 bytes, 10 remaining"
        );
    }

    #[test]
    fn test_corruption_display() {
        let err = SdkError::corruption(3, CorruptionReason::StepLimitExceeded { limit: 4 });
        assert_eq!(
            err.to_string(),
            "structural corruption at slot 3: step limit of 4 exceeded, slab contains a cycle"
        );
        assert!(err.is_decode_error());
    }

    #[test]
    fn test_conversion_is_not_decode_error() {
        assert!(!SdkError::ConversionOverflow.is_decode_error());
        assert_eq!(SdkError::Overflow.to_string(), "arithmetic overflow");
    }
}
