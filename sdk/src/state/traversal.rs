//! Price-ordered traversal of a slab and level aggregation.
//!
//! The critbit tree is walked with an explicit index stack. Every pop counts
//! against a budget of `bump_index` steps: a well-formed tree has fewer nodes
//! than physical slots, so running out of budget means a child index points
//! back into its own ancestry.

use std::iter::FusedIterator;
use std::ops::ControlFlow;

use tracing::trace;

use super::node::{LeafNode, SlabNode};
use super::slab::Orderbook;
use crate::error::{CorruptionReason, SdkError};
use crate::types::{BookLevel, Price, Quantity};

/// Lazy, price-ordered sequence of the leaves of an [`Orderbook`].
///
/// Yields at most one error, after which it is exhausted. When the walk
/// completes without error the number of leaves yielded is checked against
/// the header's `leaf_count`.
#[derive(Debug, Clone)]
pub struct Leaves<'a> {
    book: &'a Orderbook,
    ascending: bool,
    stack: Vec<u32>,
    steps: u32,
    visited: u32,
    done: bool,
}

impl<'a> Leaves<'a> {
    fn new(book: &'a Orderbook, ascending: bool) -> Self {
        let stack = if book.is_empty() {
            Vec::new()
        } else {
            vec![book.header.root]
        };
        Self {
            book,
            ascending,
            stack,
            steps: 0,
            visited: 0,
            done: false,
        }
    }

    /// Number of leaves yielded so far.
    #[must_use]
    pub const fn visited(&self) -> u32 {
        self.visited
    }

    fn fail(&mut self, error: SdkError) -> Option<Result<&'a LeafNode, SdkError>> {
        self.done = true;
        self.stack.clear();
        Some(Err(error))
    }
}

impl<'a> Iterator for Leaves<'a> {
    type Item = Result<&'a LeafNode, SdkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let limit = self.book.header.bump_index;
        loop {
            let Some(index) = self.stack.pop() else {
                self.done = true;
                let expected = self.book.header.leaf_count;
                if self.visited != expected {
                    return Some(Err(SdkError::corruption(
                        self.book.header.root,
                        CorruptionReason::LeafCountMismatch {
                            expected,
                            visited: self.visited,
                        },
                    )));
                }
                return None;
            };

            if self.steps >= limit {
                return self.fail(SdkError::corruption(
                    index,
                    CorruptionReason::StepLimitExceeded { limit },
                ));
            }
            self.steps += 1;

            let node = match self.book.node(index) {
                Ok(node) => node,
                Err(e) => return self.fail(e),
            };
            trace!(index, kind = node.kind(), "slab pop");

            match node {
                SlabNode::InnerNode(inner) => {
                    self.stack.extend(inner.push_order(self.ascending));
                }
                SlabNode::LeafNode(leaf) => {
                    self.visited += 1;
                    return Some(Ok(leaf));
                }
                other => {
                    return self.fail(SdkError::corruption(
                        index,
                        CorruptionReason::UnexpectedNode {
                            found: other.kind(),
                        },
                    ));
                }
            }
        }
    }
}

impl FusedIterator for Leaves<'_> {}

impl Orderbook {
    /// Returns the leaves in ascending or descending price order.
    #[must_use]
    pub fn leaves(&self, ascending: bool) -> Leaves<'_> {
        Leaves::new(self, ascending)
    }

    /// Visits leaves in price order until `visit` breaks.
    ///
    /// A visitor that breaks ends the walk immediately; the leaf count is
    /// only checked when the walk runs to completion.
    ///
    /// # Errors
    ///
    /// Returns `SdkError::StructuralCorruption` if the walk reaches an index
    /// outside the node array, a non-tree node, more than `bump_index` slots,
    /// or a leaf total different from `leaf_count`.
    pub fn items<F>(&self, ascending: bool, mut visit: F) -> Result<(), SdkError>
    where
        F: FnMut(&LeafNode) -> ControlFlow<()>,
    {
        for leaf in self.leaves(ascending) {
            if visit(leaf?).is_break() {
                break;
            }
        }
        Ok(())
    }

    /// Aggregates the first `depth` price levels.
    ///
    /// # Errors
    ///
    /// Propagates traversal errors, and `SdkError::Overflow` if a level's
    /// summed size does not fit a `u64`.
    pub fn levels(&self, ascending: bool, depth: usize) -> Result<Vec<BookLevel>, SdkError> {
        coalesce_levels(self.leaves(ascending), depth)
    }
}

/// Folds an already price-ordered leaf sequence into at most `depth` levels.
///
/// Only strictly consecutive leaves with the same price are merged. Input
/// order is trusted; equal prices separated by another price stay separate.
///
/// # Errors
///
/// Returns the first error in `leaves`, or `SdkError::Overflow` if a level's
/// summed size does not fit a `u64`.
pub fn coalesce_levels<'a, I>(leaves: I, depth: usize) -> Result<Vec<BookLevel>, SdkError>
where
    I: IntoIterator<Item = Result<&'a LeafNode, SdkError>>,
{
    let mut levels: Vec<BookLevel> = Vec::new();
    if depth == 0 {
        return Ok(levels);
    }

    for leaf in leaves {
        let leaf = leaf?;
        let price = Price::new(leaf.price());
        let quantity = Quantity::new(leaf.quantity);
        let len = levels.len();
        match levels.last_mut() {
            Some(level) if level.price == price => level.absorb(quantity)?,
            _ if len == depth => break,
            _ => levels.push(BookLevel::new(price, quantity)),
        }
    }
    Ok(levels)
}
