//! Reply-tree flattening
//!
//! Turns the provider's nested reply tree into a flat, pre-ordered sequence:
//! every reply appears before any of its own replies, and siblings keep the
//! order the provider sent them in. The traversal uses an explicit worklist,
//! so arbitrarily deep threads cannot exhaust the call stack.

use crate::listing::types::{FlatNode, ReplyChild};

/// Most slots reserved up front, whatever the hint says
const MAX_PREALLOCATED: usize = 4_096;

/// Result of flattening one reply tree
#[derive(Debug, Clone, Default)]
pub struct Flattened {
    /// Replies in document (pre-)order
    pub nodes: Vec<FlatNode>,

    /// "More replies" placeholders that were dropped
    pub stubs: usize,

    /// Children with an unrecognised shape that were dropped
    pub unknown: usize,
}

/// Flattens a reply tree into pre-order
///
/// # Arguments
///
/// * `roots` - Root-level children of the tree, in provider order
/// * `capacity` - Expected number of replies, used to size the output (capped)
///
/// # Returns
///
/// One `FlatNode` per real reply in the tree. Placeholder stubs and
/// unrecognised children are counted but produce no output.
pub fn flatten(roots: Vec<ReplyChild>, capacity: usize) -> Flattened {
    let mut out = Flattened {
        nodes: Vec::with_capacity(capacity.min(MAX_PREALLOCATED)),
        ..Flattened::default()
    };

    // Reversed so the first sibling is popped first
    let mut stack: Vec<(ReplyChild, usize)> = roots.into_iter().rev().map(|c| (c, 0)).collect();

    while let Some((child, depth)) = stack.pop() {
        match child {
            ReplyChild::Node(mut node) => {
                let replies = std::mem::take(&mut node.replies);
                stack.extend(replies.into_iter().rev().map(|c| (c, depth + 1)));
                out.nodes.push(FlatNode::from_node(node, depth));
            }
            ReplyChild::More(stub) => {
                tracing::debug!(
                    "Skipping placeholder for {} more replies under {}",
                    stub.count,
                    stub.parent_id
                );
                out.stubs += 1;
            }
            ReplyChild::Unknown { kind, reason } => {
                tracing::warn!(
                    "Skipping reply of unexpected shape (kind {:?}): {}",
                    kind,
                    reason
                );
                out.unknown += 1;
            }
        }
    }

    out
}
