//! Score-based selection and ordering

use crate::listing::FlatNode;

/// Keeps the nodes scoring strictly below `threshold`, in input order
pub fn filter_below<I>(nodes: I, threshold: i64) -> Vec<FlatNode>
where
    I: IntoIterator<Item = FlatNode>,
{
    nodes
        .into_iter()
        .filter(|node| node.score < threshold)
        .collect()
}

/// Orders nodes by ascending score, most downvoted first
///
/// The sort is stable: nodes with equal scores keep their relative order.
pub fn sort_by_score(nodes: &mut [FlatNode]) {
    nodes.sort_by_key(|node| node.score);
}
