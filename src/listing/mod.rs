//! Listing data model and reply-tree flattening
//!
//! This module contains:
//! - Feed items and reply nodes as decoded from the provider
//! - The provider's response envelopes
//! - Pre-order flattening of nested reply trees

mod envelope;
mod flatten;
mod types;

pub use envelope::{decode_feed_page, decode_reply_tree, FeedPage};
pub use flatten::{flatten, Flattened};
pub use types::{FeedItem, FlatNode, MoreStub, Node, ReplyChild};
