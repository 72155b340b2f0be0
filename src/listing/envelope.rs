//! Provider response envelopes
//!
//! Feed pages arrive as `{ data: { children: [ { data: FeedItem } ] } }` and
//! reply trees as a two-element array whose second element holds the
//! root-level replies.

use crate::listing::types::{FeedItem, ReplyChild, ReplyListing};
use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
struct FeedListing {
    data: FeedListingData,
}

#[derive(Debug, Deserialize)]
struct FeedListingData {
    #[serde(default)]
    children: Vec<FeedChild>,
}

#[derive(Debug, Deserialize)]
struct FeedChild {
    #[serde(default)]
    data: Value,
}

/// One decoded page of the feed
#[derive(Debug, Clone, Default)]
pub struct FeedPage {
    /// Items in response order
    pub items: Vec<FeedItem>,

    /// Anchor for the next request, taken from the last item
    pub next_cursor: Option<String>,

    /// Children that did not decode as feed items
    pub skipped: usize,
}

/// Decodes a feed page, unwrapping one level of child nesting
///
/// Children that fail to decode are skipped with a warning; only a broken
/// envelope is an error.
pub fn decode_feed_page(body: &str) -> Result<FeedPage, serde_json::Error> {
    let listing: FeedListing = serde_json::from_str(body)?;

    let mut page = FeedPage {
        items: Vec::with_capacity(listing.data.children.len()),
        ..FeedPage::default()
    };

    for (index, child) in listing.data.children.into_iter().enumerate() {
        match serde_json::from_value::<FeedItem>(child.data) {
            Ok(item) => page.items.push(item),
            Err(e) => {
                tracing::warn!("Skipping feed child {}: {}", index, e);
                page.skipped += 1;
            }
        }
    }

    page.next_cursor = page.items.last().and_then(|item| item.name.clone());
    Ok(page)
}

/// Decodes a reply-tree response into its root-level children
///
/// Element 0 describes the post and is ignored.
pub fn decode_reply_tree(body: &str) -> Result<Vec<ReplyChild>, serde_json::Error> {
    let (_post, replies): (IgnoredAny, ReplyListing) = serde_json::from_str(body)?;
    Ok(replies.data.children)
}
