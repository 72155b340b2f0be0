use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// One post in the provider's listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,

    /// Fullname (`t3_<id>`) used as the pagination anchor
    #[serde(default)]
    pub name: Option<String>,

    pub score: i64,

    #[serde(default)]
    pub num_comments: u64,

    pub subreddit: String,
    pub permalink: String,
    pub title: String,

    #[serde(default)]
    pub created_utc: f64,
}

/// A reply as delivered by the provider, still holding its nested replies
#[derive(Debug, Clone, Deserialize)]
pub struct Node {
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub subreddit: String,

    pub score: i64,
    pub body: String,

    #[serde(default)]
    pub created_utc: f64,

    #[serde(default, deserialize_with = "deserialize_replies")]
    pub replies: Vec<ReplyChild>,
}

/// Placeholder the provider sends instead of replies it did not inline
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct MoreStub {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub parent_id: String,

    #[serde(default)]
    pub count: u64,

    #[serde(default)]
    pub children: Vec<String>,
}

/// A listing child, classified when it is decoded
///
/// Stubs and unrecognised shapes are kept as values instead of failing the
/// whole response, so one odd child never costs the rest of the tree.
#[derive(Debug, Clone)]
pub enum ReplyChild {
    Node(Node),
    More(MoreStub),
    Unknown {
        kind: Option<String>,
        reason: String,
    },
}

impl ReplyChild {
    /// Number of real nodes in this subtree, stubs and unknowns excluded
    pub fn node_count(&self) -> usize {
        match self {
            Self::Node(node) => 1 + node.replies.iter().map(Self::node_count).sum::<usize>(),
            Self::More(_) | Self::Unknown { .. } => 0,
        }
    }
}

/// Raw `{ "kind": ..., "data": ... }` wrapper around every listing child
#[derive(Debug, Deserialize)]
struct ChildEnvelope {
    #[serde(default)]
    kind: Option<String>,
    #[serde(default)]
    data: Value,
}

impl<'de> Deserialize<'de> for ReplyChild {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        ChildEnvelope::deserialize(deserializer).map(ReplyChild::from)
    }
}

impl From<ChildEnvelope> for ReplyChild {
    fn from(envelope: ChildEnvelope) -> Self {
        let ChildEnvelope { kind, data } = envelope;

        if kind.as_deref() == Some("more") || looks_like_more_stub(&data) {
            return Self::More(serde_json::from_value(data).unwrap_or_default());
        }

        match serde_json::from_value::<Node>(data) {
            Ok(node) => Self::Node(node),
            Err(e) => Self::Unknown {
                kind,
                reason: e.to_string(),
            },
        }
    }
}

/// A "more" stub carries a `count` and a list of child ids but no body
fn looks_like_more_stub(data: &Value) -> bool {
    let Some(object) = data.as_object() else {
        return false;
    };

    !object.contains_key("body")
        && object.contains_key("count")
        && object
            .get("children")
            .and_then(Value::as_array)
            .is_some_and(|ids| ids.iter().all(Value::is_string))
}

/// The provider writes `""` for "no replies" and a listing otherwise
fn deserialize_replies<'de, D>(deserializer: D) -> Result<Vec<ReplyChild>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Replies {
        Listing(ReplyListing),
        Empty(String),
    }

    Ok(match Option::<Replies>::deserialize(deserializer)? {
        Some(Replies::Listing(listing)) => listing.data.children,
        Some(Replies::Empty(_)) | None => Vec::new(),
    })
}

/// `{ "data": { "children": [...] } }` holding reply children
#[derive(Debug, Deserialize)]
pub(crate) struct ReplyListing {
    pub(crate) data: ReplyListingData,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ReplyListingData {
    #[serde(default)]
    pub(crate) children: Vec<ReplyChild>,
}

/// A reply detached from its tree, ready for filtering and reporting
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FlatNode {
    pub id: String,
    pub name: String,
    pub subreddit: String,
    pub score: i64,
    pub body: String,
    pub created_utc: f64,

    /// Nesting depth, 0 for replies directly on the post
    pub depth: usize,

    /// The post this reply belongs to, attached after flattening
    pub item: Option<FeedItem>,
}

impl FlatNode {
    /// Strips a node of its children
    pub(crate) fn from_node(node: Node, depth: usize) -> Self {
        Self {
            id: node.id,
            name: node.name,
            subreddit: node.subreddit,
            score: node.score,
            body: node.body,
            created_utc: node.created_utc,
            depth,
            item: None,
        }
    }

    /// Attaches a copy of the owning feed item
    pub fn with_item(mut self, item: &FeedItem) -> Self {
        self.item = Some(item.clone());
        self
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        timestamp(self.created_utc)
    }
}

fn timestamp(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs <= 0.0 {
        return None;
    }
    Utc.timestamp_opt(secs as i64, 0).single()
}
