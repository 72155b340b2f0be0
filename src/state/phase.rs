/// Crawl phase definitions for tracking run progress
///
/// A run moves strictly forward: `Init → Paging → TreeFetching → Done`.
/// Individual request failures never change the phase.
use std::fmt;

/// Represents the current phase of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CrawlPhase {
    /// Credential obtained, rate limiter seeded, nothing fetched yet
    Init,

    /// Requesting feed pages and accumulating feed items
    Paging,

    /// Fetching and flattening the reply tree of every feed item
    TreeFetching,

    /// Report finalized
    Done,
}

impl CrawlPhase {
    /// The phase that follows this one, if any
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Paging),
            Self::Paging => Some(Self::TreeFetching),
            Self::TreeFetching => Some(Self::Done),
            Self::Done => None,
        }
    }

    /// Returns true if moving from `self` to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Paging => "paging",
            Self::TreeFetching => "tree_fetching",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for CrawlPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
