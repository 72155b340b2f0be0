//! Report generation
//!
//! This module handles:
//! - Selecting replies below the score threshold
//! - Ordering them most-downvoted first
//! - Rendering the final report as plain text or JSON

mod filter;
mod render;

pub use filter::{filter_below, sort_by_score};
pub use render::{deep_link, render_json, render_text, write_report, ReportFormat};

use crate::listing::FlatNode;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Counters collected over one run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CrawlStats {
    /// Feed page requests attempted
    pub pages_requested: usize,

    /// Feed items accumulated across all pages
    pub feed_items: usize,

    /// Feed children that did not decode as items
    pub feed_items_skipped: usize,

    /// Reply trees fetched successfully
    pub trees_fetched: usize,

    /// Replies produced by flattening
    pub nodes_flattened: usize,

    /// "More replies" placeholders dropped while flattening
    pub stubs_skipped: usize,

    /// Children of unexpected shape dropped while flattening
    pub unknown_skipped: usize,

    /// Requests that failed and contributed nothing
    pub failed_requests: usize,

    /// Replies that made it into the report
    pub matches: usize,
}

/// The outcome of one crawl
#[derive(Debug, Clone, Serialize)]
pub struct CrawlReport {
    pub category: String,
    pub listing: String,
    pub threshold: i64,
    pub generated_at: DateTime<Utc>,
    pub stats: CrawlStats,

    /// Replies below the threshold, most downvoted first
    pub entries: Vec<FlatNode>,
}

impl CrawlReport {
    /// Returns true if some requests failed, so the report may be incomplete
    pub fn is_partial(&self) -> bool {
        self.stats.failed_requests > 0
    }
}
