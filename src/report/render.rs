//! Report rendering
//!
//! The plain-text form prints one block per reply, separated by a dashed
//! line. The JSON form carries the same entries plus the run statistics.

use crate::config::ApiConfig;
use crate::listing::{FeedItem, FlatNode};
use crate::report::{CrawlReport, CrawlStats};
use crate::UndertowError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::io::Write;

const DELIMITER: &str = "--------------";

/// How the report is written to standard output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ReportFormat {
    #[default]
    Text,
    Json,
}

/// Builds a link straight to a reply inside its post's thread
///
/// # Example
///
/// `https://np.reddit.com` + `/r/pics/comments/p1/title/` + `c9` becomes
/// `https://np.reddit.com/r/pics/comments/p1/title/c9?context=10`
pub fn deep_link(link_base: &str, item: &FeedItem, node: &FlatNode, context: u32) -> String {
    let permalink = item.permalink.trim_matches('/');
    format!(
        "{}/{}/{}?context={}",
        link_base.trim_end_matches('/'),
        permalink,
        node.id,
        context
    )
}

/// Renders the report as plain text
pub fn render_text(report: &CrawlReport, api: &ApiConfig) -> String {
    let mut text = String::new();

    for entry in &report.entries {
        let category = match (&entry.item, entry.subreddit.is_empty()) {
            (Some(item), true) => item.subreddit.as_str(),
            _ => entry.subreddit.as_str(),
        };
        let title = entry
            .item
            .as_ref()
            .map(|item| item.title.as_str())
            .unwrap_or("(unknown post)");

        text.push_str(DELIMITER);
        text.push('\n');
        text.push_str(&format!("{} [{}] {}\n", entry.score, category, title));
        if let Some(item) = &entry.item {
            text.push_str(&deep_link(&api.link_base_url, item, entry, api.link_context));
            text.push('\n');
        }
        text.push_str(&entry.body);
        text.push('\n');
    }

    text
}

#[derive(Serialize)]
struct JsonReport<'a> {
    category: &'a str,
    listing: &'a str,
    threshold: i64,
    generated_at: DateTime<Utc>,
    stats: &'a CrawlStats,
    entries: Vec<JsonEntry<'a>>,
}

#[derive(Serialize)]
struct JsonEntry<'a> {
    #[serde(flatten)]
    node: &'a FlatNode,
    link: Option<String>,
}

/// Renders the report as pretty-printed JSON
pub fn render_json(report: &CrawlReport, api: &ApiConfig) -> serde_json::Result<String> {
    let json = JsonReport {
        category: &report.category,
        listing: &report.listing,
        threshold: report.threshold,
        generated_at: report.generated_at,
        stats: &report.stats,
        entries: report
            .entries
            .iter()
            .map(|node| JsonEntry {
                node,
                link: node
                    .item
                    .as_ref()
                    .map(|item| deep_link(&api.link_base_url, item, node, api.link_context)),
            })
            .collect(),
    };

    serde_json::to_string_pretty(&json)
}

/// Writes the report in the requested format
pub fn write_report<W: Write>(
    mut out: W,
    report: &CrawlReport,
    format: ReportFormat,
    api: &ApiConfig,
) -> Result<(), UndertowError> {
    match format {
        ReportFormat::Text => out.write_all(render_text(report, api).as_bytes())?,
        ReportFormat::Json => {
            out.write_all(render_json(report, api)?.as_bytes())?;
            out.write_all(b"\n")?;
        }
    }
    out.flush()?;
    Ok(())
}
