//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives a run through its phases:
//! - Paging through the feed listing, following the cursor of each page
//! - Fetching, flattening and filtering the reply tree of every feed item
//! - Sorting the selected replies into the final report
//!
//! A failed request is logged and contributes nothing; it never aborts the
//! run. The only early stop is an expired credential, after which no further
//! request is issued.

use crate::auth::{Credential, TokenClient};
use crate::config::{Config, Credentials};
use crate::crawler::fetcher::{build_http_client, FetchError, Fetcher};
use crate::crawler::limiter::{PermitStore, Replenisher, TokenBucket};
use crate::listing::{flatten, FeedItem, FlatNode};
use crate::report::{filter_below, sort_by_score, CrawlReport, CrawlStats};
use crate::state::CrawlPhase;
use crate::UndertowError;
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Main crawl driver
pub struct Coordinator<P> {
    config: Arc<Config>,
    fetcher: Fetcher<P>,
    credential: Credential,
    phase: CrawlPhase,
    stats: CrawlStats,
    halted: bool,
}

impl<P: PermitStore> Coordinator<P> {
    /// Creates a coordinator in the `Init` phase
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `fetcher` - Fetcher whose permit store is already seeded
    /// * `credential` - Bearer credential used for every request
    pub fn new(config: Config, fetcher: Fetcher<P>, credential: Credential) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            credential,
            phase: CrawlPhase::Init,
            stats: CrawlStats::default(),
            halted: false,
        }
    }

    pub fn phase(&self) -> CrawlPhase {
        self.phase
    }

    pub fn stats(&self) -> &CrawlStats {
        &self.stats
    }

    /// Runs the crawl to completion
    ///
    /// Can only be called once; a second call fails with an invalid
    /// transition.
    pub async fn run(&mut self) -> Result<CrawlReport, UndertowError> {
        let start_time = Instant::now();
        tracing::info!(
            "Starting crawl of /r/{}/{} (threshold {})",
            self.config.crawl.category,
            self.config.crawl.listing,
            self.config.crawl.threshold
        );

        self.transition(CrawlPhase::Paging)?;
        let items = self.collect_feed().await;

        self.transition(CrawlPhase::TreeFetching)?;
        let mut entries = self.collect_replies(&items).await;
        sort_by_score(&mut entries);

        self.transition(CrawlPhase::Done)?;
        self.stats.matches = entries.len();

        tracing::info!(
            "Crawl completed in {:?}: {} items, {} replies scanned, {} selected, {} failed requests",
            start_time.elapsed(),
            self.stats.feed_items,
            self.stats.nodes_flattened,
            self.stats.matches,
            self.stats.failed_requests
        );

        Ok(CrawlReport {
            category: self.config.crawl.category.clone(),
            listing: self.config.crawl.listing.clone(),
            threshold: self.config.crawl.threshold,
            generated_at: Utc::now(),
            stats: self.stats.clone(),
            entries,
        })
    }

    /// Pages through the feed, accumulating items in page order
    ///
    /// Stops after the configured number of pages, at the first empty page,
    /// at a page whose last item has no anchor, or at the first failed page.
    pub async fn collect_feed(&mut self) -> Vec<FeedItem> {
        let config = Arc::clone(&self.config);
        let crawl = &config.crawl;

        // Grows page by page; only one page is reserved up front
        let mut items: Vec<FeedItem> = Vec::with_capacity(crawl.page_limit as usize);
        let mut cursor: Option<String> = None;

        tracing::info!(
            "Requesting up to {} items from /r/{}/{}",
            crawl.pages as usize * crawl.page_limit as usize,
            crawl.category,
            crawl.listing
        );

        for page in 0..crawl.pages {
            if self.halted {
                break;
            }

            self.stats.pages_requested += 1;
            let result = self
                .fetcher
                .fetch_feed_page(
                    &self.credential,
                    &crawl.category,
                    &crawl.listing,
                    crawl.page_limit,
                    cursor.as_deref(),
                    items.len(),
                )
                .await;

            let feed = match result {
                Ok(feed) => feed,
                Err(e) => {
                    // Without this page there is no cursor to continue from
                    self.record_failure(&e);
                    break;
                }
            };

            self.stats.feed_items_skipped += feed.skipped;
            let received = feed.items.len();
            items.extend(feed.items);
            tracing::info!(
                "{}% ({} items after page {})",
                (page + 1) * 100 / crawl.pages,
                items.len(),
                page + 1
            );

            if received == 0 {
                tracing::info!("Page {} was empty, pagination complete", page + 1);
                break;
            }

            match feed.next_cursor {
                Some(next) => cursor = Some(next),
                None => {
                    tracing::info!("Page {} has no continuation anchor", page + 1);
                    break;
                }
            }
        }

        self.stats.feed_items = items.len();
        items
    }

    /// Fetches and flattens the reply tree of every item, keeping matches
    ///
    /// Trees are requested in item order. With a concurrency above one,
    /// several requests are in flight at once, each waiting for its own
    /// permit; results are still consumed in item order.
    pub async fn collect_replies(&mut self, items: &[FeedItem]) -> Vec<FlatNode> {
        let threshold = self.config.crawl.threshold;
        let capacity = self.config.crawl.reply_capacity;
        let concurrency = self.config.crawl.tree_concurrency.max(1);

        let fetcher = &self.fetcher;
        let credential = &self.credential;
        let stats = &mut self.stats;
        let halted = &mut self.halted;

        let mut selected = Vec::new();
        if *halted {
            return selected;
        }

        let mut trees = stream::iter(items)
            .map(|item| async move { (item, fetcher.fetch_reply_tree(credential, item).await) })
            .buffered(concurrency);

        while let Some((item, result)) = trees.next().await {
            tracing::debug!("{} [{}] {}", item.score, item.subreddit, item.title);

            let roots = match result {
                Ok(roots) => roots,
                Err(e) => {
                    log_failure(stats, &e);
                    if e.is_credential_expired() {
                        *halted = true;
                        break;
                    }
                    continue;
                }
            };

            let flat = flatten(roots, capacity);
            stats.trees_fetched += 1;
            stats.nodes_flattened += flat.nodes.len();
            stats.stubs_skipped += flat.stubs;
            stats.unknown_skipped += flat.unknown;

            for node in filter_below(flat.nodes, threshold) {
                let node = node.with_item(item);
                tracing::info!(
                    "{} {} [{}] {}",
                    node.score,
                    node.created_at()
                        .map(|t| t.to_rfc3339())
                        .unwrap_or_else(|| "-".to_string()),
                    node.subreddit,
                    node.name
                );
                selected.push(node);
            }
        }

        selected
    }

    /// Moves to the next phase, rejecting anything but a forward step
    fn transition(&mut self, to: CrawlPhase) -> Result<(), UndertowError> {
        if !self.phase.can_transition_to(to) {
            return Err(UndertowError::InvalidTransition {
                from: self.phase,
                to,
            });
        }

        tracing::debug!("Crawl phase {} -> {}", self.phase, to);
        self.phase = to;
        Ok(())
    }

    fn record_failure(&mut self, error: &FetchError) {
        log_failure(&mut self.stats, error);
        if error.is_credential_expired() {
            self.halted = true;
        }
    }
}

fn log_failure(stats: &mut CrawlStats, error: &FetchError) {
    stats.failed_requests += 1;
    if error.is_credential_expired() {
        tracing::error!("{}; no further requests will be issued", error);
    } else {
        tracing::error!("{}", error);
    }
}

/// Runs a complete crawl
///
/// This function orchestrates the whole run:
///
/// 1. Obtain a credential (the only fatal failure)
/// 2. Seed the token bucket to capacity and start its replenisher
/// 3. Page through the feed
/// 4. Fetch, flatten and filter every reply tree
/// 5. Stop the replenisher and return the sorted report
///
/// # Example
///
/// ```no_run
/// use undertow::config::{load_config, Credentials};
/// use undertow::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("undertow.toml"))?;
/// let report = run_crawl(config, &Credentials::from_env()?).await?;
/// println!("{} replies selected", report.entries.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    credentials: &Credentials,
) -> Result<CrawlReport, UndertowError> {
    let client = build_http_client(&config.api)?;

    let credential = TokenClient::new(client.clone(), &config.api)
        .obtain_credential(credentials)
        .await?;
    match credential.expires_at() {
        Some(expiry) => tracing::info!(
            "Obtained credential (scope {:?}) valid until {}",
            credential.scope(),
            expiry
        ),
        None => tracing::info!(
            "Obtained credential (scope {:?}) without expiry",
            credential.scope()
        ),
    }

    let bucket = Arc::new(TokenBucket::full(config.rate_limit.capacity));
    let replenisher = Replenisher::spawn(
        Arc::clone(&bucket),
        Duration::from_millis(config.rate_limit.interval_ms),
    );

    let fetcher = Fetcher::new(client, &config.api, bucket)?;
    let mut coordinator = Coordinator::new(config, fetcher, credential);
    let report = coordinator.run().await;

    replenisher.stop();
    report
}
