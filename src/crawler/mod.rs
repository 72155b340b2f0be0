//! Crawler module for rate-limited feed and reply-tree fetching
//!
//! This module contains the core crawling logic, including:
//! - Token-bucket rate limiting with a background replenisher
//! - Authenticated page and reply-tree requests
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod limiter;

pub use coordinator::{run_crawl, Coordinator};
pub use fetcher::{build_http_client, FetchError, FetchTarget, Fetcher};
pub use limiter::{LimiterError, PermitStore, Replenisher, TokenBucket};
