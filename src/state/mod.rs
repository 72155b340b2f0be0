//! State module for tracking crawl progress
//!
//! - `CrawlPhase`: which stage of the run the driver is in

mod phase;

pub use phase::CrawlPhase;
