//! Undertow: a rate-limited crawler for threaded discussion feeds
//!
//! This crate pages through a provider's post listing, fetches the reply tree
//! of every post under a token-bucket rate limit, flattens each tree into a
//! pre-ordered list and reports the replies that scored below a threshold.

pub mod auth;
pub mod config;
pub mod crawler;
pub mod listing;
pub mod report;
pub mod state;

use thiserror::Error;

/// Main error type for Undertow operations
#[derive(Debug, Error)]
pub enum UndertowError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Authentication failed: {0}")]
    Auth(#[from] auth::AuthError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid phase transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: state::CrawlPhase,
        to: state::CrawlPhase,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Environment variable {0} is missing or empty")]
    MissingEnv(String),
}

/// Result type alias for Undertow operations
pub type Result<T> = std::result::Result<T, UndertowError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, Credentials};
pub use crawler::{run_crawl, Coordinator, Fetcher, PermitStore, TokenBucket};
pub use listing::{flatten, FeedItem, FlatNode, ReplyChild};
pub use report::{CrawlReport, CrawlStats};
pub use state::CrawlPhase;
