//! Configuration module for Undertow
//!
//! This module loads, parses, and validates the TOML configuration file and
//! reads the account credentials from the environment.
//!
//! # Example
//!
//! ```no_run
//! use undertow::config::{load_config, Credentials};
//! use std::path::Path;
//!
//! let config = load_config(Path::new("undertow.toml")).unwrap();
//! let credentials = Credentials::from_env().unwrap();
//! println!("Crawling /r/{} as {}", config.crawl.category, credentials.username);
//! ```

mod credentials;
mod parser;
mod types;
mod validation;

pub use credentials::{
    Credentials, CLIENT_ID_VAR, CLIENT_SECRET_VAR, PASSWORD_VAR, USERNAME_VAR,
};
pub use types::{ApiConfig, Config, CrawlConfig, RateLimitConfig};
pub use validation::{validate as validate_config, MAX_PAGES, MAX_REPLY_CAPACITY};

pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
