use crate::config::types::{ApiConfig, Config, CrawlConfig, RateLimitConfig};
use crate::ConfigError;
use url::Url;

/// Upper bound on feed pages per run
pub const MAX_PAGES: u32 = 10_000;

/// Upper bound on the per-tree reply capacity hint
pub const MAX_REPLY_CAPACITY: usize = 100_000;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_crawl_config(&config.crawl)?;
    validate_rate_limit_config(&config.rate_limit)?;
    validate_api_config(&config.api)?;
    Ok(())
}

/// Validates crawl configuration
fn validate_crawl_config(config: &CrawlConfig) -> Result<(), ConfigError> {
    validate_path_segment("category", &config.category)?;
    validate_path_segment("listing", &config.listing)?;

    if config.page_limit < 1 || config.page_limit > 100 {
        return Err(ConfigError::Validation(format!(
            "page_limit must be between 1 and 100, got {}",
            config.page_limit
        )));
    }

    if config.pages > MAX_PAGES {
        return Err(ConfigError::Validation(format!(
            "pages must be at most {}, got {}",
            MAX_PAGES, config.pages
        )));
    }

    if config.reply_capacity > MAX_REPLY_CAPACITY {
        return Err(ConfigError::Validation(format!(
            "reply_capacity must be at most {}, got {}",
            MAX_REPLY_CAPACITY, config.reply_capacity
        )));
    }

    if config.tree_concurrency < 1 {
        return Err(ConfigError::Validation(format!(
            "tree_concurrency must be >= 1, got {}",
            config.tree_concurrency
        )));
    }

    Ok(())
}

/// Validates token bucket parameters
fn validate_rate_limit_config(config: &RateLimitConfig) -> Result<(), ConfigError> {
    if config.capacity < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit capacity must be >= 1, got {}",
            config.capacity
        )));
    }

    if config.interval_ms < 1 {
        return Err(ConfigError::Validation(format!(
            "rate-limit interval_ms must be >= 1, got {}",
            config.interval_ms
        )));
    }

    Ok(())
}

/// Validates endpoint URLs and request identity
fn validate_api_config(config: &ApiConfig) -> Result<(), ConfigError> {
    for (name, value) in [
        ("auth_url", &config.auth_url),
        ("base_url", &config.base_url),
        ("link_base_url", &config.link_base_url),
    ] {
        let url = Url::parse(value)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {}: {}", name, e)))?;

        if url.scheme() != "https" && url.scheme() != "http" {
            return Err(ConfigError::InvalidUrl(format!(
                "{} must use http or https, got '{}'",
                name,
                url.scheme()
            )));
        }
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    Ok(())
}

/// Category and listing names are spliced into request paths
fn validate_path_segment(name: &str, value: &str) -> Result<(), ConfigError> {
    if value.is_empty() {
        return Err(ConfigError::Validation(format!("{} cannot be empty", name)));
    }

    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '+' || c == '-')
    {
        return Err(ConfigError::Validation(format!(
            "{} must contain only letters, digits, '_', '+' or '-', got '{}'",
            name, value
        )));
    }

    Ok(())
}
