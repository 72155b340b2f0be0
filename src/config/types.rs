use serde::Deserialize;

/// Main configuration structure for Undertow
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawl: CrawlConfig,
    #[serde(rename = "rate-limit", default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub api: ApiConfig,
}

/// What to crawl and how to select replies
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Category (subreddit) whose listing is paged
    #[serde(default = "default_category")]
    pub category: String,

    /// Listing within the category ("hot", "new", "top", ...)
    #[serde(default = "default_listing")]
    pub listing: String,

    /// Maximum number of feed pages to request
    #[serde(default = "default_pages")]
    pub pages: u32,

    /// Items requested per feed page
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,

    /// Replies scoring strictly below this value are reported
    pub threshold: i64,

    /// Expected number of replies per tree, used to size buffers
    pub reply_capacity: usize,

    /// Number of reply trees fetched at once (1 keeps requests strictly FIFO)
    #[serde(default = "default_tree_concurrency")]
    pub tree_concurrency: usize,
}

/// Token bucket parameters
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RateLimitConfig {
    /// Bucket capacity, also the size of the initial burst
    #[serde(default = "default_capacity")]
    pub capacity: u32,

    /// Milliseconds between single-permit refills
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
            interval_ms: default_interval_ms(),
        }
    }
}

/// Provider endpoints and request identity
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ApiConfig {
    /// Password-grant token endpoint
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Base URL for authenticated listing and reply requests
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Base URL used when building deep links in the report
    #[serde(default = "default_link_base_url")]
    pub link_base_url: String,

    /// User-Agent sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Number of parent replies shown around a deep-linked reply
    #[serde(default = "default_link_context")]
    pub link_context: u32,

    /// Per-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            base_url: default_base_url(),
            link_base_url: default_link_base_url(),
            user_agent: default_user_agent(),
            link_context: default_link_context(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_category() -> String {
    "all".to_string()
}

fn default_listing() -> String {
    "hot".to_string()
}

fn default_pages() -> u32 {
    20
}

fn default_page_limit() -> u32 {
    100
}

fn default_tree_concurrency() -> usize {
    1
}

fn default_capacity() -> u32 {
    60
}

fn default_interval_ms() -> u64 {
    1000
}

fn default_auth_url() -> String {
    "https://www.reddit.com/api/v1/access_token".to_string()
}

fn default_base_url() -> String {
    "https://oauth.reddit.com".to_string()
}

fn default_link_base_url() -> String {
    "https://np.reddit.com".to_string()
}

fn default_user_agent() -> String {
    format!("Undertow/{}", env!("CARGO_PKG_VERSION"))
}

fn default_link_context() -> u32 {
    10
}

fn default_timeout_secs() -> u64 {
    30
}
