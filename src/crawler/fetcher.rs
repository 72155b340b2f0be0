//! HTTP fetcher implementation
//!
//! This module issues the two authenticated GET requests the crawler needs:
//! - one page of the feed listing, continued from a cursor
//! - the reply tree of a single feed item
//!
//! Every request takes one permit from the rate limiter before it is sent.
//! A permit is not refunded when the request then fails.

use crate::auth::Credential;
use crate::config::ApiConfig;
use crate::crawler::limiter::{LimiterError, PermitStore};
use crate::listing::{decode_feed_page, decode_reply_tree, FeedItem, FeedPage, ReplyChild};
use crate::ConfigError;
use chrono::Utc;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// What a failed request was trying to fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchTarget {
    Page {
        category: String,
        listing: String,
        cursor: Option<String>,
    },
    Tree {
        item_id: String,
    },
}

impl fmt::Display for FetchTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Page {
                category,
                listing,
                cursor: Some(cursor),
            } => write!(f, "feed page /r/{}/{} after {}", category, listing, cursor),
            Self::Page {
                category, listing, ..
            } => write!(f, "first feed page /r/{}/{}", category, listing),
            Self::Tree { item_id } => write!(f, "reply tree of {}", item_id),
        }
    }
}

/// A single request's failure. Never fatal to the run.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{target}: credential expired, request not sent")]
    CredentialExpired { target: FetchTarget },

    #[error("{target}: no permit granted: {source}")]
    Limiter {
        target: FetchTarget,
        source: LimiterError,
    },

    #[error("{target}: cannot build request URL from {base}")]
    InvalidUrl { target: FetchTarget, base: String },

    #[error("{target}: request failed: {source}")]
    Transport {
        target: FetchTarget,
        source: reqwest::Error,
    },

    #[error("{target}: HTTP {status}")]
    Status { target: FetchTarget, status: u16 },

    #[error("{target}: malformed response: {source}")]
    Envelope {
        target: FetchTarget,
        source: serde_json::Error,
    },
}

impl FetchError {
    /// The request this error belongs to
    pub fn target(&self) -> &FetchTarget {
        match self {
            Self::CredentialExpired { target }
            | Self::Limiter { target, .. }
            | Self::InvalidUrl { target, .. }
            | Self::Transport { target, .. }
            | Self::Status { target, .. }
            | Self::Envelope { target, .. } => target,
        }
    }

    /// True when no further request can succeed with this credential
    pub fn is_credential_expired(&self) -> bool {
        matches!(self, Self::CredentialExpired { .. })
    }
}

/// Builds an HTTP client with the configured user agent and timeouts
pub fn build_http_client(config: &ApiConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(config.user_agent.as_str())
        .timeout(Duration::from_secs(config.timeout_secs))
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Issues rate-limited, authenticated requests against the provider API
pub struct Fetcher<P> {
    client: Client,
    base_url: Url,
    permits: Arc<P>,
}

impl<P: PermitStore> Fetcher<P> {
    /// Creates a fetcher drawing permits from `permits`
    pub fn new(client: Client, api: &ApiConfig, permits: Arc<P>) -> Result<Self, ConfigError> {
        let base_url = Url::parse(&api.base_url)
            .map_err(|e| ConfigError::InvalidUrl(format!("Invalid base_url: {}", e)))?;

        if base_url.cannot_be_a_base() {
            return Err(ConfigError::InvalidUrl(format!(
                "base_url cannot take a path: {}",
                api.base_url
            )));
        }

        Ok(Self {
            client,
            base_url,
            permits,
        })
    }

    /// Fetches one page of a feed listing
    ///
    /// # Arguments
    ///
    /// * `credential` - Bearer credential for the request
    /// * `category` - Category (subreddit) to list
    /// * `listing` - Listing name within the category ("hot", "new", ...)
    /// * `limit` - Number of items requested
    /// * `cursor` - Anchor of the last item already seen, `None` for the first page
    /// * `count` - Number of items already seen, sent along with the cursor
    ///
    /// # Returns
    ///
    /// The decoded page, whose `next_cursor` is the anchor of its last item
    pub async fn fetch_feed_page(
        &self,
        credential: &Credential,
        category: &str,
        listing: &str,
        limit: u32,
        cursor: Option<&str>,
        count: usize,
    ) -> Result<FeedPage, FetchError> {
        let target = FetchTarget::Page {
            category: category.to_string(),
            listing: listing.to_string(),
            cursor: cursor.map(str::to_string),
        };

        let mut url = self.endpoint(&["r", category, listing], &target)?;
        {
            let mut query = url.query_pairs_mut();
            query.append_pair("limit", &limit.to_string());
            if let Some(after) = cursor {
                query.append_pair("count", &count.to_string());
                query.append_pair("after", after);
            }
        }

        let body = self.get(credential, url, &target).await?;
        decode_feed_page(&body).map_err(|source| FetchError::Envelope { target, source })
    }

    /// Fetches the reply tree of one feed item
    ///
    /// Returns the root-level children; placeholder stubs and odd shapes are
    /// kept as tagged children for the flattener to drop.
    pub async fn fetch_reply_tree(
        &self,
        credential: &Credential,
        item: &FeedItem,
    ) -> Result<Vec<ReplyChild>, FetchError> {
        let target = FetchTarget::Tree {
            item_id: item.id.clone(),
        };

        let mut url = self.endpoint(
            &["r", item.subreddit.as_str(), "comments", item.id.as_str()],
            &target,
        )?;
        url.query_pairs_mut()
            .append_pair("context", "0")
            .append_pair("sort", "old");

        let body = self.get(credential, url, &target).await?;
        decode_reply_tree(&body).map_err(|source| FetchError::Envelope { target, source })
    }

    /// Appends percent-encoded path segments to the base URL
    fn endpoint(&self, segments: &[&str], target: &FetchTarget) -> Result<Url, FetchError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| FetchError::InvalidUrl {
                target: target.clone(),
                base: self.base_url.to_string(),
            })?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Sends one GET and returns the body of a 2xx response
    ///
    /// An expired credential fails closed: no permit is taken and nothing is
    /// sent.
    async fn get(
        &self,
        credential: &Credential,
        url: Url,
        target: &FetchTarget,
    ) -> Result<String, FetchError> {
        if credential.is_expired_at(Utc::now()) {
            return Err(FetchError::CredentialExpired {
                target: target.clone(),
            });
        }

        self.permits
            .acquire(1)
            .await
            .map_err(|source| FetchError::Limiter {
                target: target.clone(),
                source,
            })?;

        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .header(AUTHORIZATION, credential.authorization())
            .send()
            .await
            .map_err(|source| FetchError::Transport {
                target: target.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                target: target.clone(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| FetchError::Transport {
            target: target.clone(),
            source,
        })
    }
}
