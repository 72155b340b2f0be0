//! Credential acquisition
//!
//! Exchanges the account credentials for a bearer token using the OAuth
//! password grant. The core calls this once per run; there is no refresh.

mod token;

pub use token::{Credential, TokenClient};

use thiserror::Error;

/// Errors raised while obtaining a credential. All of them end the run.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("token request to {url} failed: {source}")]
    Transport { url: String, source: reqwest::Error },

    #[error("token endpoint {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("token endpoint rejected the credentials: {0}")]
    Rejected(String),

    #[error("malformed token response: {0}")]
    Malformed(String),
}
