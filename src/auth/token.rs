use crate::auth::AuthError;
use crate::config::{ApiConfig, Credentials};
use chrono::{DateTime, Duration, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::fmt;

/// A bearer credential and the moment it was issued
///
/// Immutable after creation and shared by reference for the whole run.
#[derive(Clone)]
pub struct Credential {
    access_token: String,
    token_type: String,
    scope: String,
    expires_in: Option<u64>,
    created: DateTime<Utc>,
}

impl Credential {
    /// Builds a credential issued at `created`
    pub fn new(
        access_token: impl Into<String>,
        expires_in: Option<u64>,
        created: DateTime<Utc>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: "bearer".to_string(),
            scope: String::new(),
            expires_in,
            created,
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization(&self) -> String {
        format!("bearer {}", self.access_token)
    }

    pub fn scope(&self) -> &str {
        &self.scope
    }

    /// When the token stops being valid, if the provider said so
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.expires_in
            .and_then(|secs| i64::try_from(secs).ok())
            .map(|secs| self.created + Duration::seconds(secs))
    }

    /// Returns true once `now` has reached the expiry time
    ///
    /// A credential without a reported lifetime never expires.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().is_some_and(|expiry| now >= expiry)
    }
}

// The token itself stays out of logs
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("token_type", &self.token_type)
            .field("scope", &self.scope)
            .field("expires_in", &self.expires_in)
            .field("created", &self.created)
            .finish()
    }
}

/// Body of the token endpoint's response
///
/// The provider answers bad passwords with HTTP 200 and an `error` field.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    token_type: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    scope: Option<String>,
    #[serde(default)]
    error: Option<serde_json::Value>,
}

/// Obtains credentials from the provider's password-grant endpoint
pub struct TokenClient {
    client: Client,
    auth_url: String,
}

impl TokenClient {
    /// Creates a token client sharing the crawler's HTTP client
    pub fn new(client: Client, api: &ApiConfig) -> Self {
        Self {
            client,
            auth_url: api.auth_url.clone(),
        }
    }

    /// Exchanges account credentials for a bearer credential
    ///
    /// Sends a form-encoded `grant_type=password` request authenticated with
    /// the client id and secret over HTTP Basic auth. Called once; never
    /// retried.
    pub async fn obtain_credential(
        &self,
        credentials: &Credentials,
    ) -> Result<Credential, AuthError> {
        tracing::debug!("Requesting access token from {}", self.auth_url);

        let response = self
            .client
            .post(&self.auth_url)
            .basic_auth(&credentials.client_id, Some(&credentials.client_secret))
            .form(&[
                ("grant_type", "password"),
                ("username", credentials.username.as_str()),
                ("password", credentials.password.as_str()),
            ])
            .send()
            .await
            .map_err(|source| AuthError::Transport {
                url: self.auth_url.clone(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Status {
                url: self.auth_url.clone(),
                status: status.as_u16(),
            });
        }

        let created = Utc::now();
        let body = response
            .text()
            .await
            .map_err(|source| AuthError::Transport {
                url: self.auth_url.clone(),
                source,
            })?;

        parse_token_response(&body, created)
    }
}

/// Decodes a token endpoint body into a credential issued at `created`
fn parse_token_response(body: &str, created: DateTime<Utc>) -> Result<Credential, AuthError> {
    let parsed: TokenResponse =
        serde_json::from_str(body).map_err(|e| AuthError::Malformed(e.to_string()))?;

    if let Some(error) = parsed.error {
        let message = match error {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        };
        return Err(AuthError::Rejected(message));
    }

    let access_token = parsed
        .access_token
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AuthError::Malformed("missing access_token".to_string()))?;

    Ok(Credential {
        access_token,
        token_type: parsed.token_type.unwrap_or_else(|| "bearer".to_string()),
        scope: parsed.scope.unwrap_or_default(),
        expires_in: parsed.expires_in,
        created,
    })
}
