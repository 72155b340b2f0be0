use crate::ConfigError;
use std::fmt;

/// Environment variable holding the OAuth client id
pub const CLIENT_ID_VAR: &str = "UNDERTOW_CLIENT_ID";
/// Environment variable holding the OAuth client secret
pub const CLIENT_SECRET_VAR: &str = "UNDERTOW_CLIENT_SECRET";
/// Environment variable holding the account username
pub const USERNAME_VAR: &str = "UNDERTOW_USERNAME";
/// Environment variable holding the account password
pub const PASSWORD_VAR: &str = "UNDERTOW_PASSWORD";

/// The four values exchanged for a bearer credential
#[derive(Clone)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,
    pub username: String,
    pub password: String,
}

impl Credentials {
    /// Reads credentials from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Reads credentials through an arbitrary lookup function
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .filter(|value| !value.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(name.to_string()))
        };

        Ok(Self {
            client_id: read(CLIENT_ID_VAR)?,
            client_secret: read(CLIENT_SECRET_VAR)?,
            username: read(USERNAME_VAR)?,
            password: read(PASSWORD_VAR)?,
        })
    }
}

// Secrets stay out of logs
impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
