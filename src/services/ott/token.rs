use std::fmt;

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum OneTimeTokenError {
    #[error("username cannot be empty")]
    EmptyUsername,

    #[error("token value cannot be empty")]
    EmptyTokenValue,
}

/// Request to issue a one-time token for `username`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerateOneTimeTokenRequest {
    username: String,
}

impl GenerateOneTimeTokenRequest {
    pub fn new(username: impl Into<String>) -> Result<Self, OneTimeTokenError> {
        let username = username.into();
        if username.is_empty() {
            return Err(OneTimeTokenError::EmptyUsername);
        }
        Ok(Self { username })
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

/// Single-use, time-limited login credential.
#[derive(Clone, PartialEq, Eq)]
pub struct OneTimeToken {
    token_value: String,
    username: String,
    expires_at: DateTime<Utc>,
}

impl OneTimeToken {
    pub fn new(
        token_value: impl Into<String>,
        username: impl Into<String>,
        expires_at: DateTime<Utc>,
    ) -> Result<Self, OneTimeTokenError> {
        let token_value = token_value.into();
        let username = username.into();
        if token_value.is_empty() {
            return Err(OneTimeTokenError::EmptyTokenValue);
        }
        if username.is_empty() {
            return Err(OneTimeTokenError::EmptyUsername);
        }
        Ok(Self {
            token_value,
            username,
            expires_at,
        })
    }

    pub fn token_value(&self) -> &str {
        &self.token_value
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }
}

impl fmt::Debug for OneTimeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OneTimeToken")
            .field("token_value", &"[protected]")
            .field("username", &self.username)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}
