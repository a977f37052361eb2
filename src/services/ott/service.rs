use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeDelta, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::services::auth::error::AuthError;
use crate::services::auth::random::generate_opaque_token;
use crate::services::auth::token::{AuthenticationToken, TokenKind};
use crate::services::ott::token::{GenerateOneTimeTokenRequest, OneTimeToken};

pub const DEFAULT_TTL_SECONDS: i64 = 5 * 60;
pub const DEFAULT_CLEANUP_THRESHOLD: usize = 100;

/// Issues and spends one-time tokens.
///
/// `consume` must look up and remove the token in one atomic step: of any
/// number of concurrent calls with the same value, at most one gets it.
#[async_trait]
pub trait OneTimeTokenService: Send + Sync {
    async fn generate(
        &self,
        request: &GenerateOneTimeTokenRequest,
    ) -> Result<OneTimeToken, AuthError>;

    // `Ok(None)` for unknown, already used or expired tokens.
    async fn consume(
        &self,
        authentication: &AuthenticationToken,
    ) -> Result<Option<OneTimeToken>, AuthError>;
}

#[derive(Clone)]
pub struct InMemoryOneTimeTokenService {
    tokens: Arc<Mutex<HashMap<String, OneTimeToken>>>,
    ttl: TimeDelta,
    cleanup_threshold: usize,
}

impl fmt::Debug for InMemoryOneTimeTokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryOneTimeTokenService")
            .field("stored", &self.tokens.lock().len())
            .field("ttl", &self.ttl)
            .field("cleanup_threshold", &self.cleanup_threshold)
            .finish()
    }
}

impl Default for InMemoryOneTimeTokenService {
    fn default() -> Self {
        Self {
            tokens: Arc::new(Mutex::new(HashMap::new())),
            ttl: TimeDelta::seconds(DEFAULT_TTL_SECONDS),
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }
}

impl InMemoryOneTimeTokenService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: TimeDelta) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.tokens.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.lock().is_empty()
    }
}

#[async_trait]
impl OneTimeTokenService for InMemoryOneTimeTokenService {
    async fn generate(
        &self,
        request: &GenerateOneTimeTokenRequest,
    ) -> Result<OneTimeToken, AuthError> {
        let now = Utc::now();
        let expires_at = now.checked_add_signed(self.ttl).ok_or_else(|| {
            AuthError::Configuration(format!("one-time token ttl {} is out of range", self.ttl))
        })?;
        let value = generate_opaque_token()?;
        let token = OneTimeToken::new(value, request.username(), expires_at)
            .map_err(|e| AuthError::Internal(e.to_string()))?;

        let mut tokens = self.tokens.lock();
        tokens.insert(token.token_value().to_string(), token.clone());

        if tokens.len() >= self.cleanup_threshold {
            let before = tokens.len();
            tokens.retain(|_, t| !t.is_expired_at(now));
            debug!(evicted = before - tokens.len(), "expired one-time tokens evicted");
        }

        debug!(username = %request.username(), expires_at = %token.expires_at(), "one-time token issued");
        Ok(token)
    }

    async fn consume(
        &self,
        authentication: &AuthenticationToken,
    ) -> Result<Option<OneTimeToken>, AuthError> {
        if authentication.kind() != TokenKind::OneTimeToken {
            return Ok(None);
        }
        let Some(value) = authentication.credentials() else {
            return Ok(None);
        };

        let now = Utc::now();
        let mut tokens = self.tokens.lock();
        let live = tokens
            .get(value)
            .is_some_and(|token| !token.is_expired_at(now));

        Ok(if live { tokens.remove(value) } else { None })
    }
}
