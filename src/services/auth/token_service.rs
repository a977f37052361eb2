use std::fmt;
use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use tracing::{debug, warn};

use crate::repos::RefreshTokenStore;
use crate::services::auth::error::AuthError;
use crate::services::auth::jwt::{AccessTokenClaims, JwtError, JwtIssuer};
use crate::services::auth::random::{generate_opaque_token, hash_token};

/// Access token plus refresh token handed back to the client.
///
/// Handlers map this into the HTTP DTO (TokenResponse).
#[derive(Clone, Debug)]
pub struct IssuedTokenPair {
    pub access_token: String,
    pub refresh_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

/// Orchestrates JWT issuance and refresh-token issuance/rotation.
///
/// - `JwtIssuer` signs and verifies access tokens.
/// - Refresh tokens are opaque; only `hex(sha256(token))` reaches the store.
/// - Refresh rotates: the presented token is deleted, a new one is returned.
#[derive(Clone)]
pub struct TokenService {
    jwt: JwtIssuer,
    refresh_tokens: Arc<dyn RefreshTokenStore>,
    refresh_ttl_seconds: u64,
}

impl fmt::Debug for TokenService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenService")
            .field("jwt", &self.jwt)
            .field("refresh_ttl_seconds", &self.refresh_ttl_seconds)
            .finish()
    }
}

impl TokenService {
    pub fn new(
        jwt: JwtIssuer,
        refresh_tokens: Arc<dyn RefreshTokenStore>,
        refresh_ttl_seconds: u64,
    ) -> Self {
        Self {
            jwt,
            refresh_tokens,
            refresh_ttl_seconds,
        }
    }

    pub async fn generate_jwt(&self, subject: &str) -> Result<IssuedTokenPair, AuthError> {
        let access_token = self.jwt.issue_access_token(subject)?;
        let refresh_token = self.issue_refresh_token(subject).await?;

        Ok(IssuedTokenPair {
            access_token,
            refresh_token,
            token_type: "Bearer",
            expires_in: self.jwt.ttl_seconds(),
        })
    }

    pub fn validate_jwt(&self, token: &str) -> bool {
        self.jwt.validate(token)
    }

    pub fn decode_jwt(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        self.jwt.decode(token)
    }

    /// Trade a refresh token for a new pair.
    ///
    /// Of two concurrent refreshes with the same token at most one succeeds;
    /// the loser's freshly minted refresh token is discarded.
    pub async fn refresh_jwt(&self, refresh_token: &str) -> Result<IssuedTokenPair, AuthError> {
        let key = hash_token(refresh_token);
        let subject = self
            .refresh_tokens
            .find_subject(&key, Utc::now())
            .await?
            .ok_or(AuthError::InvalidRefreshToken)?;

        let pair = self.generate_jwt(&subject).await?;

        if !self.refresh_tokens.delete(&key).await? {
            debug!(sub = %subject, "refresh token already rotated");
            if let Err(e) = self
                .refresh_tokens
                .delete(&hash_token(&pair.refresh_token))
                .await
            {
                warn!(error = %e, "failed to discard refresh token after lost rotation");
            }
            return Err(AuthError::InvalidRefreshToken);
        }

        debug!(sub = %subject, "refresh token rotated");
        Ok(pair)
    }

    async fn issue_refresh_token(&self, subject: &str) -> Result<String, AuthError> {
        let expires_at = i64::try_from(self.refresh_ttl_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .and_then(|ttl| Utc::now().checked_add_signed(ttl))
            .ok_or_else(|| {
                AuthError::Configuration(format!(
                    "refresh token ttl of {}s is out of range",
                    self.refresh_ttl_seconds
                ))
            })?;
        let token = generate_opaque_token()?;

        self.refresh_tokens
            .save(&hash_token(&token), subject, expires_at)
            .await?;
        Ok(token)
    }
}
