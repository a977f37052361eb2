use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::repos::CredentialStore;
use crate::services::auth::error::AuthError;
use crate::services::auth::provider::{Authenticated, AuthenticationProvider};
use crate::services::auth::token::{AuthenticationToken, TokenKind};
use crate::services::ott::OneTimeTokenService;

/// Spends a one-time token and loads the user it was issued for.
pub struct OneTimeTokenAuthenticationProvider {
    tokens: Arc<dyn OneTimeTokenService>,
    users: Arc<dyn CredentialStore>,
}

impl OneTimeTokenAuthenticationProvider {
    pub fn new(tokens: Arc<dyn OneTimeTokenService>, users: Arc<dyn CredentialStore>) -> Self {
        Self { tokens, users }
    }
}

#[async_trait]
impl AuthenticationProvider for OneTimeTokenAuthenticationProvider {
    fn supports(&self, token: &AuthenticationToken) -> bool {
        token.kind() == TokenKind::OneTimeToken
    }

    async fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Authenticated>, AuthError> {
        let Some(consumed) = self.tokens.consume(token).await? else {
            debug!("one-time token unknown, used or expired");
            return Err(AuthError::InvalidOneTimeToken);
        };

        let user = self
            .users
            .find_user_by_username(consumed.username())
            .await?
            .ok_or(AuthError::InvalidOneTimeToken)?;

        Ok(Some(Authenticated::new(AuthenticationToken::authenticated(
            TokenKind::OneTimeToken,
            user.username(),
            None,
            user.authorities().clone(),
        ))))
    }
}
