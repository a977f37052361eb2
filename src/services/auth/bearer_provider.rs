use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use crate::services::auth::error::AuthError;
use crate::services::auth::provider::{Authenticated, AuthenticationProvider};
use crate::services::auth::token::{AuthenticationToken, TokenKind};
use crate::services::auth::token_service::TokenService;

/// Accepts access tokens issued by [`TokenService`]. The principal is the
/// `sub` claim; access tokens carry no authorities.
#[derive(Clone, Debug)]
pub struct BearerTokenAuthenticationProvider {
    tokens: Arc<TokenService>,
}

impl BearerTokenAuthenticationProvider {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens }
    }
}

#[async_trait]
impl AuthenticationProvider for BearerTokenAuthenticationProvider {
    fn supports(&self, token: &AuthenticationToken) -> bool {
        token.kind() == TokenKind::Bearer
    }

    async fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Authenticated>, AuthError> {
        let raw = token.credentials().ok_or(AuthError::InvalidBearerToken)?;

        let claims = self.tokens.decode_jwt(raw).map_err(|e| {
            debug!(error = %e, "bearer token rejected");
            AuthError::InvalidBearerToken
        })?;

        Ok(Some(Authenticated::new(AuthenticationToken::authenticated(
            TokenKind::Bearer,
            claims.sub,
            None,
            BTreeSet::new(),
        ))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repos::InMemoryRefreshTokenRepo;
    use crate::services::auth::jwt::JwtIssuer;

    fn tokens() -> Arc<TokenService> {
        let jwt = JwtIssuer::new(b"0123456789abcdef0123456789abcdef", 600, 0).unwrap();
        Arc::new(TokenService::new(
            jwt,
            Arc::new(InMemoryRefreshTokenRepo::new()),
            3600,
        ))
    }

    #[tokio::test]
    async fn valid_access_token_authenticates_its_subject() {
        let tokens = tokens();
        let provider = BearerTokenAuthenticationProvider::new(tokens.clone());
        let pair = tokens.generate_jwt("alice").await.unwrap();

        let outcome = provider
            .authenticate(&AuthenticationToken::bearer(pair.access_token))
            .await
            .unwrap()
            .unwrap();

        assert_eq!(outcome.authentication.principal(), "alice");
        assert_eq!(outcome.authentication.kind(), TokenKind::Bearer);
        assert!(outcome.authentication.is_authenticated());
        assert!(outcome.authentication.credentials().is_none());
    }

    #[tokio::test]
    async fn tampered_token_is_rejected() {
        let tokens = tokens();
        let provider = BearerTokenAuthenticationProvider::new(tokens.clone());
        let mut access = tokens.generate_jwt("alice").await.unwrap().access_token;
        access.push('x');

        assert!(matches!(
            provider
                .authenticate(&AuthenticationToken::bearer(access))
                .await,
            Err(AuthError::InvalidBearerToken)
        ));
    }

    #[test]
    fn only_bearer_tokens_are_supported() {
        let provider = BearerTokenAuthenticationProvider::new(tokens());

        assert!(provider.supports(&AuthenticationToken::bearer("t")));
        assert!(!provider.supports(&AuthenticationToken::username_password("a", "b")));
        assert!(!provider.supports(&AuthenticationToken::one_time_token("t")));
    }
}
