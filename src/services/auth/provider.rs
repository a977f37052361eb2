use async_trait::async_trait;

use crate::services::auth::error::{AuthError, ChangePasswordError};
use crate::services::auth::token::AuthenticationToken;

/// Successful authentication plus a non-fatal password-upgrade failure, if any.
#[derive(Debug)]
pub struct Authenticated {
    pub authentication: AuthenticationToken,
    pub upgrade_error: Option<ChangePasswordError>,
}

impl Authenticated {
    pub fn new(authentication: AuthenticationToken) -> Self {
        Self {
            authentication,
            upgrade_error: None,
        }
    }
}

/// Validates one kind of token against some credential source.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    fn supports(&self, token: &AuthenticationToken) -> bool;

    /// `Ok(None)` means "cannot decide"; the manager moves on to the next
    /// provider.
    async fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Authenticated>, AuthError>;
}

#[async_trait]
pub trait AuthenticationManager: Send + Sync {
    async fn authenticate(&self, token: AuthenticationToken) -> Result<Authenticated, AuthError>;
}
