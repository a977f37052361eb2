use parking_lot::RwLock;

use crate::services::auth::AuthenticationToken;

/// Slot for the current Authentication of one scope.
///
/// Shared as `Arc<SecurityContext>`; every filter holding the same context
/// sees the others' updates.
#[derive(Debug, Default)]
pub struct SecurityContext {
    authentication: RwLock<Option<AuthenticationToken>>,
}

impl SecurityContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_authentication(authentication: AuthenticationToken) -> Self {
        Self {
            authentication: RwLock::new(Some(authentication)),
        }
    }

    pub fn authentication(&self) -> Option<AuthenticationToken> {
        self.authentication.read().clone()
    }

    pub fn set_authentication(&self, authentication: Option<AuthenticationToken>) {
        *self.authentication.write() = authentication;
    }

    pub fn is_authenticated(&self) -> bool {
        self.authentication
            .read()
            .as_ref()
            .is_some_and(|a| a.is_authenticated())
    }
}
