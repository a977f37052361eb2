use crate::services::auth::error::AuthError;
use crate::services::auth::user_details::UserDetails;

/// Account-status check run around the password comparison.
pub trait UserDetailsChecker: Send + Sync {
    fn check(&self, user: &UserDetails) -> Result<(), AuthError>;
}

impl<F> UserDetailsChecker for F
where
    F: Fn(&UserDetails) -> Result<(), AuthError> + Send + Sync,
{
    fn check(&self, user: &UserDetails) -> Result<(), AuthError> {
        self(user)
    }
}

/// Locked, then disabled, then expired.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPreAuthenticationChecks;

impl UserDetailsChecker for DefaultPreAuthenticationChecks {
    fn check(&self, user: &UserDetails) -> Result<(), AuthError> {
        if !user.is_account_non_locked() {
            tracing::debug!(username = %user.username(), "account is locked");
            return Err(AuthError::Locked);
        }
        if !user.is_enabled() {
            tracing::debug!(username = %user.username(), "account is disabled");
            return Err(AuthError::Disabled);
        }
        if !user.is_account_non_expired() {
            tracing::debug!(username = %user.username(), "account has expired");
            return Err(AuthError::AccountExpired);
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultPostAuthenticationChecks;

impl UserDetailsChecker for DefaultPostAuthenticationChecks {
    fn check(&self, user: &UserDetails) -> Result<(), AuthError> {
        if !user.is_credentials_non_expired() {
            tracing::debug!(username = %user.username(), "credentials have expired");
            return Err(AuthError::CredentialsExpired);
        }
        Ok(())
    }
}

/// Result of a compromised-password lookup.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompromisedPasswordDecision {
    compromised: bool,
}

impl CompromisedPasswordDecision {
    pub fn new(compromised: bool) -> Self {
        Self { compromised }
    }

    pub fn is_compromised(&self) -> bool {
        self.compromised
    }
}

/// Optional lookup run after a successful password match.
pub trait CompromisedPasswordChecker: Send + Sync {
    fn check(&self, password: &str) -> CompromisedPasswordDecision;
}
