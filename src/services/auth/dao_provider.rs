use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::repos::{CredentialStore, PasswordUpdater};
use crate::services::auth::checks::{
    CompromisedPasswordChecker, DefaultPostAuthenticationChecks, DefaultPreAuthenticationChecks,
    UserDetailsChecker,
};
use crate::services::auth::error::{AuthError, ChangePasswordCause, ChangePasswordError};
use crate::services::auth::provider::{Authenticated, AuthenticationProvider};
use crate::services::auth::token::{AuthenticationToken, TokenKind};
use crate::services::auth::user_details::UserDetails;
use crate::services::password::{EncoderError, PasswordEncoder};

/// Plaintext hashed once and compared against whenever a lookup fails, so a
/// missing user costs as much as a wrong password.
pub const USER_NOT_FOUND_PASSWORD: &str = "userNotFoundPassword";

const NONE_PROVIDED: &str = "NONE_PROVIDED";

/// Runs a hashing call on the blocking pool.
async fn blocking<T, F>(f: F) -> Result<T, AuthError>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| AuthError::Internal(format!("hashing task failed: {e}")))
}

async fn matches_blocking(
    encoder: &Arc<dyn PasswordEncoder>,
    presented: &SecretString,
    encoded: &str,
) -> Result<Result<bool, EncoderError>, AuthError> {
    let encoder = Arc::clone(encoder);
    let presented = presented.clone();
    let encoded = encoded.to_string();
    blocking(move || encoder.matches(presented.expose_secret(), &encoded)).await
}

/// Compares the presented password against the stored hash.
#[async_trait]
pub trait CredentialsChecker: Send + Sync {
    async fn check(&self, user: &UserDetails, presented: &SecretString) -> Result<(), AuthError>;
}

pub struct PasswordCredentialsChecker {
    encoder: Arc<dyn PasswordEncoder>,
}

impl PasswordCredentialsChecker {
    pub fn new(encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self { encoder }
    }
}

#[async_trait]
impl CredentialsChecker for PasswordCredentialsChecker {
    async fn check(&self, user: &UserDetails, presented: &SecretString) -> Result<(), AuthError> {
        if presented.expose_secret().is_empty() {
            // Rejected regardless, but pay for the comparison like any other attempt.
            let _ = matches_blocking(&self.encoder, presented, user.password()).await;
            debug!(username = %user.username(), "no credentials provided");
            return Err(AuthError::BadCredentials);
        }

        match matches_blocking(&self.encoder, presented, user.password()).await? {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(username = %user.username(), "password does not match stored value");
                Err(AuthError::BadCredentials)
            }
            Err(e) => {
                warn!(username = %user.username(), error = %e, "stored password could not be verified");
                Err(AuthError::BadCredentials)
            }
        }
    }
}

/// Username/password provider backed by a [`CredentialStore`].
///
/// Per attempt: retrieve user, pre checks, credential check, post checks,
/// optional compromised-password check, optional hash upgrade.
pub struct DaoAuthenticationProvider {
    users: Arc<dyn CredentialStore>,
    encoder: Arc<dyn PasswordEncoder>,
    password_updater: Option<Arc<dyn PasswordUpdater>>,
    compromised_checker: Option<Arc<dyn CompromisedPasswordChecker>>,
    pre_checks: Arc<dyn UserDetailsChecker>,
    credentials_checker: Arc<dyn CredentialsChecker>,
    post_checks: Arc<dyn UserDetailsChecker>,
    hide_user_not_found: bool,
    user_not_found_encoded: OnceCell<Option<String>>,
}

impl fmt::Debug for DaoAuthenticationProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DaoAuthenticationProvider")
            .field("hide_user_not_found", &self.hide_user_not_found)
            .field("upgrades_passwords", &self.password_updater.is_some())
            .field("checks_compromised", &self.compromised_checker.is_some())
            .finish()
    }
}

impl DaoAuthenticationProvider {
    pub fn new(users: Arc<dyn CredentialStore>, encoder: Arc<dyn PasswordEncoder>) -> Self {
        Self {
            users,
            credentials_checker: Arc::new(PasswordCredentialsChecker::new(Arc::clone(&encoder))),
            encoder,
            password_updater: None,
            compromised_checker: None,
            pre_checks: Arc::new(DefaultPreAuthenticationChecks),
            post_checks: Arc::new(DefaultPostAuthenticationChecks),
            hide_user_not_found: true,
            user_not_found_encoded: OnceCell::new(),
        }
    }

    /// Enables re-encoding of outdated hashes after a successful login.
    pub fn with_password_updater(mut self, updater: Arc<dyn PasswordUpdater>) -> Self {
        self.password_updater = Some(updater);
        self
    }

    pub fn with_compromised_password_checker(
        mut self,
        checker: Arc<dyn CompromisedPasswordChecker>,
    ) -> Self {
        self.compromised_checker = Some(checker);
        self
    }

    pub fn with_pre_authentication_checks(mut self, checks: Arc<dyn UserDetailsChecker>) -> Self {
        self.pre_checks = checks;
        self
    }

    pub fn with_credentials_checker(mut self, checker: Arc<dyn CredentialsChecker>) -> Self {
        self.credentials_checker = checker;
        self
    }

    pub fn with_post_authentication_checks(mut self, checks: Arc<dyn UserDetailsChecker>) -> Self {
        self.post_checks = checks;
        self
    }

    /// When false, an unknown user is reported as `UsernameNotFound`
    /// instead of `BadCredentials`.
    pub fn hide_user_not_found(mut self, hide: bool) -> Self {
        self.hide_user_not_found = hide;
        self
    }

    async fn prepare_timing_attack_protection(&self) -> Result<Option<&str>, AuthError> {
        let encoded = self
            .user_not_found_encoded
            .get_or_try_init(|| async {
                let encoder = Arc::clone(&self.encoder);
                let encoded = blocking(move || encoder.encode(USER_NOT_FOUND_PASSWORD)).await?;
                Ok::<_, AuthError>(
                    encoded
                        .map_err(|e| warn!(error = %e, "could not prepare timing attack protection"))
                        .ok(),
                )
            })
            .await?;
        Ok(encoded.as_deref())
    }

    async fn mitigate_against_timing_attack(&self, dummy: Option<&str>, presented: &SecretString) {
        if let Some(encoded) = dummy {
            // Outcome is irrelevant; only the time spent matters.
            let _ = matches_blocking(&self.encoder, presented, encoded).await;
        }
    }

    async fn retrieve_user(
        &self,
        username: &str,
        presented: &SecretString,
    ) -> Result<UserDetails, AuthError> {
        let dummy = self.prepare_timing_attack_protection().await?;

        match self.users.find_user_by_username(username).await {
            Ok(Some(user)) => Ok(user),
            Ok(None) => {
                self.mitigate_against_timing_attack(dummy, presented).await;
                debug!(username = %username, "user not found");
                Err(AuthError::UsernameNotFound)
            }
            Err(e) => {
                self.mitigate_against_timing_attack(dummy, presented).await;
                warn!(username = %username, error = %e, "credential store lookup failed");
                Err(AuthError::Service(e))
            }
        }
    }

    /// `Ok(Some(updated))` when the hash was re-encoded and stored.
    async fn upgrade_password(
        &self,
        user: &UserDetails,
        presented: &SecretString,
    ) -> Result<Option<UserDetails>, ChangePasswordError> {
        let Some(updater) = &self.password_updater else {
            return Ok(None);
        };

        let needs_upgrade = self
            .encoder
            .upgrade_encoding(user.password())
            .unwrap_or_else(|e| {
                warn!(username = %user.username(), error = %e, "could not inspect stored hash");
                false
            });
        if !needs_upgrade {
            return Ok(None);
        }

        let change_error = |source: ChangePasswordCause| ChangePasswordError {
            username: user.username().to_string(),
            source,
        };

        let encoder = Arc::clone(&self.encoder);
        let raw = presented.clone();
        let new_hash = blocking(move || encoder.encode(raw.expose_secret()))
            .await
            .map_err(|e| change_error(ChangePasswordCause::Encode(e.to_string())))?
            .map_err(|e| change_error(ChangePasswordCause::Encode(e.to_string())))?;

        let updated = updater
            .update_password(user, &new_hash)
            .await
            .map_err(|e| change_error(ChangePasswordCause::Store(e)))?;

        debug!(username = %user.username(), "password hash upgraded");
        Ok(Some(updated))
    }
}

#[async_trait]
impl AuthenticationProvider for DaoAuthenticationProvider {
    fn supports(&self, token: &AuthenticationToken) -> bool {
        token.kind() == TokenKind::UsernamePassword
    }

    async fn authenticate(
        &self,
        token: &AuthenticationToken,
    ) -> Result<Option<Authenticated>, AuthError> {
        let username = match token.principal() {
            "" => NONE_PROVIDED,
            name => name,
        };
        let presented = SecretString::from(token.credentials().unwrap_or_default());

        let user = match self.retrieve_user(username, &presented).await {
            Ok(user) => user,
            Err(AuthError::UsernameNotFound) if self.hide_user_not_found => {
                return Err(AuthError::BadCredentials);
            }
            Err(e) => return Err(e),
        };

        self.pre_checks.check(&user)?;
        self.credentials_checker.check(&user, &presented).await?;
        self.post_checks.check(&user)?;

        if let Some(checker) = &self.compromised_checker {
            if checker.check(presented.expose_secret()).is_compromised() {
                return Err(AuthError::CompromisedPassword);
            }
        }

        let (user, upgrade_error) = match self.upgrade_password(&user, &presented).await {
            Ok(Some(updated)) => (updated, None),
            Ok(None) => (user, None),
            Err(e) => {
                warn!(error = %e, "password upgrade not persisted");
                (user, Some(e))
            }
        };

        let authentication = AuthenticationToken::authenticated(
            TokenKind::UsernamePassword,
            user.username(),
            Some(presented),
            user.authorities().clone(),
        );

        Ok(Some(Authenticated {
            authentication,
            upgrade_error,
        }))
    }
}
