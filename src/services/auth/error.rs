use thiserror::Error;

use crate::repos::RepoError;
use crate::services::auth::events::FailureEvent;
use crate::services::auth::token::TokenKind;

/// Why an authentication attempt failed.
///
/// Everything except `Service` and `Configuration` is an expected credential
/// failure. The transport boundary turns all of them into a plain 401; the
/// variants are for callers and logs.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("bad credentials")]
    BadCredentials,

    #[error("user not found")]
    UsernameNotFound,

    #[error("user account is locked")]
    Locked,

    #[error("user is disabled")]
    Disabled,

    #[error("user account has expired")]
    AccountExpired,

    #[error("user credentials have expired")]
    CredentialsExpired,

    #[error("the provided password is compromised, please change your password")]
    CompromisedPassword,

    #[error("invalid one time token")]
    InvalidOneTimeToken,

    #[error("refresh token is invalid")]
    InvalidRefreshToken,

    #[error("invalid bearer token")]
    InvalidBearerToken,

    #[error("full authentication is required to access this resource")]
    AuthenticationRequired,

    #[error("no authentication provider found for {0}")]
    ProviderNotFound(TokenKind),

    #[error("authentication service error: {0}")]
    Service(#[from] RepoError),

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Event kind published for this failure.
    pub fn event_kind(&self) -> FailureEvent {
        match self {
            AuthError::BadCredentials
            | AuthError::UsernameNotFound
            | AuthError::AuthenticationRequired => FailureEvent::BadCredentials,
            AuthError::Locked => FailureEvent::Locked,
            AuthError::Disabled => FailureEvent::Disabled,
            AuthError::AccountExpired => FailureEvent::Expired,
            AuthError::CredentialsExpired => FailureEvent::CredentialsExpired,
            AuthError::CompromisedPassword => FailureEvent::Compromised,
            AuthError::InvalidOneTimeToken
            | AuthError::InvalidRefreshToken
            | AuthError::InvalidBearerToken => FailureEvent::InvalidToken,
            AuthError::ProviderNotFound(_) => FailureEvent::ProviderNotFound,
            AuthError::Service(_) | AuthError::Configuration(_) | AuthError::Internal(_) => {
                FailureEvent::ServiceException
            }
        }
    }

    /// Expected outcome of bad input, as opposed to a broken backend.
    pub fn is_credential_error(&self) -> bool {
        !matches!(
            self,
            AuthError::Service(_) | AuthError::Configuration(_) | AuthError::Internal(_)
        )
    }
}

/// The new hash was computed but could not be stored. Reported next to a
/// successful authentication.
#[derive(Debug, Error)]
#[error("failed to persist upgraded password for {username}: {source}")]
pub struct ChangePasswordError {
    pub username: String,
    #[source]
    pub source: ChangePasswordCause,
}

#[derive(Debug, Error)]
pub enum ChangePasswordCause {
    #[error(transparent)]
    Store(#[from] RepoError),

    #[error("re-encoding failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_mapping_is_total() {
        let cases = [
            (AuthError::BadCredentials, FailureEvent::BadCredentials),
            (AuthError::UsernameNotFound, FailureEvent::BadCredentials),
            (AuthError::Locked, FailureEvent::Locked),
            (AuthError::Disabled, FailureEvent::Disabled),
            (AuthError::AccountExpired, FailureEvent::Expired),
            (AuthError::CredentialsExpired, FailureEvent::CredentialsExpired),
            (AuthError::InvalidRefreshToken, FailureEvent::InvalidToken),
            (
                AuthError::ProviderNotFound(TokenKind::Bearer),
                FailureEvent::ProviderNotFound,
            ),
            (
                AuthError::Service(RepoError::Unavailable("down".into())),
                FailureEvent::ServiceException,
            ),
        ];

        for (error, expected) in cases {
            assert_eq!(error.event_kind(), expected, "{error}");
        }
    }

    #[test]
    fn service_errors_are_not_credential_errors() {
        assert!(AuthError::Locked.is_credential_error());
        assert!(!AuthError::Service(RepoError::Unavailable("x".into())).is_credential_error());
    }
}
