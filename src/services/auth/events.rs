use std::fmt;

use tracing::{debug, info};

use crate::services::auth::error::AuthError;
use crate::services::auth::token::AuthenticationToken;

/// Closed set of failure event kinds.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum FailureEvent {
    BadCredentials,
    Expired,
    ProviderNotFound,
    Disabled,
    Locked,
    ServiceException,
    CredentialsExpired,
    InvalidToken,
    Compromised,
}

impl fmt::Display for FailureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FailureEvent::BadCredentials => "failure_bad_credentials",
            FailureEvent::Expired => "failure_expired",
            FailureEvent::ProviderNotFound => "failure_provider_not_found",
            FailureEvent::Disabled => "failure_disabled",
            FailureEvent::Locked => "failure_locked",
            FailureEvent::ServiceException => "failure_service_exception",
            FailureEvent::CredentialsExpired => "failure_credentials_expired",
            FailureEvent::InvalidToken => "failure_invalid_token",
            FailureEvent::Compromised => "failure_compromised",
        };
        f.write_str(name)
    }
}

pub trait AuthenticationEventPublisher: Send + Sync {
    fn publish_authentication_success(&self, authentication: &AuthenticationToken);

    fn publish_authentication_failure(&self, error: &AuthError, authentication: &AuthenticationToken);
}

/// Publishes events as tracing records.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingEventPublisher;

impl AuthenticationEventPublisher for TracingEventPublisher {
    fn publish_authentication_success(&self, authentication: &AuthenticationToken) {
        debug!(
            kind = "authentication_success",
            principal = %authentication.principal(),
            token_kind = %authentication.kind(),
            "authentication succeeded"
        );
    }

    fn publish_authentication_failure(&self, error: &AuthError, authentication: &AuthenticationToken) {
        info!(
            kind = %error.event_kind(),
            principal = %authentication.principal(),
            token_kind = %authentication.kind(),
            error = %error,
            "authentication failed"
        );
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NullEventPublisher;

impl AuthenticationEventPublisher for NullEventPublisher {
    fn publish_authentication_success(&self, _authentication: &AuthenticationToken) {}

    fn publish_authentication_failure(
        &self,
        _error: &AuthError,
        _authentication: &AuthenticationToken,
    ) {
    }
}
