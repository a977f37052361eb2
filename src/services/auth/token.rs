use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use secrecy::{ExposeSecret, SecretString};

use crate::services::auth::error::AuthError;

/// Free-form data that travels with a token (request id, remote address...).
pub type Details = BTreeMap<String, String>;

/// Which credential scheme produced a token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TokenKind {
    UsernamePassword,
    OneTimeToken,
    Bearer,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::UsernamePassword => "username_password",
            TokenKind::OneTimeToken => "one_time_token",
            TokenKind::Bearer => "bearer",
        };
        f.write_str(name)
    }
}

/// Principal, credentials and authorities for one authentication attempt,
/// or the trusted result of one.
///
/// Public constructors only produce unauthenticated tokens. The trusted form
/// is built by providers through [`AuthenticationToken::authenticated`].
#[derive(Clone)]
pub struct AuthenticationToken {
    kind: TokenKind,
    principal: String,
    credentials: Option<SecretString>,
    authorities: BTreeSet<String>,
    authenticated: bool,
    details: Details,
}

impl AuthenticationToken {
    fn unauthenticated(kind: TokenKind, principal: String, credentials: SecretString) -> Self {
        Self {
            kind,
            principal,
            credentials: Some(credentials),
            authorities: BTreeSet::new(),
            authenticated: false,
            details: Details::new(),
        }
    }

    pub fn username_password(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self::unauthenticated(
            TokenKind::UsernamePassword,
            username.into(),
            SecretString::from(password.into()),
        )
    }

    /// The token value is the credential; the principal is unknown until the
    /// token is consumed.
    pub fn one_time_token(token_value: impl Into<String>) -> Self {
        Self::unauthenticated(
            TokenKind::OneTimeToken,
            String::new(),
            SecretString::from(token_value.into()),
        )
    }

    pub fn bearer(token: impl Into<String>) -> Self {
        Self::unauthenticated(
            TokenKind::Bearer,
            String::new(),
            SecretString::from(token.into()),
        )
    }

    pub(crate) fn authenticated(
        kind: TokenKind,
        principal: impl Into<String>,
        credentials: Option<SecretString>,
        authorities: BTreeSet<String>,
    ) -> Self {
        Self {
            kind,
            principal: principal.into(),
            credentials,
            authorities,
            authenticated: true,
            details: Details::new(),
        }
    }

    pub fn with_details(mut self, details: Details) -> Self {
        self.details = details;
        self
    }

    pub fn kind(&self) -> TokenKind {
        self.kind
    }

    pub fn principal(&self) -> &str {
        &self.principal
    }

    /// Raw credential, `None` once erased.
    pub fn credentials(&self) -> Option<&str> {
        self.credentials.as_ref().map(|c| c.expose_secret())
    }

    pub fn authorities(&self) -> &BTreeSet<String> {
        &self.authorities
    }

    pub fn has_authority(&self, authority: &str) -> bool {
        self.authorities.contains(authority)
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Trust can only be dropped here, never granted.
    pub fn set_authenticated(&mut self, authenticated: bool) -> Result<(), AuthError> {
        if authenticated {
            return Err(AuthError::Configuration(
                "cannot mark a token as trusted; use an authentication provider".to_string(),
            ));
        }
        self.authenticated = false;
        Ok(())
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn details_mut(&mut self) -> &mut Details {
        &mut self.details
    }

    pub fn erase_credentials(&mut self) {
        self.credentials = None;
    }
}

impl fmt::Debug for AuthenticationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationToken")
            .field("kind", &self.kind)
            .field("principal", &self.principal)
            .field("credentials", &self.credentials.as_ref().map(|_| "[protected]"))
            .field("authorities", &self.authorities)
            .field("authenticated", &self.authenticated)
            .field("details", &self.details)
            .finish()
    }
}
