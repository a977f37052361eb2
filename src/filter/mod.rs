//! Request-scoped filter chain.
//!
//! Responsibility:
//! - `Filter`: one interceptor, given `(scope, request, response, chain)`
//! - `FilterChainProxy`: ordered filters + skip list + terminal authorization
//! - credential extraction (`AuthenticationConverter`) and one-time-token issuance
//!
//! Notes:
//! - Filters see an axum `Request<Body>` but never read the body.
//! - A filter continues by calling `chain.do_filter(..)`, aborts by returning
//!   `Err`, or answers the request itself by committing to `FilterResponse`.

pub mod authentication;
pub mod authorization;
pub mod chain;
pub mod generate_ott;
pub mod matcher;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use axum::response::Response;

use crate::security::Scope;
use crate::services::auth::AuthError;

pub use authentication::{
    AuthenticationConverter, AuthenticationFilter, BearerTokenConverter,
    OneTimeTokenQueryConverter, UsernamePasswordHeaderConverter,
};
pub use authorization::AuthorizationFilter;
pub use chain::{FilterChain, FilterChainProxy, FilterOutcome};
pub use generate_ott::{
    GenerateOneTimeTokenFilter, GeneratedOneTimeTokenHandler, RedirectGeneratedOneTimeTokenHandler,
};
pub use matcher::AntPathRequestMatcher;

#[async_trait]
pub trait Filter: Send + Sync {
    async fn do_filter(
        &self,
        scope: &Scope,
        req: &mut Request<Body>,
        res: &mut FilterResponse,
        chain: FilterChain<'_>,
    ) -> Result<(), AuthError>;
}

/// Response a filter commits instead of passing the request on.
#[derive(Debug, Default)]
pub struct FilterResponse {
    committed: Option<Response>,
}

impl FilterResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn commit(&mut self, response: Response) {
        self.committed = Some(response);
    }

    pub fn is_committed(&self) -> bool {
        self.committed.is_some()
    }

    pub fn take(&mut self) -> Option<Response> {
        self.committed.take()
    }
}
