use async_trait::async_trait;
use axum::body::Body;
use axum::http::Request;
use tracing::debug;

use crate::filter::{Filter, FilterChain, FilterResponse};
use crate::security::{Scope, SecurityContextHolder};
use crate::services::auth::AuthError;

/// Terminal gate: lets the request through only when the scope's context
/// holds an authenticated token. No authority checks.
#[derive(Clone, Debug)]
pub struct AuthorizationFilter {
    holder: SecurityContextHolder,
}

impl AuthorizationFilter {
    pub fn new(holder: SecurityContextHolder) -> Self {
        Self { holder }
    }
}

#[async_trait]
impl Filter for AuthorizationFilter {
    async fn do_filter(
        &self,
        scope: &Scope,
        req: &mut Request<Body>,
        res: &mut FilterResponse,
        chain: FilterChain<'_>,
    ) -> Result<(), AuthError> {
        if !self.holder.get_context(scope).is_authenticated() {
            debug!(path = %req.uri().path(), "access denied: not authenticated");
            return Err(AuthError::AuthenticationRequired);
        }
        chain.do_filter(scope, req, res).await
    }
}
