use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use axum::response::IntoResponse;
use tracing::debug;

use crate::filter::authentication::query_param;
use crate::filter::matcher::AntPathRequestMatcher;
use crate::filter::{Filter, FilterChain, FilterResponse};
use crate::security::Scope;
use crate::services::auth::AuthError;
use crate::services::ott::{GenerateOneTimeTokenRequest, OneTimeToken, OneTimeTokenService};

pub const DEFAULT_GENERATE_URL: &str = "/ott/generate";
pub const DEFAULT_REDIRECT_URL: &str = "/login/ott";
pub const USERNAME_PARAMETER: &str = "username";

/// Delivers a freshly generated token (mail, SMS, redirect...).
#[async_trait]
pub trait GeneratedOneTimeTokenHandler: Send + Sync {
    async fn handle(&self, res: &mut FilterResponse, token: &OneTimeToken)
    -> Result<(), AuthError>;
}

/// Redirects the client to the page where the token gets entered. The token
/// itself is expected to reach the user out of band.
#[derive(Clone, Debug)]
pub struct RedirectGeneratedOneTimeTokenHandler {
    redirect_url: String,
}

impl Default for RedirectGeneratedOneTimeTokenHandler {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_URL)
    }
}

impl RedirectGeneratedOneTimeTokenHandler {
    pub fn new(redirect_url: impl Into<String>) -> Self {
        Self {
            redirect_url: redirect_url.into(),
        }
    }
}

#[async_trait]
impl GeneratedOneTimeTokenHandler for RedirectGeneratedOneTimeTokenHandler {
    async fn handle(
        &self,
        res: &mut FilterResponse,
        token: &OneTimeToken,
    ) -> Result<(), AuthError> {
        debug!(username = %token.username(), to = %self.redirect_url, "one-time token generated");
        res.commit(
            (
                StatusCode::FOUND,
                [(header::LOCATION, self.redirect_url.as_str())],
            )
                .into_response(),
        );
        Ok(())
    }
}

/// Answers `POST /ott/generate?username=<name>` by generating a token and
/// handing it to a [`GeneratedOneTimeTokenHandler`]. Everything else, and
/// requests without a username, continue down the chain.
pub struct GenerateOneTimeTokenFilter {
    matcher: AntPathRequestMatcher,
    tokens: Arc<dyn OneTimeTokenService>,
    handler: Arc<dyn GeneratedOneTimeTokenHandler>,
}

impl fmt::Debug for GenerateOneTimeTokenFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerateOneTimeTokenFilter")
            .field("matcher", &self.matcher)
            .finish_non_exhaustive()
    }
}

impl GenerateOneTimeTokenFilter {
    pub fn new(
        tokens: Arc<dyn OneTimeTokenService>,
        handler: Arc<dyn GeneratedOneTimeTokenHandler>,
    ) -> Result<Self, globset::Error> {
        let matcher =
            AntPathRequestMatcher::with_options(DEFAULT_GENERATE_URL, Some(Method::POST), true)?;
        Ok(Self {
            matcher,
            tokens,
            handler,
        })
    }

    pub fn with_request_matcher(mut self, matcher: AntPathRequestMatcher) -> Self {
        self.matcher = matcher;
        self
    }
}

#[async_trait]
impl Filter for GenerateOneTimeTokenFilter {
    async fn do_filter(
        &self,
        scope: &Scope,
        req: &mut Request<Body>,
        res: &mut FilterResponse,
        chain: FilterChain<'_>,
    ) -> Result<(), AuthError> {
        if !self.matcher.matches(&*req) {
            return chain.do_filter(scope, req, res).await;
        }
        let Some(request) = query_param(req, USERNAME_PARAMETER)
            .and_then(|username| GenerateOneTimeTokenRequest::new(username).ok())
        else {
            return chain.do_filter(scope, req, res).await;
        };

        let token = self.tokens.generate(&request).await?;
        self.handler.handle(res, &token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{FilterChainProxy, FilterOutcome};
    use crate::security::{SecurityContextHolder, StrategyMode};
    use crate::services::ott::InMemoryOneTimeTokenService;

    fn setup() -> (FilterChainProxy, Arc<InMemoryOneTimeTokenService>) {
        let tokens = Arc::new(InMemoryOneTimeTokenService::new());
        let filter = GenerateOneTimeTokenFilter::new(
            tokens.clone(),
            Arc::new(RedirectGeneratedOneTimeTokenHandler::default()),
        )
        .unwrap();
        let proxy = FilterChainProxy::new(
            vec![Arc::new(filter) as Arc<dyn Filter>],
            SecurityContextHolder::new(StrategyMode::PerRequest),
        );
        (proxy, tokens)
    }

    fn request(method: Method, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn generate_request_gets_a_token_and_a_redirect() {
        let (proxy, tokens) = setup();
        let mut req = request(Method::POST, "/ott/generate?username=alice");

        let outcome = proxy.do_filter(&Scope::new(), &mut req).await.unwrap();

        let FilterOutcome::Respond(response) = outcome else {
            panic!("expected a committed redirect");
        };
        assert_eq!(response.status(), StatusCode::FOUND);
        assert_eq!(
            response.headers().get(header::LOCATION).unwrap(),
            DEFAULT_REDIRECT_URL
        );
        assert_eq!(tokens.len(), 1);
    }

    #[tokio::test]
    async fn other_requests_continue_down_the_chain() {
        let (proxy, tokens) = setup();

        for (method, uri) in [
            (Method::GET, "/ott/generate?username=alice"),
            (Method::POST, "/ott/generate"),
            (Method::POST, "/elsewhere?username=alice"),
        ] {
            let outcome = proxy.do_filter(&Scope::new(), &mut request(method, uri)).await;
            // nothing authenticated, so the terminal gate rejects
            assert!(matches!(outcome, Err(AuthError::AuthenticationRequired)), "{uri}");
        }
        assert!(tokens.is_empty());
    }
}
