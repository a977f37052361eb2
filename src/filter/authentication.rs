use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, Request, header};
use tracing::{debug, warn};

use crate::filter::{Filter, FilterChain, FilterResponse};
use crate::security::{Scope, SecurityContextHolder};
use crate::services::auth::{AuthError, AuthenticationManager, AuthenticationToken, Details};

pub const REQUEST_ID_HEADER: &str = "x-request-id";
pub const USERNAME_HEADER: &str = "x-username";
pub const PASSWORD_HEADER: &str = "x-password";
pub const TOKEN_PARAMETER: &str = "token";

/// Pulls an unauthenticated token out of a request.
///
/// `None` means the request does not carry this kind of credential, and
/// the filter passes it on untouched.
pub trait AuthenticationConverter: Send + Sync {
    fn convert(&self, req: &Request<Body>) -> Option<AuthenticationToken>;
}

fn request_details(headers: &HeaderMap) -> Details {
    let mut details = Details::new();
    if let Some(id) = headers
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
    {
        details.insert("request_id".to_string(), id.to_string());
    }
    details
}

pub(crate) fn query_param(req: &Request<Body>, name: &str) -> Option<String> {
    let query = req.uri().query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == name)
        .map(|(_, value)| value.into_owned())
}

/// `Authorization: Bearer <token>`
#[derive(Clone, Copy, Debug, Default)]
pub struct BearerTokenConverter;

impl AuthenticationConverter for BearerTokenConverter {
    fn convert(&self, req: &Request<Body>) -> Option<AuthenticationToken> {
        let value = req
            .headers()
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())?;
        let (scheme, token) = value.split_once(' ')?;
        let token = token.trim();
        if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
            return None;
        }
        Some(AuthenticationToken::bearer(token).with_details(request_details(req.headers())))
    }
}

/// `X-Username` / `X-Password` headers. Both must be present.
#[derive(Clone, Copy, Debug, Default)]
pub struct UsernamePasswordHeaderConverter;

impl AuthenticationConverter for UsernamePasswordHeaderConverter {
    fn convert(&self, req: &Request<Body>) -> Option<AuthenticationToken> {
        let headers = req.headers();
        let username = headers.get(USERNAME_HEADER)?.to_str().ok()?;
        let password = headers.get(PASSWORD_HEADER)?.to_str().ok()?;
        Some(
            AuthenticationToken::username_password(username, password)
                .with_details(request_details(headers)),
        )
    }
}

/// `?token=<value>`
#[derive(Clone, Copy, Debug, Default)]
pub struct OneTimeTokenQueryConverter;

impl AuthenticationConverter for OneTimeTokenQueryConverter {
    fn convert(&self, req: &Request<Body>) -> Option<AuthenticationToken> {
        let value = query_param(req, TOKEN_PARAMETER).filter(|v| !v.is_empty())?;
        Some(AuthenticationToken::one_time_token(value).with_details(request_details(req.headers())))
    }
}

/// Converts, authenticates, and stores the result in the scope's context.
pub struct AuthenticationFilter {
    converter: Arc<dyn AuthenticationConverter>,
    manager: Arc<dyn AuthenticationManager>,
    holder: SecurityContextHolder,
}

impl fmt::Debug for AuthenticationFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticationFilter").finish_non_exhaustive()
    }
}

impl AuthenticationFilter {
    pub fn new(
        converter: Arc<dyn AuthenticationConverter>,
        manager: Arc<dyn AuthenticationManager>,
        holder: SecurityContextHolder,
    ) -> Self {
        Self {
            converter,
            manager,
            holder,
        }
    }
}

#[async_trait]
impl Filter for AuthenticationFilter {
    async fn do_filter(
        &self,
        scope: &Scope,
        req: &mut Request<Body>,
        res: &mut FilterResponse,
        chain: FilterChain<'_>,
    ) -> Result<(), AuthError> {
        let Some(token) = self.converter.convert(req) else {
            return chain.do_filter(scope, req, res).await;
        };
        let kind = token.kind();

        let outcome = match self.manager.authenticate(token).await {
            Ok(outcome) => outcome,
            Err(err) => {
                self.holder.clear_context(scope);
                debug!(error = %err, token_kind = %kind, "authentication failed");
                return Err(err);
            }
        };

        if let Some(upgrade_error) = &outcome.upgrade_error {
            warn!(error = %upgrade_error, "password upgrade was not persisted");
        }

        let context = self.holder.create_empty_context();
        context.set_authentication(Some(outcome.authentication));
        self.holder.set_context(scope, Some(context))?;

        chain.do_filter(scope, req, res).await
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use parking_lot::Mutex;

    use super::*;
    use crate::filter::{FilterChainProxy, FilterOutcome};
    use crate::security::StrategyMode;
    use crate::services::auth::{Authenticated, TokenKind};

    /// Accepts the bearer value "good" as alice; records what it was given.
    #[derive(Default)]
    struct StubManager {
        seen: Mutex<Vec<AuthenticationToken>>,
    }

    #[async_trait]
    impl AuthenticationManager for StubManager {
        async fn authenticate(
            &self,
            token: AuthenticationToken,
        ) -> Result<Authenticated, AuthError> {
            self.seen.lock().push(token.clone());
            if token.credentials() == Some("good") {
                Ok(Authenticated::new(AuthenticationToken::authenticated(
                    token.kind(),
                    "alice",
                    None,
                    BTreeSet::new(),
                )))
            } else {
                Err(AuthError::BadCredentials)
            }
        }
    }

    fn setup() -> (FilterChainProxy, Arc<StubManager>) {
        let manager = Arc::new(StubManager::default());
        let holder = SecurityContextHolder::new(StrategyMode::PerRequest);
        let converters: [Arc<dyn AuthenticationConverter>; 3] = [
            Arc::new(BearerTokenConverter),
            Arc::new(UsernamePasswordHeaderConverter),
            Arc::new(OneTimeTokenQueryConverter),
        ];
        let filters = converters
            .into_iter()
            .map(|converter| {
                Arc::new(AuthenticationFilter::new(
                    converter,
                    manager.clone(),
                    holder.clone(),
                )) as Arc<dyn Filter>
            })
            .collect();
        (FilterChainProxy::new(filters, holder), manager)
    }

    fn get(uri: &str) -> axum::http::request::Builder {
        Request::builder().uri(uri)
    }

    #[test]
    fn bearer_converter_reads_the_authorization_header() {
        let req = get("/")
            .header(header::AUTHORIZATION, "Bearer abc.def")
            .header(REQUEST_ID_HEADER, "req-1")
            .body(Body::empty())
            .unwrap();

        let token = BearerTokenConverter.convert(&req).unwrap();
        assert_eq!(token.kind(), TokenKind::Bearer);
        assert_eq!(token.credentials(), Some("abc.def"));
        assert_eq!(token.details().get("request_id").map(String::as_str), Some("req-1"));

        let basic = get("/")
            .header(header::AUTHORIZATION, "Basic YWxpY2U6cHc=")
            .body(Body::empty())
            .unwrap();
        assert!(BearerTokenConverter.convert(&basic).is_none());
    }

    #[test]
    fn header_converter_needs_both_headers() {
        let both = get("/")
            .header(USERNAME_HEADER, "alice")
            .header(PASSWORD_HEADER, "pw")
            .body(Body::empty())
            .unwrap();
        let token = UsernamePasswordHeaderConverter.convert(&both).unwrap();
        assert_eq!(token.principal(), "alice");
        assert_eq!(token.credentials(), Some("pw"));

        let only_user = get("/")
            .header(USERNAME_HEADER, "alice")
            .body(Body::empty())
            .unwrap();
        assert!(UsernamePasswordHeaderConverter.convert(&only_user).is_none());
    }

    #[test]
    fn query_converter_decodes_the_token_parameter() {
        let req = get("/login?x=1&token=a%2Bb").body(Body::empty()).unwrap();
        let token = OneTimeTokenQueryConverter.convert(&req).unwrap();

        assert_eq!(token.kind(), TokenKind::OneTimeToken);
        assert_eq!(token.credentials(), Some("a+b"));

        let empty = get("/login?token=").body(Body::empty()).unwrap();
        assert!(OneTimeTokenQueryConverter.convert(&empty).is_none());
    }

    #[tokio::test]
    async fn successful_authentication_reaches_the_gate() {
        let (proxy, _) = setup();
        let scope = Scope::new();
        let mut req = get("/me")
            .header(header::AUTHORIZATION, "Bearer good")
            .body(Body::empty())
            .unwrap();

        let outcome = proxy.do_filter(&scope, &mut req).await.unwrap();

        assert!(matches!(outcome, FilterOutcome::Proceed));
        let auth = proxy.holder().get_context(&scope).authentication().unwrap();
        assert_eq!(auth.principal(), "alice");
    }

    #[tokio::test]
    async fn failed_authentication_aborts_and_clears_the_context() {
        let (proxy, manager) = setup();
        let scope = Scope::new();
        let mut req = get("/me?token=good")
            .header(header::AUTHORIZATION, "Bearer bad")
            .body(Body::empty())
            .unwrap();

        let outcome = proxy.do_filter(&scope, &mut req).await;

        assert!(matches!(outcome, Err(AuthError::BadCredentials)));
        // the query filter after the bearer one never ran
        assert_eq!(manager.seen.lock().len(), 1);
        assert!(proxy.holder().get_context(&scope).authentication().is_none());
    }

    #[tokio::test]
    async fn requests_without_credentials_pass_through_to_the_gate() {
        let (proxy, manager) = setup();
        let mut req = get("/me").body(Body::empty()).unwrap();

        let outcome = proxy.do_filter(&Scope::new(), &mut req).await;

        assert!(matches!(outcome, Err(AuthError::AuthenticationRequired)));
        assert!(manager.seen.lock().is_empty());
    }
}
