use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, trace};

use crate::services::auth::error::AuthError;
use crate::services::auth::events::{AuthenticationEventPublisher, NullEventPublisher};
use crate::services::auth::provider::{Authenticated, AuthenticationManager, AuthenticationProvider};
use crate::services::auth::token::AuthenticationToken;

/// Tries providers in registration order. The first supporting provider that
/// returns a result wins; provider errors are remembered and the loop moves
/// on.
pub struct ProviderManager {
    providers: Vec<Arc<dyn AuthenticationProvider>>,
    parent: Option<Arc<dyn AuthenticationManager>>,
    publisher: Arc<dyn AuthenticationEventPublisher>,
    erase_credentials_after_authentication: bool,
}

impl fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderManager")
            .field("providers", &self.providers.len())
            .field("has_parent", &self.parent.is_some())
            .field(
                "erase_credentials_after_authentication",
                &self.erase_credentials_after_authentication,
            )
            .finish()
    }
}

impl ProviderManager {
    pub fn new(providers: Vec<Arc<dyn AuthenticationProvider>>) -> Self {
        Self {
            providers,
            parent: None,
            publisher: Arc::new(NullEventPublisher),
            erase_credentials_after_authentication: true,
        }
    }

    pub fn with_parent(mut self, parent: Arc<dyn AuthenticationManager>) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_event_publisher(mut self, publisher: Arc<dyn AuthenticationEventPublisher>) -> Self {
        self.publisher = publisher;
        self
    }

    pub fn erase_credentials_after_authentication(mut self, erase: bool) -> Self {
        self.erase_credentials_after_authentication = erase;
        self
    }
}

#[async_trait]
impl AuthenticationManager for ProviderManager {
    async fn authenticate(&self, token: AuthenticationToken) -> Result<Authenticated, AuthError> {
        let mut result: Option<Authenticated> = None;
        let mut last_error: Option<AuthError> = None;

        for (position, provider) in self.providers.iter().enumerate() {
            if !provider.supports(&token) {
                continue;
            }
            trace!(
                position = position + 1,
                total = self.providers.len(),
                token_kind = %token.kind(),
                "authenticating with provider"
            );

            match provider.authenticate(&token).await {
                Ok(Some(mut outcome)) => {
                    if outcome.authentication.details().is_empty() {
                        *outcome.authentication.details_mut() = token.details().clone();
                    }
                    result = Some(outcome);
                    break;
                }
                Ok(None) => {}
                Err(e) => {
                    debug!(position = position + 1, error = %e, "provider rejected token");
                    last_error = Some(e);
                }
            }
        }

        // The parent publishes its own events.
        let mut parent_decided = false;
        if result.is_none() {
            if let Some(parent) = &self.parent {
                match parent.authenticate(token.clone()).await {
                    Ok(outcome) => {
                        result = Some(outcome);
                        parent_decided = true;
                    }
                    Err(AuthError::ProviderNotFound(_)) if last_error.is_some() => {}
                    Err(e) => {
                        last_error = Some(e);
                        parent_decided = true;
                    }
                }
            }
        }

        if let Some(mut outcome) = result {
            if self.erase_credentials_after_authentication {
                outcome.authentication.erase_credentials();
            }
            if !parent_decided {
                self.publisher
                    .publish_authentication_success(&outcome.authentication);
            }
            return Ok(outcome);
        }

        let error = last_error.unwrap_or(AuthError::ProviderNotFound(token.kind()));
        if !parent_decided {
            self.publisher.publish_authentication_failure(&error, &token);
        }
        Err(error)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use parking_lot::Mutex;

    use super::*;
    use crate::services::auth::events::FailureEvent;
    use crate::services::auth::token::TokenKind;

    enum Behaviour {
        Unsupported,
        Fails(fn() -> AuthError),
        Abstains,
        Succeeds(&'static str),
    }

    struct StubProvider {
        behaviour: Behaviour,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                calls: AtomicUsize::new(0),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl AuthenticationProvider for StubProvider {
        fn supports(&self, _token: &AuthenticationToken) -> bool {
            !matches!(self.behaviour, Behaviour::Unsupported)
        }

        async fn authenticate(
            &self,
            token: &AuthenticationToken,
        ) -> Result<Option<Authenticated>, AuthError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behaviour {
                Behaviour::Unsupported => panic!("unsupported provider was called"),
                Behaviour::Fails(make) => Err(make()),
                Behaviour::Abstains => Ok(None),
                Behaviour::Succeeds(principal) => {
                    Ok(Some(Authenticated::new(AuthenticationToken::authenticated(
                        token.kind(),
                        *principal,
                        token.credentials().map(|c| c.to_string().into()),
                        BTreeSet::from(["ROLE_USER".to_string()]),
                    ))))
                }
            }
        }
    }

    #[derive(Default)]
    struct RecordingPublisher {
        successes: Mutex<Vec<String>>,
        failures: Mutex<Vec<FailureEvent>>,
    }

    impl AuthenticationEventPublisher for RecordingPublisher {
        fn publish_authentication_success(&self, authentication: &AuthenticationToken) {
            self.successes
                .lock()
                .push(authentication.principal().to_string());
        }

        fn publish_authentication_failure(&self, error: &AuthError, _: &AuthenticationToken) {
            self.failures.lock().push(error.event_kind());
        }
    }

    fn token() -> AuthenticationToken {
        AuthenticationToken::username_password("alice", "password")
    }

    #[tokio::test]
    async fn skips_unsupported_and_failing_providers_until_one_succeeds() {
        let a = StubProvider::new(Behaviour::Unsupported);
        let b = StubProvider::new(Behaviour::Fails(|| AuthError::BadCredentials));
        let c = StubProvider::new(Behaviour::Succeeds("from-c"));
        let d = StubProvider::new(Behaviour::Succeeds("from-d"));

        let manager = ProviderManager::new(vec![a.clone(), b.clone(), c.clone(), d.clone()]);
        let outcome = manager.authenticate(token()).await.unwrap();

        assert_eq!(outcome.authentication.principal(), "from-c");
        assert!(outcome.authentication.is_authenticated());
        assert_eq!((a.calls(), b.calls(), c.calls(), d.calls()), (0, 1, 1, 0));
    }

    #[tokio::test]
    async fn surfaces_the_last_error_when_everything_fails() {
        let manager = ProviderManager::new(vec![
            StubProvider::new(Behaviour::Fails(|| AuthError::BadCredentials)),
            StubProvider::new(Behaviour::Fails(|| AuthError::Locked)),
        ]);

        assert!(matches!(
            manager.authenticate(token()).await,
            Err(AuthError::Locked)
        ));
    }

    #[tokio::test]
    async fn no_supporting_provider_means_provider_not_found() {
        let publisher = Arc::new(RecordingPublisher::default());
        let manager = ProviderManager::new(vec![
            StubProvider::new(Behaviour::Unsupported),
            StubProvider::new(Behaviour::Abstains),
        ])
        .with_event_publisher(publisher.clone());

        assert!(matches!(
            manager.authenticate(token()).await,
            Err(AuthError::ProviderNotFound(TokenKind::UsernamePassword))
        ));
        assert_eq!(
            *publisher.failures.lock(),
            vec![FailureEvent::ProviderNotFound]
        );
    }

    #[tokio::test]
    async fn falls_back_to_the_parent() {
        let parent = ProviderManager::new(vec![StubProvider::new(Behaviour::Succeeds("parent"))]);
        let publisher = Arc::new(RecordingPublisher::default());
        let manager = ProviderManager::new(vec![StubProvider::new(Behaviour::Fails(|| {
            AuthError::BadCredentials
        }))])
        .with_parent(Arc::new(parent))
        .with_event_publisher(publisher.clone());

        let outcome = manager.authenticate(token()).await.unwrap();

        assert_eq!(outcome.authentication.principal(), "parent");
        // parent publishes on its own
        assert!(publisher.successes.lock().is_empty());
    }

    #[tokio::test]
    async fn parent_provider_not_found_keeps_the_earlier_error() {
        let parent = ProviderManager::new(vec![]);
        let manager = ProviderManager::new(vec![StubProvider::new(Behaviour::Fails(|| {
            AuthError::Disabled
        }))])
        .with_parent(Arc::new(parent));

        assert!(matches!(
            manager.authenticate(token()).await,
            Err(AuthError::Disabled)
        ));
    }

    #[tokio::test]
    async fn success_erases_credentials_copies_details_and_publishes() {
        let publisher = Arc::new(RecordingPublisher::default());
        let manager = ProviderManager::new(vec![StubProvider::new(Behaviour::Succeeds("alice"))])
            .with_event_publisher(publisher.clone());

        let mut input = token();
        input
            .details_mut()
            .insert("request_id".into(), "req-1".into());

        let outcome = manager.authenticate(input).await.unwrap();

        assert_eq!(outcome.authentication.credentials(), None);
        assert_eq!(
            outcome.authentication.details().get("request_id").map(String::as_str),
            Some("req-1")
        );
        assert_eq!(*publisher.successes.lock(), vec!["alice".to_string()]);
    }

    #[tokio::test]
    async fn credentials_are_kept_when_erasure_is_off() {
        let manager = ProviderManager::new(vec![StubProvider::new(Behaviour::Succeeds("alice"))])
            .erase_credentials_after_authentication(false);

        let outcome = manager.authenticate(token()).await.unwrap();
        assert_eq!(outcome.authentication.credentials(), Some("password"));
    }
}
