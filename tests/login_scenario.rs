//! Library-level walk through the core without HTTP: hash a password, log in
//! through the provider chain, spend a one-time token, rotate a refresh token.

use std::sync::Arc;

use auth_core::repos::{InMemoryRefreshTokenRepo, InMemoryUserRepo};
use auth_core::services::auth::{
    AuthError, AuthenticationManager, AuthenticationProvider, AuthenticationToken,
    DaoAuthenticationProvider, JwtIssuer, OneTimeTokenAuthenticationProvider, ProviderManager,
    TokenService, UserDetails,
};
use auth_core::services::ott::{
    GenerateOneTimeTokenRequest, InMemoryOneTimeTokenService, OneTimeTokenService,
};
use auth_core::services::password::{PasswordEncoder, create_delegating_password_encoder};

#[tokio::test]
async fn argon2_password_then_one_time_token() {
    let encoder: Arc<dyn PasswordEncoder> =
        Arc::new(create_delegating_password_encoder("argon2").unwrap());
    let encoded = encoder.encode("password").unwrap();
    assert!(encoded.starts_with("{argon2}$argon2id$v=19$m=16384,t=2,p=1$"));
    assert!(encoder.matches("password", &encoded).unwrap());
    assert!(!encoder.matches("wrong", &encoded).unwrap());

    let users = Arc::new(InMemoryUserRepo::with_users([
        UserDetails::new("alice", encoded).with_authorities(["ROLE_USER"])
    ]));
    let one_time_tokens = Arc::new(InMemoryOneTimeTokenService::new());
    let providers: Vec<Arc<dyn AuthenticationProvider>> = vec![
        Arc::new(DaoAuthenticationProvider::new(users.clone(), encoder)),
        Arc::new(OneTimeTokenAuthenticationProvider::new(
            one_time_tokens.clone(),
            users,
        )),
    ];
    let manager = ProviderManager::new(providers);

    let login = manager
        .authenticate(AuthenticationToken::username_password("alice", "password"))
        .await
        .unwrap();
    assert_eq!(login.authentication.principal(), "alice");
    assert!(login.authentication.credentials().is_none());

    let issued = one_time_tokens
        .generate(&GenerateOneTimeTokenRequest::new("alice").unwrap())
        .await
        .unwrap();
    let consumed = one_time_tokens
        .consume(&AuthenticationToken::one_time_token(issued.token_value()))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(consumed.username(), "alice");
    assert!(
        one_time_tokens
            .consume(&AuthenticationToken::one_time_token(issued.token_value()))
            .await
            .unwrap()
            .is_none()
    );

    let second = one_time_tokens
        .generate(&GenerateOneTimeTokenRequest::new("alice").unwrap())
        .await
        .unwrap();
    let via_token = manager
        .authenticate(AuthenticationToken::one_time_token(second.token_value()))
        .await
        .unwrap();
    assert!(via_token.authentication.has_authority("ROLE_USER"));
    assert!(matches!(
        manager
            .authenticate(AuthenticationToken::one_time_token(second.token_value()))
            .await,
        Err(AuthError::InvalidOneTimeToken)
    ));
}

#[tokio::test]
async fn access_token_round_trip_and_refresh_rotation() {
    let jwt = JwtIssuer::new(b"an-hs256-secret-of-at-least-32-bytes", 600, 0).unwrap();
    let tokens = TokenService::new(jwt, Arc::new(InMemoryRefreshTokenRepo::new()), 3600);

    let first = tokens.generate_jwt("alice").await.unwrap();
    assert!(tokens.validate_jwt(&first.access_token));
    assert_eq!(tokens.decode_jwt(&first.access_token).unwrap().sub, "alice");

    let second = tokens.refresh_jwt(&first.refresh_token).await.unwrap();
    assert!(matches!(
        tokens.refresh_jwt(&first.refresh_token).await,
        Err(AuthError::InvalidRefreshToken)
    ));
    assert!(tokens.refresh_jwt(&second.refresh_token).await.is_ok());
}
