/*
 * Responsibility
 * - AuthenticationToken / UserDetails などの認証モデル
 * - Provider (password / one-time token / bearer) と ProviderManager
 * - access token (JWT) と refresh token の発行・ローテーション
 */
pub mod bearer_provider;
pub mod checks;
pub mod dao_provider;
pub mod error;
pub mod events;
pub mod jwt;
pub mod manager;
pub mod ott_provider;
pub mod provider;
pub mod random;
pub mod token;
pub mod token_service;
pub mod user_details;

pub use bearer_provider::BearerTokenAuthenticationProvider;
pub use checks::{
    CompromisedPasswordChecker, CompromisedPasswordDecision, DefaultPostAuthenticationChecks,
    DefaultPreAuthenticationChecks, UserDetailsChecker,
};
pub use dao_provider::{CredentialsChecker, DaoAuthenticationProvider, PasswordCredentialsChecker};
pub use error::{AuthError, ChangePasswordCause, ChangePasswordError};
pub use events::{
    AuthenticationEventPublisher, FailureEvent, NullEventPublisher, TracingEventPublisher,
};
pub use jwt::{AccessTokenClaims, JwtError, JwtIssuer};
pub use manager::ProviderManager;
pub use ott_provider::OneTimeTokenAuthenticationProvider;
pub use provider::{Authenticated, AuthenticationManager, AuthenticationProvider};
pub use token::{AuthenticationToken, Details, TokenKind};
pub use token_service::{IssuedTokenPair, TokenService};
pub use user_details::UserDetails;
