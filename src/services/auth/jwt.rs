use std::fmt;

use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use uuid::Uuid;

use crate::services::auth::error::AuthError;

/// HS256 needs at least as many key bytes as the digest.
pub const MIN_SECRET_LENGTH: usize = 32;

/// Upper bound for any token lifetime (100 years). Keeps `now + ttl` inside
/// what timestamps and `TimeDelta` can hold.
pub const MAX_TTL_SECONDS: u64 = 100 * 365 * 24 * 60 * 60;

/// Validation subtracts the leeway from the current time.
pub const MAX_LEEWAY_SECONDS: u64 = 60 * 60;

#[derive(Debug, Error)]
pub enum JwtError {
    #[error("jwt secret must be at least {MIN_SECRET_LENGTH} bytes")]
    WeakSecret,

    #[error("token ttl must be at most {MAX_TTL_SECONDS} seconds")]
    TtlOutOfRange,

    #[error("leeway must be at most {MAX_LEEWAY_SECONDS} seconds")]
    LeewayOutOfRange,

    #[error("subject cannot be empty")]
    EmptySubject,

    #[error("failed to sign token: {0}")]
    Sign(#[source] jsonwebtoken::errors::Error),

    #[error("token rejected: {0}")]
    Invalid(#[source] jsonwebtoken::errors::Error),
}

impl From<JwtError> for AuthError {
    fn from(e: JwtError) -> Self {
        match e {
            JwtError::Invalid(_) => AuthError::InvalidBearerToken,
            other => AuthError::Internal(other.to_string()),
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessTokenClaims {
    pub sub: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: String,
}

/// Signs and verifies HS256 access tokens.
///
/// Verification covers the signature and `exp` (with leeway) only; there is
/// no revocation list for access tokens.
#[derive(Clone)]
pub struct JwtIssuer {
    ttl_seconds: u64,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
}

impl fmt::Debug for JwtIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtIssuer")
            .field("ttl_seconds", &self.ttl_seconds)
            .field("leeway", &self.validation.leeway)
            .finish()
    }
}

impl JwtIssuer {
    pub fn new(secret: &[u8], ttl_seconds: u64, leeway_seconds: u64) -> Result<Self, JwtError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(JwtError::WeakSecret);
        }
        if ttl_seconds > MAX_TTL_SECONDS {
            return Err(JwtError::TtlOutOfRange);
        }
        if leeway_seconds > MAX_LEEWAY_SECONDS {
            return Err(JwtError::LeewayOutOfRange);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = leeway_seconds;
        validation.set_required_spec_claims(&["exp", "sub"]);

        Ok(Self {
            ttl_seconds,
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
        })
    }

    pub fn ttl_seconds(&self) -> u64 {
        self.ttl_seconds
    }

    pub fn issue_access_token(&self, subject: &str) -> Result<String, JwtError> {
        if subject.is_empty() {
            return Err(JwtError::EmptySubject);
        }
        let now = Utc::now().timestamp();
        let exp = i64::try_from(self.ttl_seconds)
            .ok()
            .and_then(|ttl| now.checked_add(ttl))
            .ok_or(JwtError::TtlOutOfRange)?;
        let claims = AccessTokenClaims {
            sub: subject.to_string(),
            iat: now,
            exp,
            jti: Uuid::new_v4().to_string(),
        };

        debug!(sub = %claims.sub, jti = %claims.jti, exp = claims.exp, "issuing access token");
        self.sign(&claims)
    }

    pub fn sign<T: Serialize>(&self, claims: &T) -> Result<String, JwtError> {
        let mut header = Header::new(Algorithm::HS256);
        header.typ = Some("JWT".to_string());
        jsonwebtoken::encode(&header, claims, &self.encoding_key).map_err(|e| {
            error!(error = %e, "failed to sign JWT");
            JwtError::Sign(e)
        })
    }

    pub fn decode(&self, token: &str) -> Result<AccessTokenClaims, JwtError> {
        jsonwebtoken::decode::<AccessTokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(JwtError::Invalid)
    }

    pub fn validate(&self, token: &str) -> bool {
        match self.decode(token) {
            Ok(_) => true,
            Err(e) => {
                debug!(error = %e, "access token rejected");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &[u8] = b"0123456789abcdef0123456789abcdef";

    fn issuer() -> JwtIssuer {
        JwtIssuer::new(SECRET, 600, 0).unwrap()
    }

    #[test]
    fn issued_tokens_validate_and_carry_the_subject() {
        let jwt = issuer();
        let token = jwt.issue_access_token("alice").unwrap();

        assert!(jwt.validate(&token));
        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.sub, "alice");
        assert_eq!(claims.exp - claims.iat, 600);
    }

    #[test]
    fn other_secrets_are_rejected() {
        let token = issuer().issue_access_token("alice").unwrap();
        let other = JwtIssuer::new(b"ffffffffffffffffffffffffffffffff", 600, 0).unwrap();

        assert!(!other.validate(&token));
    }

    #[test]
    fn expired_tokens_are_rejected() {
        let jwt = issuer();
        let now = Utc::now().timestamp();
        let token = jwt
            .sign(&AccessTokenClaims {
                sub: "alice".into(),
                iat: now - 120,
                exp: now - 60,
                jti: "j".into(),
            })
            .unwrap();

        assert!(!jwt.validate(&token));
        assert!(matches!(jwt.decode(&token), Err(JwtError::Invalid(_))));
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(!issuer().validate("not.a.jwt"));
    }

    #[test]
    fn short_secrets_and_empty_subjects_are_refused() {
        assert!(matches!(
            JwtIssuer::new(b"short", 600, 0),
            Err(JwtError::WeakSecret)
        ));
        assert!(matches!(
            issuer().issue_access_token(""),
            Err(JwtError::EmptySubject)
        ));
    }

    #[test]
    fn lifetimes_past_the_cap_are_refused() {
        assert!(matches!(
            JwtIssuer::new(SECRET, u64::MAX, 0),
            Err(JwtError::TtlOutOfRange)
        ));
        assert!(matches!(
            JwtIssuer::new(SECRET, 600, u64::MAX),
            Err(JwtError::LeewayOutOfRange)
        ));
    }

    #[test]
    fn longest_allowed_lifetime_still_validates() {
        let jwt = JwtIssuer::new(SECRET, MAX_TTL_SECONDS, MAX_LEEWAY_SECONDS).unwrap();
        let token = jwt.issue_access_token("alice").unwrap();

        assert!(jwt.validate(&token));
        let claims = jwt.decode(&token).unwrap();
        assert_eq!(claims.exp - claims.iat, MAX_TTL_SECONDS as i64);
    }
}
