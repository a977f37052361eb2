/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - AuthError / RepoError / 設定エラーを統一的に変換
 *   - 認証失敗はすべて 401 + 汎用メッセージ (失敗理由はログにのみ残す)
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

use crate::config::ConfigError;
use crate::repos::RepoError;
use crate::services::auth::AuthError;
use crate::services::password::EncoderConfigError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("unauthorized")]
    Unauthorized,

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("internal server error")]
    Internal,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", self.to_string()),
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                "unauthorized".to_string(),
            ),
            AppError::Config(_) | AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL",
                "internal server error".to_string(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for AppError {
    fn from(e: AuthError) -> Self {
        if e.is_credential_error() {
            AppError::Unauthorized
        } else {
            error!(error = %e, "authentication backend failure");
            AppError::Internal
        }
    }
}

impl From<RepoError> for AppError {
    fn from(e: RepoError) -> Self {
        error!(error = %e, "store failure");
        AppError::Internal
    }
}

impl From<EncoderConfigError> for AppError {
    fn from(e: EncoderConfigError) -> Self {
        error!(error = %e, "password encoder misconfigured");
        AppError::Internal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credential_failures_become_unauthorized() {
        for e in [
            AuthError::BadCredentials,
            AuthError::Locked,
            AuthError::InvalidRefreshToken,
            AuthError::AuthenticationRequired,
        ] {
            assert!(matches!(AppError::from(e), AppError::Unauthorized));
        }
    }

    #[test]
    fn backend_failures_become_internal() {
        let e = AuthError::Service(RepoError::Unavailable("down".into()));
        assert!(matches!(AppError::from(e), AppError::Internal));
    }

    #[test]
    fn unauthorized_body_is_generic() {
        let response = AppError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
