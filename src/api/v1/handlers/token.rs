use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use tracing::{info, warn};

use crate::api::v1::dto::{token_request::TokenRequest, token_response::TokenResponse};
use crate::error::AppError;
use crate::services::auth::AuthenticationToken;
use crate::state::AppState;

pub async fn token(
    State(state): State<AppState>,
    Json(req): Json<TokenRequest>,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    match req.grant_type.as_deref() {
        Some("refresh_token") => {
            let refresh_token = req
                .refresh_token
                .ok_or_else(|| AppError::InvalidRequest("refresh_token is required".into()))?;

            // rotates: the presented refresh token is dead after this call
            let out = state.tokens.refresh_jwt(&refresh_token).await?;

            Ok((StatusCode::OK, Json(TokenResponse::from(out))))
        }
        None | Some("password") => {
            let (Some(username), Some(password)) = (req.username, req.password) else {
                return Err(AppError::InvalidRequest(
                    "username and password are required".into(),
                ));
            };

            let outcome = state
                .manager
                .authenticate(AuthenticationToken::username_password(username, password))
                .await?;
            if let Some(e) = &outcome.upgrade_error {
                warn!(error = %e, "password upgrade was not persisted");
            }

            let principal = outcome.authentication.principal();
            let out = state.tokens.generate_jwt(principal).await?;
            info!(username = %principal, "token pair issued");

            Ok((StatusCode::OK, Json(TokenResponse::from(out))))
        }
        Some(other) => Err(AppError::InvalidRequest(format!(
            "unsupported grant_type: {other}"
        ))),
    }
}
