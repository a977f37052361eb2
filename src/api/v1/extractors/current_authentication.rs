use axum::extract::FromRequestParts;
use axum::http::{StatusCode, request::Parts};

use crate::services::auth::AuthenticationToken;
use crate::state::AppState;

/// Handler で、filter chain を通過した Authentication を受け取るための extractor
/// security middleware が request.extensions() に insert 済みである前提
/// 見つからない場合は 401 を返す（skip path 上の route・ミドルウェア未設定）
pub struct CurrentAuthentication(pub AuthenticationToken);

impl FromRequestParts<AppState> for CurrentAuthentication
where
    AppState: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticationToken>()
            .filter(|a| a.is_authenticated())
            .cloned()
            .map(CurrentAuthentication)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}
