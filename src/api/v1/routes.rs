/*
 * Responsibility
 * - v1 の URL 構造を定義
 *   - POST /token: password / refresh_token grant (filter chain の skip 対象)
 *   - GET  /me:    filter chain を通過した Authentication を返す
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::api::v1::handlers::{me::me, token::token};
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/token", post(token))
        .route("/me", get(me))
        .with_state(state)
}
