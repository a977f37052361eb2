//! FilterChainProxy → axum middleware
//!
//! - request ごとに新しい `Scope` を作って filter chain を通す
//! - 失敗 (Err / Halted) は 401、filter が返した response はそのまま返す
//! - 通過したら Authentication を extensions に入れて handler へ
//! - 最後に scope の context を clear する

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::filter::FilterOutcome;
use crate::security::Scope;
use crate::state::AppState;

pub fn apply(router: Router, state: AppState) -> Router {
    router.layer(middleware::from_fn_with_state(state, security_middleware))
}

async fn security_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let scope = Scope::new();
    let holder = state.security.holder().clone();

    let outcome = state.security.do_filter(&scope, &mut req).await;

    let result = match outcome {
        Ok(FilterOutcome::Proceed) => {
            if let Some(authentication) = holder.get_context(&scope).authentication() {
                req.extensions_mut().insert(authentication);
            }
            Ok(next.run(req).await)
        }
        Ok(FilterOutcome::Respond(response)) => Ok(response),
        Ok(FilterOutcome::Halted) => {
            tracing::warn!(path = %req.uri().path(), "filter chain halted");
            Err(AppError::Unauthorized)
        }
        Err(err) => {
            tracing::warn!(error = ?err, path = %req.uri().path(), "request rejected by filter chain");
            Err(AppError::from(err))
        }
    };

    holder.clear_context(&scope);
    result
}
