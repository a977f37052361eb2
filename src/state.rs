/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - tokens: JWT / refresh token の発行
 *   - manager: ProviderManager (password / ott / bearer)
 *   - security: filter chain (middleware から使う)
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::filter::FilterChainProxy;
use crate::services::auth::{AuthenticationManager, TokenService};
use crate::services::ott::OneTimeTokenService;

#[derive(Clone)]
pub struct AppState {
    pub tokens: Arc<TokenService>,
    pub manager: Arc<dyn AuthenticationManager>,
    pub one_time_tokens: Arc<dyn OneTimeTokenService>,
    pub security: Arc<FilterChainProxy>,
}

impl AppState {
    pub fn new(
        tokens: Arc<TokenService>,
        manager: Arc<dyn AuthenticationManager>,
        one_time_tokens: Arc<dyn OneTimeTokenService>,
        security: Arc<FilterChainProxy>,
    ) -> Self {
        Self {
            tokens,
            manager,
            one_time_tokens,
            security,
        }
    }
}
