/*
 * Responsibility
 * - middleware の公開インターフェース
 *   - http: request id / trace / body limit / timeout
 *   - security: FilterChainProxy を axum の middleware として掛ける
 */
pub mod http;
pub mod security;
