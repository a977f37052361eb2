/*
 * Responsibility
 * - 認証コアのドメインロジック (HTTP 非依存)
 *   - password: ハッシュ方式ごとの encoder と id による振り分け
 *   - auth: token / provider / manager / JWT
 *   - ott: one-time token の発行と消費
 */
pub mod auth;
pub mod ott;
pub mod password;
