/*
 * Responsibility
 * - 認証コアが外部に要求するストアの境界 (trait)
 * - in-memory の参照実装 (テスト / デモ用)
 */
pub mod error;
pub mod refresh_token_repo;
pub mod user_repo;

pub use error::{RepoError, RepoResult};
pub use refresh_token_repo::{InMemoryRefreshTokenRepo, RefreshTokenStore};
pub use user_repo::{CredentialStore, InMemoryUserRepo, PasswordUpdater};
