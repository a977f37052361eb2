/*
 * Responsibility
 * - ユーザー (UserDetails) の取得とパスワードハッシュ更新の trait
 * - InMemoryUserRepo: HashMap ベースの参照実装
 */
use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use crate::repos::error::{RepoError, RepoResult};
use crate::services::auth::UserDetails;

/// Source of user records for password and one-time-token logins.
///
/// Implementations may hit the network; the core never retries.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    // `Ok(None)` when no such user exists.
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<UserDetails>>;
}

/// Persists a re-encoded password hash after a successful login.
#[async_trait]
pub trait PasswordUpdater: Send + Sync {
    // Returns the updated snapshot.
    async fn update_password(&self, user: &UserDetails, new_hash: &str)
    -> RepoResult<UserDetails>;
}

#[derive(Clone, Debug, Default)]
pub struct InMemoryUserRepo {
    users: Arc<RwLock<HashMap<String, UserDetails>>>,
}

impl InMemoryUserRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_users(users: impl IntoIterator<Item = UserDetails>) -> Self {
        let repo = Self::new();
        for user in users {
            repo.insert(user);
        }
        repo
    }

    /// Insert or replace by username.
    pub fn insert(&self, user: UserDetails) {
        self.users.write().insert(user.username().to_string(), user);
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl CredentialStore for InMemoryUserRepo {
    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<UserDetails>> {
        Ok(self.users.read().get(username).cloned())
    }
}

#[async_trait]
impl PasswordUpdater for InMemoryUserRepo {
    async fn update_password(
        &self,
        user: &UserDetails,
        new_hash: &str,
    ) -> RepoResult<UserDetails> {
        let mut users = self.users.write();
        let stored = users
            .get_mut(user.username())
            .ok_or_else(|| RepoError::NotFound(user.username().to_string()))?;

        *stored = stored.with_password(new_hash);
        debug!(username = %user.username(), "password hash updated");

        Ok(stored.clone())
    }
}
