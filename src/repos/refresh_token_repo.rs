use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::debug;

use crate::repos::error::RepoResult;

pub const DEFAULT_CLEANUP_THRESHOLD: usize = 100;

/// Persistence for refresh tokens.
///
/// Notes:
/// - Keys are whatever the caller hands in. `TokenService` passes
///   `hex(sha256(token))`, so raw refresh tokens never reach the store.
/// - A record past `expires_at` must not resolve to a subject.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    async fn save(&self, key: &str, subject: &str, expires_at: DateTime<Utc>) -> RepoResult<()>;

    async fn find_subject(&self, key: &str, now: DateTime<Utc>) -> RepoResult<Option<String>>;

    // Returns whether a record was removed.
    async fn delete(&self, key: &str) -> RepoResult<bool>;
}

#[derive(Clone, Debug)]
struct RefreshTokenRecord {
    subject: String,
    expires_at: DateTime<Utc>,
}

/// Expired records are swept on `save` once the map holds
/// `cleanup_threshold` entries.
#[derive(Clone, Debug)]
pub struct InMemoryRefreshTokenRepo {
    records: Arc<Mutex<HashMap<String, RefreshTokenRecord>>>,
    cleanup_threshold: usize,
}

impl Default for InMemoryRefreshTokenRepo {
    fn default() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            cleanup_threshold: DEFAULT_CLEANUP_THRESHOLD,
        }
    }
}

impl InMemoryRefreshTokenRepo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_cleanup_threshold(mut self, threshold: usize) -> Self {
        self.cleanup_threshold = threshold;
        self
    }

    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

#[async_trait]
impl RefreshTokenStore for InMemoryRefreshTokenRepo {
    async fn save(&self, key: &str, subject: &str, expires_at: DateTime<Utc>) -> RepoResult<()> {
        let mut records = self.records.lock();
        records.insert(
            key.to_string(),
            RefreshTokenRecord {
                subject: subject.to_string(),
                expires_at,
            },
        );

        if records.len() >= self.cleanup_threshold {
            let now = Utc::now();
            let before = records.len();
            records.retain(|_, r| r.expires_at > now);
            debug!(evicted = before - records.len(), "expired refresh tokens evicted");
        }
        Ok(())
    }

    async fn find_subject(&self, key: &str, now: DateTime<Utc>) -> RepoResult<Option<String>> {
        Ok(self
            .records
            .lock()
            .get(key)
            .filter(|r| r.expires_at > now)
            .map(|r| r.subject.clone()))
    }

    async fn delete(&self, key: &str) -> RepoResult<bool> {
        Ok(self.records.lock().remove(key).is_some())
    }
}
