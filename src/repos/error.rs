use thiserror::Error;

/// Store-level failures (transport/backend).
///
/// Callers pass these through unchanged; an absent record is `Ok(None)`,
/// not an error.
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("record not found: {0}")]
    NotFound(String),
}

pub type RepoResult<T> = Result<T, RepoError>;
