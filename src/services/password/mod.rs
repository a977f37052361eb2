//! Password hashing.
//!
//! Each algorithm lives behind [`PasswordEncoder`]. Stored hashes are tagged
//! with the id of the algorithm that produced them (`{argon2}$argon2id$...`)
//! and [`DelegatingPasswordEncoder`] routes verification to the right one.

pub mod argon2;
pub mod bcrypt;
pub mod delegating;
pub mod factory;
pub mod noop;
pub mod scrypt;
pub mod unmapped;

use thiserror::Error;

pub use self::argon2::Argon2PasswordEncoder;
pub use self::bcrypt::{BcryptPasswordEncoder, BcryptVersion};
pub use self::delegating::DelegatingPasswordEncoder;
pub use self::factory::create_delegating_password_encoder;
pub use self::noop::NoOpPasswordEncoder;
pub use self::scrypt::ScryptPasswordEncoder;
pub use self::unmapped::UnmappedIdPasswordEncoder;

/// One hashing algorithm.
///
/// Implementations are CPU bound. Async callers should run them on a blocking
/// thread (see `DaoAuthenticationProvider`).
pub trait PasswordEncoder: Send + Sync {
    fn encode(&self, raw: &str) -> Result<String, EncoderError>;

    /// `Ok(false)` is a mismatch. `Err` means `encoded` could not be checked
    /// at all (empty, malformed, unknown algorithm).
    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError>;

    /// Whether `encoded` should be re-hashed with the current parameters.
    fn upgrade_encoding(&self, _encoded: &str) -> Result<bool, EncoderError> {
        Ok(false)
    }
}

/// Runtime failures while hashing or verifying.
#[derive(Debug, Error)]
pub enum EncoderError {
    #[error("encoded password is empty")]
    EmptyEncodedPassword,

    #[error("raw password is empty")]
    EmptyRawPassword,

    #[error("encoded password is malformed: {0}")]
    Malformed(&'static str),

    #[error("there is no password encoder mapped for the id \"{0}\"")]
    UnmappedId(String),

    #[error("encoding is not supported by this encoder")]
    EncodeNotSupported,

    #[error("random source failure")]
    Random,

    #[error("hash backend failure: {0}")]
    Backend(String),
}

/// Invalid encoder setup. Raised at construction time only.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum EncoderConfigError {
    #[error("id for encode cannot be empty")]
    EmptyIdForEncode,

    #[error("id for encode \"{0}\" is not found in the encoder map")]
    IdForEncodeNotMapped(String),

    #[error("prefix cannot be empty")]
    EmptyPrefix,

    #[error("suffix cannot be empty")]
    EmptySuffix,

    #[error("prefix and suffix must not overlap")]
    OverlappingDelimiters,

    #[error("encoder id \"{id}\" cannot contain \"{delimiter}\"")]
    IdContainsDelimiter { id: String, delimiter: String },

    #[error("invalid parameters: {0}")]
    InvalidParameters(String),
}

/// Fill `len` bytes from the OS random source.
pub(crate) fn random_bytes(len: usize) -> Result<Vec<u8>, EncoderError> {
    let mut bytes = vec![0u8; len];
    getrandom::fill(&mut bytes).map_err(|_| EncoderError::Random)?;
    Ok(bytes)
}
