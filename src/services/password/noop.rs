use subtle::ConstantTimeEq;

use super::{EncoderError, PasswordEncoder};

/// Stores the raw password as is. Only meant for tests and legacy data.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpPasswordEncoder;

impl PasswordEncoder for NoOpPasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, EncoderError> {
        Ok(raw.to_string())
    }

    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Err(EncoderError::EmptyEncodedPassword);
        }
        Ok(raw.as_bytes().ct_eq(encoded.as_bytes()).into())
    }
}
