use super::delegating::extract_id;
use super::{EncoderError, PasswordEncoder};

/// Fallback used by [`super::DelegatingPasswordEncoder`] when a stored hash
/// carries an id nobody registered. It never reports a match.
#[derive(Clone, Debug)]
pub struct UnmappedIdPasswordEncoder {
    prefix: String,
    suffix: String,
}

impl UnmappedIdPasswordEncoder {
    pub fn new(prefix: impl Into<String>, suffix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            suffix: suffix.into(),
        }
    }
}

impl PasswordEncoder for UnmappedIdPasswordEncoder {
    fn encode(&self, _raw: &str) -> Result<String, EncoderError> {
        Err(EncoderError::EncodeNotSupported)
    }

    fn matches(&self, _raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        let id = extract_id(encoded, &self.prefix, &self.suffix).unwrap_or_default();
        Err(EncoderError::UnmappedId(id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_the_unknown_id_without_the_hash() {
        let e = UnmappedIdPasswordEncoder::new("{", "}");
        match e.matches("password", "{md4}abcdef") {
            Err(EncoderError::UnmappedId(id)) => assert_eq!(id, "md4"),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            e.matches("password", "plain"),
            Err(EncoderError::UnmappedId(id)) if id.is_empty()
        ));
    }
}
