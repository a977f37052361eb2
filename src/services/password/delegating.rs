use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use super::{EncoderConfigError, EncoderError, PasswordEncoder, UnmappedIdPasswordEncoder};

pub const DEFAULT_ID_PREFIX: &str = "{";
pub const DEFAULT_ID_SUFFIX: &str = "}";

/// Id between `prefix` and the first `suffix` after it. The prefix has to be
/// the very first thing in `encoded`.
pub(crate) fn extract_id<'a>(encoded: &'a str, prefix: &str, suffix: &str) -> Option<&'a str> {
    let rest = encoded.strip_prefix(prefix)?;
    let end = rest.find(suffix)?;
    Some(&rest[..end])
}

/// Routes each stored hash to the encoder named by its `{id}` tag and encodes
/// new passwords with `id_for_encode`.
#[derive(Clone)]
pub struct DelegatingPasswordEncoder {
    id_for_encode: String,
    encoder_for_encode: Arc<dyn PasswordEncoder>,
    encoders: HashMap<String, Arc<dyn PasswordEncoder>>,
    default_for_matches: Arc<dyn PasswordEncoder>,
    prefix: String,
    suffix: String,
}

impl fmt::Debug for DelegatingPasswordEncoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut ids: Vec<_> = self.encoders.keys().collect();
        ids.sort();
        f.debug_struct("DelegatingPasswordEncoder")
            .field("id_for_encode", &self.id_for_encode)
            .field("ids", &ids)
            .finish()
    }
}

impl DelegatingPasswordEncoder {
    pub fn new(
        id_for_encode: &str,
        encoders: HashMap<String, Arc<dyn PasswordEncoder>>,
    ) -> Result<Self, EncoderConfigError> {
        Self::with_delimiters(id_for_encode, encoders, DEFAULT_ID_PREFIX, DEFAULT_ID_SUFFIX)
    }

    pub fn with_delimiters(
        id_for_encode: &str,
        encoders: HashMap<String, Arc<dyn PasswordEncoder>>,
        prefix: &str,
        suffix: &str,
    ) -> Result<Self, EncoderConfigError> {
        if id_for_encode.is_empty() {
            return Err(EncoderConfigError::EmptyIdForEncode);
        }
        if prefix.is_empty() {
            return Err(EncoderConfigError::EmptyPrefix);
        }
        if suffix.is_empty() {
            return Err(EncoderConfigError::EmptySuffix);
        }
        if prefix.contains(suffix) || suffix.contains(prefix) {
            return Err(EncoderConfigError::OverlappingDelimiters);
        }

        for id in encoders.keys() {
            for delimiter in [prefix, suffix] {
                if id.contains(delimiter) {
                    return Err(EncoderConfigError::IdContainsDelimiter {
                        id: id.clone(),
                        delimiter: delimiter.to_string(),
                    });
                }
            }
        }

        let encoder_for_encode = encoders
            .get(id_for_encode)
            .cloned()
            .ok_or_else(|| EncoderConfigError::IdForEncodeNotMapped(id_for_encode.to_string()))?;

        Ok(Self {
            id_for_encode: id_for_encode.to_string(),
            encoder_for_encode,
            encoders,
            default_for_matches: Arc::new(UnmappedIdPasswordEncoder::new(prefix, suffix)),
            prefix: prefix.to_string(),
            suffix: suffix.to_string(),
        })
    }

    /// Replace the verifier used for hashes whose id is missing or unknown.
    /// It receives the full encoded value, tag included.
    pub fn set_default_password_encoder_for_matches(&mut self, encoder: Arc<dyn PasswordEncoder>) {
        self.default_for_matches = encoder;
    }

    pub fn id_for_encode(&self) -> &str {
        &self.id_for_encode
    }

    pub fn extract_id<'a>(&self, encoded: &'a str) -> Option<&'a str> {
        extract_id(encoded, &self.prefix, &self.suffix)
    }

    fn extract_encoded_password<'a>(&self, encoded: &'a str) -> &'a str {
        match encoded.find(self.suffix.as_str()) {
            Some(start) => &encoded[start + self.suffix.len()..],
            None => encoded,
        }
    }
}

impl PasswordEncoder for DelegatingPasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, EncoderError> {
        let payload = self.encoder_for_encode.encode(raw)?;
        Ok(format!(
            "{}{}{}{}",
            self.prefix, self.id_for_encode, self.suffix, payload
        ))
    }

    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        // "no password set" on both sides
        if raw.is_empty() && encoded.is_empty() {
            return Ok(true);
        }

        let delegate = self
            .extract_id(encoded)
            .and_then(|id| self.encoders.get(id));

        match delegate {
            Some(encoder) => encoder.matches(raw, self.extract_encoded_password(encoded)),
            None => self.default_for_matches.matches(raw, encoded),
        }
    }

    fn upgrade_encoding(&self, encoded: &str) -> Result<bool, EncoderError> {
        let id = self.extract_id(encoded).unwrap_or_default();
        if !self.id_for_encode.eq_ignore_ascii_case(id) {
            return Ok(true);
        }

        match self.encoders.get(&self.id_for_encode) {
            Some(encoder) => encoder.upgrade_encoding(self.extract_encoded_password(encoded)),
            None => Ok(false),
        }
    }
}
