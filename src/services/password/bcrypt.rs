use regex::Regex;

use super::{EncoderConfigError, EncoderError, PasswordEncoder, random_bytes};

pub const DEFAULT_STRENGTH: u32 = 10;
pub const MIN_STRENGTH: u32 = 4;
pub const MAX_STRENGTH: u32 = 31;

const BCRYPT_PATTERN: &str = r"\A\$2(a|y|b)?\$(\d\d)\$[./0-9A-Za-z]{53}";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum BcryptVersion {
    TwoA,
    TwoY,
    #[default]
    TwoB,
}

impl From<BcryptVersion> for bcrypt::Version {
    fn from(v: BcryptVersion) -> Self {
        match v {
            BcryptVersion::TwoA => bcrypt::Version::TwoA,
            BcryptVersion::TwoY => bcrypt::Version::TwoY,
            BcryptVersion::TwoB => bcrypt::Version::TwoB,
        }
    }
}

/// bcrypt in modular crypt format (`$2b$10$<22 salt chars><31 hash chars>`).
#[derive(Clone, Debug)]
pub struct BcryptPasswordEncoder {
    version: BcryptVersion,
    strength: u32,
    pattern: Regex,
}

impl BcryptPasswordEncoder {
    pub fn new(version: BcryptVersion, strength: u32) -> Result<Self, EncoderConfigError> {
        if !(MIN_STRENGTH..=MAX_STRENGTH).contains(&strength) {
            return Err(EncoderConfigError::InvalidParameters(format!(
                "bcrypt strength must be between {MIN_STRENGTH} and {MAX_STRENGTH}"
            )));
        }
        let pattern = Regex::new(BCRYPT_PATTERN)
            .map_err(|e| EncoderConfigError::InvalidParameters(e.to_string()))?;

        Ok(Self {
            version,
            strength,
            pattern,
        })
    }

    pub fn with_strength(strength: u32) -> Result<Self, EncoderConfigError> {
        Self::new(BcryptVersion::default(), strength)
    }

    pub fn strength(&self) -> u32 {
        self.strength
    }
}

impl PasswordEncoder for BcryptPasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, EncoderError> {
        if raw.is_empty() {
            return Err(EncoderError::EmptyRawPassword);
        }
        let mut salt = [0u8; 16];
        salt.copy_from_slice(&random_bytes(16)?);

        let parts = bcrypt::hash_with_salt(raw, self.strength, salt)
            .map_err(|e| EncoderError::Backend(e.to_string()))?;

        Ok(parts.format_for_version(self.version.into()))
    }

    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Err(EncoderError::EmptyEncodedPassword);
        }
        if !self.pattern.is_match(encoded) {
            return Err(EncoderError::Malformed("encoded password does not look like bcrypt"));
        }

        // bcrypt::verify compares the digests with subtle::ConstantTimeEq.
        bcrypt::verify(raw, encoded).map_err(|e| EncoderError::Backend(e.to_string()))
    }

    fn upgrade_encoding(&self, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Ok(false);
        }
        let caps = self
            .pattern
            .captures(encoded)
            .ok_or(EncoderError::Malformed("encoded password does not look like bcrypt"))?;

        let cost: u32 = caps
            .get(2)
            .and_then(|m| m.as_str().parse().ok())
            .ok_or(EncoderError::Malformed("bcrypt cost is not a number"))?;

        Ok(cost < self.strength)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn encoder(strength: u32) -> BcryptPasswordEncoder {
        BcryptPasswordEncoder::with_strength(strength).unwrap()
    }

    #[test]
    fn round_trip() {
        let e = encoder(4);
        let encoded = e.encode("password").unwrap();

        assert!(encoded.starts_with("$2b$04$"));
        assert!(e.matches("password", &encoded).unwrap());
        assert!(!e.matches("wrong", &encoded).unwrap());
    }

    #[test]
    fn version_is_reflected_in_output() {
        let e = BcryptPasswordEncoder::new(BcryptVersion::TwoY, 4).unwrap();
        assert!(e.encode("password").unwrap().starts_with("$2y$04$"));
    }

    #[test]
    fn strength_must_be_in_range() {
        assert!(BcryptPasswordEncoder::with_strength(3).is_err());
        assert!(BcryptPasswordEncoder::with_strength(32).is_err());
    }

    #[test]
    fn empty_inputs_are_errors() {
        let e = encoder(4);
        assert!(matches!(e.encode(""), Err(EncoderError::EmptyRawPassword)));
        assert!(matches!(
            e.matches("password", ""),
            Err(EncoderError::EmptyEncodedPassword)
        ));
    }

    #[test]
    fn non_bcrypt_input_is_malformed() {
        let e = encoder(4);
        assert!(matches!(
            e.matches("password", "$argon2id$v=19$m=16,t=2,p=1$abc$def"),
            Err(EncoderError::Malformed(_))
        ));
    }

    #[test]
    fn lower_cost_needs_upgrade() {
        let encoded = encoder(4).encode("password").unwrap();

        assert!(encoder(5).upgrade_encoding(&encoded).unwrap());
        assert!(!encoder(4).upgrade_encoding(&encoded).unwrap());
    }
}
