use argon2::password_hash::errors::Error as PasswordHashError;
use argon2::password_hash::{PasswordHash, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHasher, PasswordVerifier, Version};

use super::{EncoderConfigError, EncoderError, PasswordEncoder, random_bytes};

pub const DEFAULT_SALT_LENGTH: usize = 16;
pub const DEFAULT_HASH_LENGTH: usize = 32;
pub const DEFAULT_PARALLELISM: u32 = 1;
pub const DEFAULT_MEMORY_KIB: u32 = 1 << 14;
pub const DEFAULT_ITERATIONS: u32 = 2;

// SaltString keeps at most 64 B64 chars.
const MAX_SALT_LENGTH: usize = 48;
const MIN_SALT_LENGTH: usize = 8;

/// Argon2id in PHC string format:
/// `$argon2id$v=19$m=16384,t=2,p=1$<salt>$<hash>`.
///
/// Verification reads the algorithm, version and cost parameters back out of
/// the encoded string, so hashes produced with other settings still verify.
#[derive(Clone, Debug)]
pub struct Argon2PasswordEncoder {
    salt_length: usize,
    params: Params,
}

impl Argon2PasswordEncoder {
    pub fn new(
        salt_length: usize,
        hash_length: usize,
        parallelism: u32,
        memory_kib: u32,
        iterations: u32,
    ) -> Result<Self, EncoderConfigError> {
        if !(MIN_SALT_LENGTH..=MAX_SALT_LENGTH).contains(&salt_length) {
            return Err(EncoderConfigError::InvalidParameters(format!(
                "argon2 salt length must be between {MIN_SALT_LENGTH} and {MAX_SALT_LENGTH}"
            )));
        }
        let params = Params::new(memory_kib, iterations, parallelism, Some(hash_length))
            .map_err(|e| EncoderConfigError::InvalidParameters(format!("argon2: {e}")))?;

        Ok(Self {
            salt_length,
            params,
        })
    }

    fn hasher(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

impl Default for Argon2PasswordEncoder {
    fn default() -> Self {
        let params = Params::new(
            DEFAULT_MEMORY_KIB,
            DEFAULT_ITERATIONS,
            DEFAULT_PARALLELISM,
            Some(DEFAULT_HASH_LENGTH),
        )
        .unwrap_or_default();

        Self {
            salt_length: DEFAULT_SALT_LENGTH,
            params,
        }
    }
}

impl PasswordEncoder for Argon2PasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, EncoderError> {
        let salt_bytes = random_bytes(self.salt_length)?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(|e| EncoderError::Backend(e.to_string()))?;

        let hash = self
            .hasher()
            .hash_password(raw.as_bytes(), &salt)
            .map_err(|e| EncoderError::Backend(e.to_string()))?;

        Ok(hash.to_string())
    }

    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Err(EncoderError::EmptyEncodedPassword);
        }
        let parsed =
            PasswordHash::new(encoded).map_err(|_| EncoderError::Malformed("not an argon2 hash"))?;
        if parsed.salt.is_none() || parsed.hash.is_none() {
            return Err(EncoderError::Malformed("argon2 hash is missing salt or digest"));
        }

        // Output comparison inside verify_password is constant time.
        match Argon2::default().verify_password(raw.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(e) => Err(EncoderError::Backend(e.to_string())),
        }
    }

    fn upgrade_encoding(&self, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Ok(false);
        }
        let parsed =
            PasswordHash::new(encoded).map_err(|_| EncoderError::Malformed("not an argon2 hash"))?;

        let m = parsed.params.get_decimal("m").unwrap_or(0);
        let t = parsed.params.get_decimal("t").unwrap_or(0);
        let p = parsed.params.get_decimal("p").unwrap_or(0);

        Ok(m < self.params.m_cost() || t < self.params.t_cost() || p < self.params.p_cost())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PASSWORD: &str = "password";

    #[test]
    fn encode_uses_phc_format_with_default_parameters() {
        let encoder = Argon2PasswordEncoder::default();
        let encoded = encoder.encode(PASSWORD).unwrap();

        assert!(encoded.starts_with("$argon2id$v=19$m=16384,t=2,p=1$"));
    }

    #[test]
    fn matches_only_the_original_password() {
        let encoder = Argon2PasswordEncoder::default();
        let encoded = encoder.encode(PASSWORD).unwrap();

        assert!(encoder.matches(PASSWORD, &encoded).unwrap());
        assert!(!encoder.matches("wrong", &encoded).unwrap());
    }

    #[test]
    fn salts_are_never_reused() {
        let encoder = Argon2PasswordEncoder::default();
        let a = encoder.encode(PASSWORD).unwrap();
        let b = encoder.encode(PASSWORD).unwrap();

        assert_ne!(a, b);
    }

    #[test]
    fn empty_encoded_is_an_error() {
        let encoder = Argon2PasswordEncoder::default();
        assert!(matches!(
            encoder.matches(PASSWORD, ""),
            Err(EncoderError::EmptyEncodedPassword)
        ));
    }

    #[test]
    fn garbage_encoded_is_malformed() {
        let encoder = Argon2PasswordEncoder::default();
        assert!(matches!(
            encoder.matches(PASSWORD, "not-a-hash"),
            Err(EncoderError::Malformed(_))
        ));
    }

    #[test]
    fn weaker_hashes_need_upgrade() {
        let weak = Argon2PasswordEncoder::new(16, 32, 1, 4096, 1).unwrap();
        let encoded = weak.encode(PASSWORD).unwrap();
        let current = Argon2PasswordEncoder::default();

        assert!(current.upgrade_encoding(&encoded).unwrap());
        assert!(current.matches(PASSWORD, &encoded).unwrap());

        let fresh = current.encode(PASSWORD).unwrap();
        assert!(!current.upgrade_encoding(&fresh).unwrap());
    }

    #[test]
    fn rejects_out_of_range_salt_length() {
        assert!(Argon2PasswordEncoder::new(2, 32, 1, 4096, 1).is_err());
    }
}
