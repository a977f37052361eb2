use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use scrypt::Params;
use subtle::ConstantTimeEq;

use super::{EncoderConfigError, EncoderError, PasswordEncoder, random_bytes};

pub const DEFAULT_CPU_COST: u32 = 65536;
pub const DEFAULT_MEMORY_COST: u32 = 8;
pub const DEFAULT_PARALLELISM: u32 = 1;
pub const DEFAULT_KEY_LENGTH: usize = 32;
pub const DEFAULT_SALT_LENGTH: usize = 16;

/// scrypt with the parameters packed into the output:
/// `$<hex(log2(N) << 16 | r << 8 | p)>$<b64 salt>$<b64 key>`.
#[derive(Clone, Debug)]
pub struct ScryptPasswordEncoder {
    log_n: u8,
    r: u32,
    p: u32,
    key_length: usize,
    salt_length: usize,
}

#[derive(Debug, PartialEq, Eq)]
struct EncodedParts {
    log_n: u8,
    r: u32,
    p: u32,
    salt: Vec<u8>,
    key: Vec<u8>,
}

impl ScryptPasswordEncoder {
    pub fn new(
        cpu_cost: u32,
        memory_cost: u32,
        parallelism: u32,
        key_length: usize,
        salt_length: usize,
    ) -> Result<Self, EncoderConfigError> {
        if cpu_cost <= 1 || !cpu_cost.is_power_of_two() {
            return Err(EncoderConfigError::InvalidParameters(
                "scrypt cpu cost must be a power of 2 greater than 1".to_string(),
            ));
        }
        // The packed format keeps r and p in one byte each.
        if !(1..=255).contains(&memory_cost) || !(1..=255).contains(&parallelism) {
            return Err(EncoderConfigError::InvalidParameters(
                "scrypt memory cost and parallelism must be between 1 and 255".to_string(),
            ));
        }
        if key_length == 0 || salt_length == 0 {
            return Err(EncoderConfigError::InvalidParameters(
                "scrypt key and salt length must be positive".to_string(),
            ));
        }

        let log_n = cpu_cost.trailing_zeros() as u8;
        Params::new(log_n, memory_cost, parallelism, key_length)
            .map_err(|e| EncoderConfigError::InvalidParameters(format!("scrypt: {e}")))?;

        Ok(Self {
            log_n,
            r: memory_cost,
            p: parallelism,
            key_length,
            salt_length,
        })
    }

    fn derive(
        raw: &str,
        salt: &[u8],
        log_n: u8,
        r: u32,
        p: u32,
        len: usize,
    ) -> Result<Vec<u8>, EncoderError> {
        let params =
            Params::new(log_n, r, p, len).map_err(|e| EncoderError::Backend(e.to_string()))?;
        let mut out = vec![0u8; len];
        scrypt::scrypt(raw.as_bytes(), salt, &params, &mut out)
            .map_err(|e| EncoderError::Backend(e.to_string()))?;
        Ok(out)
    }

    fn decode(encoded: &str) -> Result<EncodedParts, EncoderError> {
        let mut parts = encoded.split('$');
        // Leading '$' yields an empty first field.
        if parts.next() != Some("") {
            return Err(EncoderError::Malformed("scrypt hash must start with '$'"));
        }
        let (Some(packed), Some(salt), Some(key), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(EncoderError::Malformed("scrypt hash must have three fields"));
        };

        let packed = u32::from_str_radix(packed, 16)
            .map_err(|_| EncoderError::Malformed("scrypt parameters are not hex"))?;
        let salt = STANDARD
            .decode(salt)
            .map_err(|_| EncoderError::Malformed("scrypt salt is not base64"))?;
        let key = STANDARD
            .decode(key)
            .map_err(|_| EncoderError::Malformed("scrypt key is not base64"))?;

        if key.is_empty() {
            return Err(EncoderError::Malformed("scrypt key is empty"));
        }

        Ok(EncodedParts {
            log_n: (packed >> 16) as u8,
            r: (packed >> 8) & 0xff,
            p: packed & 0xff,
            salt,
            key,
        })
    }
}

impl Default for ScryptPasswordEncoder {
    fn default() -> Self {
        Self {
            log_n: DEFAULT_CPU_COST.trailing_zeros() as u8,
            r: DEFAULT_MEMORY_COST,
            p: DEFAULT_PARALLELISM,
            key_length: DEFAULT_KEY_LENGTH,
            salt_length: DEFAULT_SALT_LENGTH,
        }
    }
}

impl PasswordEncoder for ScryptPasswordEncoder {
    fn encode(&self, raw: &str) -> Result<String, EncoderError> {
        let salt = random_bytes(self.salt_length)?;
        let key = Self::derive(raw, &salt, self.log_n, self.r, self.p, self.key_length)?;

        let packed = (u32::from(self.log_n) << 16) | (self.r << 8) | self.p;
        Ok(format!(
            "${:x}${}${}",
            packed,
            STANDARD.encode(&salt),
            STANDARD.encode(&key)
        ))
    }

    fn matches(&self, raw: &str, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Err(EncoderError::EmptyEncodedPassword);
        }
        let parts = Self::decode(encoded)?;
        let derived = Self::derive(raw, &parts.salt, parts.log_n, parts.r, parts.p, parts.key.len())?;

        Ok(derived.ct_eq(&parts.key).into())
    }

    fn upgrade_encoding(&self, encoded: &str) -> Result<bool, EncoderError> {
        if encoded.is_empty() {
            return Ok(false);
        }
        let parts = Self::decode(encoded)?;

        Ok(parts.log_n < self.log_n || parts.r < self.r || parts.p < self.p)
    }
}
