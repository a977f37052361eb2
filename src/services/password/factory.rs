//! Factory: the standard encoder set keyed by id.
use std::collections::HashMap;
use std::sync::Arc;

use super::{
    Argon2PasswordEncoder, BcryptPasswordEncoder, DelegatingPasswordEncoder, EncoderConfigError,
    NoOpPasswordEncoder, PasswordEncoder, ScryptPasswordEncoder,
};

pub const ARGON2_ID: &str = "argon2";
pub const BCRYPT_ID: &str = "bcrypt";
pub const SCRYPT_ID: &str = "scrypt";
pub const NOOP_ID: &str = "noop";

pub fn default_encoders() -> Result<HashMap<String, Arc<dyn PasswordEncoder>>, EncoderConfigError> {
    let mut encoders: HashMap<String, Arc<dyn PasswordEncoder>> = HashMap::new();
    encoders.insert(ARGON2_ID.into(), Arc::new(Argon2PasswordEncoder::default()));
    encoders.insert(
        BCRYPT_ID.into(),
        Arc::new(BcryptPasswordEncoder::with_strength(
            super::bcrypt::DEFAULT_STRENGTH,
        )?),
    );
    encoders.insert(SCRYPT_ID.into(), Arc::new(ScryptPasswordEncoder::default()));
    encoders.insert(NOOP_ID.into(), Arc::new(NoOpPasswordEncoder));
    Ok(encoders)
}

/// Delegating encoder over [`default_encoders`] that encodes with `id_for_encode`.
pub fn create_delegating_password_encoder(
    id_for_encode: &str,
) -> Result<DelegatingPasswordEncoder, EncoderConfigError> {
    DelegatingPasswordEncoder::new(id_for_encode, default_encoders()?)
}
