//! One-time tokens: issuance and single-use consumption.

pub mod service;
pub mod token;

pub use service::{InMemoryOneTimeTokenService, OneTimeTokenService};
pub use token::{GenerateOneTimeTokenRequest, OneTimeToken, OneTimeTokenError};
