use serde::Deserialize;

/// Request body for `/token`.
///
/// A single endpoint branches by `grant_type`:
/// - `"password"` (or omitted): `username` + `password`
/// - `"refresh_token"`: `refresh_token`
#[derive(Clone, Deserialize)]
pub struct TokenRequest {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub refresh_token: Option<String>,
}

impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("grant_type", &self.grant_type)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}
