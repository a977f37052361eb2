use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct MeResponse {
    pub principal: String,
    pub authorities: Vec<String>,
    /// Credential scheme the request authenticated with.
    pub via: String,
}
