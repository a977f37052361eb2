use axum::Json;

use crate::api::v1::dto::me_response::MeResponse;
use crate::api::v1::extractors::CurrentAuthentication;

pub async fn me(CurrentAuthentication(auth): CurrentAuthentication) -> Json<MeResponse> {
    Json(MeResponse {
        principal: auth.principal().to_string(),
        authorities: auth.authorities().iter().cloned().collect(),
        via: auth.kind().to_string(),
    })
}
