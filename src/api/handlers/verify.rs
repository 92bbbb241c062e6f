/*
 * Responsibility
 * - GET /auth/verify: bearer token を検証し、decode 済みの Identity を返す
 * - 検証自体は middleware::auth::access が担当
 */
use axum::Json;
use serde_json::{Value, json};

use crate::api::extractors::IdentityExtractor;

pub async fn verify(IdentityExtractor(identity): IdentityExtractor) -> Json<Value> {
    Json(json!({
        "valid": true,
        "user": identity,
    }))
}
