/*
 * Responsibility
 * - GET /health (疎通用, backend には問い合わせない shallow check)
 * - GET / (起動確認用の banner)
 */
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde_json::json;

use crate::state::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        Json(json!({
            "status": "OK",
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "services": state.routes.service_names(),
        })),
    )
}

pub async fn root() -> &'static str {
    "API Gateway is running"
}
