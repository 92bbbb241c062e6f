/*
 * Responsibility
 * - ゲートウェイ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body)
 * - transport error / token error を client 向けの安定した形へ変換する唯一の場所
 */
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Access denied. No token provided.")]
    Unauthenticated,

    #[error("Invalid or expired token.")]
    InvalidToken,

    #[error("Access denied. Insufficient permissions.")]
    Forbidden {
        operation: String,
        role: String,
        required: String,
    },

    #[error("{0}")]
    BadRequest(&'static str),

    #[error("Route not found")]
    NotFound,

    #[error("Request body too large")]
    PayloadTooLarge,

    #[error("Gateway Timeout: {service} service did not respond")]
    BackendTimeout { service: &'static str },

    #[error("Gateway Timeout: {service} service is unreachable")]
    BackendUnreachable { service: &'static str },

    #[error("Gateway Timeout: request took too long")]
    Timeout,

    #[error("Proxy error")]
    InternalProxy { service: &'static str },

    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AppError::InvalidToken | AppError::Forbidden { .. } => StatusCode::FORBIDDEN,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            AppError::BackendTimeout { .. }
            | AppError::BackendUnreachable { .. }
            | AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::InternalProxy { .. } | AppError::Internal => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = self.to_string();

        let body = match self {
            AppError::Forbidden {
                operation,
                role,
                required,
            } => json!({
                "error": error,
                "operation": operation,
                "your_role": role,
                "required_role": required,
            }),
            AppError::BackendTimeout { .. }
            | AppError::BackendUnreachable { .. }
            | AppError::Timeout => json!({ "success": false, "error": error }),
            AppError::InternalProxy { service } => json!({
                "error": error,
                "message": format!("Failed to forward request to {service} service"),
            }),
            AppError::Internal => json!({
                "error": error,
                "message": "unexpected gateway failure",
            }),
            _ => json!({ "error": error }),
        };

        (status, Json(body)).into_response()
    }
}
