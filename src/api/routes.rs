/*
 * Responsibility
 * - ゲートウェイの URL 構造を定義
 * - /, /health は認証なし, /auth/verify は bearer 必須
 * - それ以外 (/auth/..., /api/{resource}/...) は fallback の dispatch が route table で振り分ける
 */
use axum::{Router, routing::get};

use crate::api::handlers::{
    dispatch::dispatch,
    health::{health, root},
    verify::verify,
};
use crate::middleware::auth::access;
use crate::state::AppState;

pub fn routes(state: AppState) -> Router<AppState> {
    let verify = access::apply(Router::new().route("/auth/verify", get(verify)), state);

    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .merge(verify)
        .fallback(dispatch)
}
