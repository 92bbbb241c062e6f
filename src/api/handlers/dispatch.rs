/*
 * Responsibility
 * - route table に載っている prefix への全リクエストの入口 (Router の fallback)
 * - pipeline: resolve → (public なら素通し | authenticate → authorize) → forward
 * - public でない path は route が無くても先に認証する (/api/... は token 無しなら常に 401)
 * - dot segment を含む path は resolve 前に 400 (prefix 判定と upstream URL の正規化がずれるため)
 */
use axum::{
    body::Body,
    extract::State,
    http::Request,
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::authenticate;
use crate::services::gateway::{Access, is_traversal};
use crate::state::AppState;

pub async fn dispatch(
    State(state): State<AppState>,
    req: Request<Body>,
) -> Result<Response, AppError> {
    let path = req.uri().path().to_owned();
    if is_traversal(&path) {
        tracing::warn!(path = %path, "rejecting path with dot segments");
        return Err(AppError::BadRequest("Invalid request path"));
    }

    let target = state.routes.resolve(&path);

    if let Some(target) = target.as_ref().filter(|t| t.entry.is_public()) {
        tracing::debug!(service = target.entry.name, path = %path, "relaying public request");
        return state.proxy.forward(target, None, req).await;
    }

    let identity = authenticate(&state.verifier, req.headers())?;
    let target = target.ok_or(AppError::NotFound)?;

    if let Access::Protected(policy) = &target.entry.access {
        policy.authorize(req.method(), &path, &identity)?;
    }

    tracing::debug!(
        service = target.entry.name,
        user_id = %identity.id,
        role = %identity.role,
        upstream_path = %target.path,
        "dispatching request"
    );

    state.proxy.forward(&target, Some(&identity), req).await
}
