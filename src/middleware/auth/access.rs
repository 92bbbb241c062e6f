//! Bearer token 検証 → Identity を extensions に入れる
//!
//! - `authenticate` は pipeline の 1 stage (Identity か terminal error を返す純粋関数)
//! - `apply` は同じ stage を axum middleware として route に掛ける (/auth/verify 用)
//! - 署名/exp 検証は TokenVerifier 側で実施

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::error::AppError;
use crate::services::auth::{Identity, TokenVerifier};
use crate::state::AppState;

/// 認証が必要な route に middleware を適用する。
///
/// 例：
/// ```ignore
/// let verify = Router::new().route("/auth/verify", get(verify));
/// let verify = middleware::auth::access::apply(verify, state.clone());
/// ```
pub fn apply(router: Router<AppState>, state: AppState) -> Router<AppState> {
    // axum 0.8 の from_fn は State extractor を受け取れないため、`from_fn_with_state` で明示的に state を渡す
    router.route_layer(middleware::from_fn_with_state(state, access_middleware))
}

async fn access_middleware(
    State(state): State<AppState>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let identity = authenticate(&state.verifier, req.headers())?;

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(identity);

    Ok(next.run(req).await)
}

/// `Authorization: Bearer <token>` を検証して Identity を返す。
///
/// - header 無し / Bearer でない / token が空 → 401
/// - 署名不正・期限切れ・refresh token → 403
pub fn authenticate(verifier: &TokenVerifier, headers: &HeaderMap) -> Result<Identity, AppError> {
    let token = bearer_token(headers).ok_or(AppError::Unauthenticated)?;

    match verifier.verify(token) {
        Ok(identity) => Ok(identity),
        Err(err) => {
            tracing::warn!(
                error = %err,
                "access token verification failed"
            );
            Err(AppError::InvalidToken)
        }
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.trim().split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn with_auth(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn bearer_token_parsing() {
        assert_eq!(bearer_token(&with_auth("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(&with_auth("bearer   abc")), Some("abc"));
        assert_eq!(bearer_token(&with_auth("Bearer ")), None);
        assert_eq!(bearer_token(&with_auth("Basic dXNlcjpwYXNz")), None);
        assert_eq!(bearer_token(&with_auth("abc")), None);
        assert_eq!(bearer_token(&HeaderMap::new()), None);
    }

    #[test]
    fn missing_token_is_unauthenticated_and_bad_token_is_invalid() {
        let verifier = TokenVerifier::new("secret", 0);

        assert!(matches!(
            authenticate(&verifier, &HeaderMap::new()),
            Err(AppError::Unauthenticated)
        ));
        assert!(matches!(
            authenticate(&verifier, &with_auth("Bearer not-a-token")),
            Err(AppError::InvalidToken)
        ));
    }
}
