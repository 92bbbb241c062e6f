//! CORS policy for the browser dashboard.
//!
//! The dashboard calls the gateway cross-origin with `Authorization: Bearer ...`
//! and `Content-Type: application/json`, so every `/api/...` call with a JSON
//! body is preceded by a preflight. Preflights are answered by this layer and
//! never reach the auth stage (an `OPTIONS` preflight carries no token).
//!
//! Policy:
//! - Development: any origin, WITHOUT credentials.
//! - Production: exact-match allowlist from `CORS_ALLOWED_ORIGINS`, WITHOUT credentials.
//!   An empty allowlist means no CORS headers at all.

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;

/// Reads (open to any role) followed by the role-gated mutations.
const PROXIED_METHODS: [Method; 6] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
];

const REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(60 * 10);

pub fn apply(router: Router, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods(PROXIED_METHODS)
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, REQUEST_ID])
        .expose_headers([REQUEST_ID])
        .max_age(PREFLIGHT_MAX_AGE);

    router.layer(cors)
}

fn allow_origin(config: &Config) -> AllowOrigin {
    if !config.app_env.is_production() {
        return AllowOrigin::from(Any);
    }

    let allowed: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|s| match HeaderValue::from_str(s) {
            // a wildcard would turn the allowlist back into `Any`
            Ok(v) if s != "*" => Some(v),
            _ => {
                tracing::warn!(origin = %s, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        tracing::warn!("CORS_ALLOWED_ORIGINS is empty; browser clients will be rejected");
    }

    AllowOrigin::list(allowed)
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use tower::ServiceExt;

    use super::*;

    fn config(pairs: &'static [(&'static str, &'static str)]) -> Config {
        Config::from_lookup(|key| {
            pairs
                .iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    // Stands in for the auth stage: anything that gets through is rejected.
    fn guarded(config: &Config) -> Router {
        apply(
            Router::new().fallback(|| async { StatusCode::UNAUTHORIZED }),
            config,
        )
    }

    fn preflight(origin: &str, method: &str) -> Request<Body> {
        Request::builder()
            .method(Method::OPTIONS)
            .uri("/api/order/orders/")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, method)
            .header(
                header::ACCESS_CONTROL_REQUEST_HEADERS,
                "authorization,content-type",
            )
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn preflight_is_answered_without_auth_in_development() {
        let response = guarded(&config(&[]))
            .oneshot(preflight("http://localhost:8080", "POST"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert_eq!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(), "*");

        let methods = headers
            .get(header::ACCESS_CONTROL_ALLOW_METHODS)
            .unwrap()
            .to_str()
            .unwrap();
        for method in ["GET", "HEAD", "POST", "PUT", "PATCH", "DELETE"] {
            assert!(methods.contains(method), "{method} missing from {methods}");
        }

        let allowed = headers
            .get(header::ACCESS_CONTROL_ALLOW_HEADERS)
            .unwrap()
            .to_str()
            .unwrap();
        assert!(allowed.contains("authorization"));
        assert!(allowed.contains("content-type"));
    }

    #[tokio::test]
    async fn production_only_echoes_listed_origins() {
        let config = config(&[
            ("APP_ENV", "production"),
            ("JWT_SECRET", "prod-secret"),
            ("CORS_ALLOWED_ORIGINS", "https://dashboard.example"),
        ]);

        let response = guarded(&config)
            .oneshot(preflight("https://dashboard.example", "DELETE"))
            .await
            .unwrap();
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://dashboard.example"
        );

        let response = guarded(&config)
            .oneshot(preflight("https://evil.example", "DELETE"))
            .await
            .unwrap();
        assert!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .is_none()
        );
    }

    #[tokio::test]
    async fn simple_requests_still_reach_the_inner_router() {
        let response = guarded(&config(&[]))
            .oneshot(
                Request::builder()
                    .method(Method::GET)
                    .uri("/api/order/orders/")
                    .header(header::ORIGIN, "http://localhost:8080")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "*"
        );
    }
}
