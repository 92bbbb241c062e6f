//! Shared helpers for gateway integration tests.

#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use axum::{
    Json, Router,
    body::{Body, Bytes},
    http::{HeaderMap, Method, Request, StatusCode, Uri, header},
    response::IntoResponse,
};
use food_gateway::{app::build_router, config::Config, state::AppState};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::net::TcpListener;

pub const TEST_SECRET: &str = "integration-test-secret";

/// Address nothing listens on; connecting is refused immediately.
pub const DEAD_BACKEND: &str = "http://127.0.0.1:1";

pub const RAW_BODY: &[u8] = b"{ \"success\" : true,\n  \"data\": [ {\"id\":1} ] }";

/// Backend base URLs keyed by resource name (`user`, `restaurant`, `order`, `payment`).
pub fn config_with(backends: &[(&str, String)], proxy_timeout: Duration) -> Config {
    let mut env: HashMap<String, String> = HashMap::new();
    env.insert("JWT_SECRET".into(), TEST_SECRET.into());
    for name in ["user", "restaurant", "order", "payment"] {
        env.insert(
            format!("{}_SERVICE_URL", name.to_uppercase()),
            DEAD_BACKEND.into(),
        );
    }
    for (name, url) in backends {
        env.insert(format!("{}_SERVICE_URL", name.to_uppercase()), url.clone());
    }

    let mut config = Config::from_lookup(|key| env.get(key).cloned()).unwrap();
    config.proxy_timeout = proxy_timeout;
    config
}

pub fn gateway(config: &Config) -> Router {
    let state = AppState::from_config(config).unwrap();
    build_router(state, config)
}

pub fn mint(claims: Value) -> String {
    jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(TEST_SECRET.as_bytes()),
    )
    .unwrap()
}

pub fn token_for(id: i64, username: &str, role: &str) -> String {
    mint(json!({
        "id": id,
        "username": username,
        "role": role,
        "exp": chrono::Utc::now().timestamp() + 3600,
        "type": "access",
    }))
}

pub fn request(
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::to_vec(&body).unwrap()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1024 * 1024)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

pub async fn spawn(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr: SocketAddr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

/// Backend that describes the request it received.
///
/// `/raw` answers with a fixed, oddly formatted body; `/missing` answers 404.
pub async fn spawn_echo_backend() -> String {
    let router = Router::new()
        .route(
            "/raw",
            axum::routing::get(|| async {
                (
                    StatusCode::OK,
                    [
                        (header::CONTENT_TYPE, "application/json"),
                        (header::HeaderName::from_static("x-backend"), "order"),
                    ],
                    Bytes::from_static(RAW_BODY),
                )
            }),
        )
        .route(
            "/missing",
            axum::routing::get(|| async {
                (StatusCode::NOT_FOUND, Json(json!({ "error": "Order not found" })))
            }),
        )
        .fallback(echo);

    spawn(router).await
}

async fn echo(method: Method, uri: Uri, headers: HeaderMap, body: Bytes) -> impl IntoResponse {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
    };
    let body: Value = if body.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&body)
            .unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&body).into()))
    };

    Json(json!({
        "method": method.as_str(),
        "path": uri.path(),
        "query": uri.query(),
        "content_type": header("content-type"),
        "user_id": header("x-user-id"),
        "user_role": header("x-user-role"),
        "user_username": header("x-user-username"),
        "body": body,
    }))
}

/// Backend that never answers within any reasonable test timeout.
pub async fn spawn_hanging_backend() -> String {
    let router = Router::new().fallback(|| async {
        tokio::time::sleep(Duration::from_secs(30)).await;
        StatusCode::OK
    });

    spawn(router).await
}
