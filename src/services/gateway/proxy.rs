//! Upstream dispatch: request rewrite → backend call → response relay.
//!
//! Hook points:
//! - `before_send`: outbound headers (hop-by-hop removal, identity injection)
//! - `on_failure`: reqwest error → client-facing `AppError`
//!
//! Dropping the future returned by `ProxyClient::forward` (client disconnect)
//! abandons the in-flight upstream call.

use std::error::Error as StdError;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, header},
    response::Response,
};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use url::Url;

use crate::error::AppError;
use crate::services::auth::Identity;
use crate::services::gateway::routes::Target;

pub const USER_ID_HEADER: HeaderName = HeaderName::from_static("x-user-id");
pub const USER_ROLE_HEADER: HeaderName = HeaderName::from_static("x-user-role");
pub const USER_USERNAME_HEADER: HeaderName = HeaderName::from_static("x-user-username");

const HOP_BY_HOP: [HeaderName; 8] = [
    header::CONNECTION,
    HeaderName::from_static("keep-alive"),
    header::PROXY_AUTHENTICATE,
    header::PROXY_AUTHORIZATION,
    header::TE,
    header::TRAILER,
    header::TRANSFER_ENCODING,
    header::UPGRADE,
];

#[derive(Debug)]
enum OutboundBody {
    Empty,
    Json(Vec<u8>),
    Raw(Bytes),
}

/// Shared HTTP client for all backends. Cheap to clone.
#[derive(Clone, Debug)]
pub struct ProxyClient {
    client: reqwest::Client,
    body_limit: usize,
}

impl ProxyClient {
    pub fn new(timeout: Duration, body_limit: usize) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .connect_timeout(timeout)
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()?;

        Ok(Self { client, body_limit })
    }

    pub async fn forward(
        &self,
        target: &Target<'_>,
        identity: Option<&Identity>,
        req: Request<Body>,
    ) -> Result<Response, AppError> {
        let service = target.entry.name;
        let (parts, body) = req.into_parts();
        let url = target
            .entry
            .upstream_url(&target.path, parts.uri.query())
            .ok_or_else(|| {
                tracing::warn!(service, path = %target.path, "upstream url escapes route scope");
                AppError::BadRequest("Invalid request path")
            })?;

        let bytes = Limited::new(body, self.body_limit)
            .collect()
            .await
            .map(|collected| collected.to_bytes())
            .map_err(|err| {
                tracing::warn!(error = %err, service, "failed to read request body");
                if exceeds_limit(err.as_ref()) {
                    AppError::PayloadTooLarge
                } else {
                    AppError::BadRequest("Unable to read request body")
                }
            })?;

        let body = encode_body(&parts.method, &parts.headers, bytes)?;
        let headers = before_send(&parts.headers, identity, &body)?;

        let mut outbound = self
            .client
            .request(parts.method.clone(), url.clone())
            .headers(headers);
        outbound = match body {
            OutboundBody::Empty => outbound,
            OutboundBody::Json(json) => outbound.body(json),
            OutboundBody::Raw(raw) => outbound.body(raw),
        };

        let started = Instant::now();
        let upstream = outbound
            .send()
            .await
            .map_err(|err| on_failure(service, &url, err))?;

        let status = upstream.status();
        let headers = response_headers(upstream.headers());
        let bytes = upstream
            .bytes()
            .await
            .map_err(|err| on_failure(service, &url, err))?;

        tracing::debug!(
            service,
            method = %parts.method,
            upstream = %url,
            status = status.as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "upstream responded"
        );

        let mut response = Response::new(Body::from(bytes));
        *response.status_mut() = status;
        *response.headers_mut() = headers;
        Ok(response)
    }
}

/// Limit errors can surface from our own `Limited` or from the outer
/// `RequestBodyLimitLayer`, wrapped in `axum::Error`.
fn exceeds_limit(err: &(dyn StdError + 'static)) -> bool {
    std::iter::successors(Some(err), |e| (*e).source()).any(|e| e.is::<LengthLimitError>())
}

/// Parsed JSON bodies of POST/PUT/PATCH are re-encoded; anything else is passed through.
fn encode_body(
    method: &Method,
    headers: &HeaderMap,
    bytes: Bytes,
) -> Result<OutboundBody, AppError> {
    if bytes.is_empty() {
        return Ok(OutboundBody::Empty);
    }

    let carries_json = matches!(*method, Method::POST | Method::PUT | Method::PATCH)
        && is_json_content(headers);
    if !carries_json {
        return Ok(OutboundBody::Raw(bytes));
    }

    let value: serde_json::Value =
        serde_json::from_slice(&bytes).map_err(|_| AppError::BadRequest("Invalid JSON body"))?;
    let json = serde_json::to_vec(&value).map_err(|err| {
        tracing::error!(error = %err, "failed to re-encode JSON body");
        AppError::Internal
    })?;

    Ok(OutboundBody::Json(json))
}

fn is_json_content(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| {
            let essence = v.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
            essence == "application/json" || essence.ends_with("+json")
        })
        .unwrap_or(false)
}

fn is_identity_header(name: &HeaderName) -> bool {
    *name == USER_ID_HEADER || *name == USER_ROLE_HEADER || *name == USER_USERNAME_HEADER
}

fn before_send(
    inbound: &HeaderMap,
    identity: Option<&Identity>,
    body: &OutboundBody,
) -> Result<HeaderMap, AppError> {
    let mut headers = HeaderMap::with_capacity(inbound.len() + 3);

    for (name, value) in inbound {
        if HOP_BY_HOP.contains(name)
            || *name == header::HOST
            || *name == header::CONTENT_LENGTH
            // clients must not be able to assert their own identity
            || is_identity_header(name)
        {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }

    if let OutboundBody::Json(_) = body {
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    if let Some(identity) = identity {
        let values = [
            (USER_ID_HEADER, identity.id.to_string()),
            (USER_ROLE_HEADER, identity.role.clone()),
            (USER_USERNAME_HEADER, identity.username.clone()),
        ];
        for (name, value) in values {
            let value = HeaderValue::from_str(&value).map_err(|_| {
                tracing::warn!(header = %name, "identity claim is not a valid header value");
                AppError::InvalidToken
            })?;
            headers.insert(name, value);
        }
    }

    Ok(headers)
}

fn response_headers(upstream: &HeaderMap) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(upstream.len());
    for (name, value) in upstream {
        if HOP_BY_HOP.contains(name) || *name == header::CONTENT_LENGTH {
            continue;
        }
        headers.append(name.clone(), value.clone());
    }
    headers
}

fn on_failure(service: &'static str, url: &Url, err: reqwest::Error) -> AppError {
    if err.is_timeout() {
        tracing::warn!(service, upstream = %url, error = %err, "upstream timed out");
        AppError::BackendTimeout { service }
    } else if err.is_connect() {
        tracing::warn!(service, upstream = %url, error = %err, "upstream unreachable");
        AppError::BackendUnreachable { service }
    } else {
        tracing::error!(service, upstream = %url, error = ?err, "proxy error");
        AppError::InternalProxy { service }
    }
}
