use axum::{
    async_trait,
    body::Body,
    extract::{ConnectInfo, FromRequestParts, MatchedPath, State},
    http::{HeaderMap, HeaderName, HeaderValue, Request, header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};
use governor::middleware::NoOpMiddleware;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_governor::key_extractor::SmartIpKeyExtractor;
use tower_http::classify::{ServerErrorsAsFailures, SharedClassifier};
use tower_http::request_id::{
    MakeRequestId, PropagateRequestIdLayer, RequestId, SetRequestIdLayer,
};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::{MakeSpan, TraceLayer};
use tracing::{Span, info_span};
use uuid::Uuid;

use promptboard_domain::util::hash_client_ip;

use crate::error::ApiError;
use crate::observability;
use crate::state::AppState;

pub const EDIT_TOKENS_COOKIE: &str = "pb_edit_tokens";
pub const UPVOTES_COOKIE: &str = "pb_upvotes";

const COOKIE_MAX_AGE_SECS: u64 = 60 * 60 * 24 * 365;
const COOKIE_LIST_SEPARATOR: char = '.';
/// Oldest entries fall off so the cookie stays under browser size limits.
const COOKIE_LIST_MAX_ENTRIES: usize = 100;
const FALLBACK_CLIENT_IP: &str = "127.0.0.1";

#[derive(Clone)]
pub struct UuidRequestId;

impl MakeRequestId for UuidRequestId {
    fn make_request_id<B>(&mut self, _request: &Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        let value = HeaderValue::from_str(&id).ok()?;
        Some(RequestId::new(value))
    }
}

pub fn trace_layer() -> TraceLayer<SharedClassifier<ServerErrorsAsFailures>, RequestSpan> {
    TraceLayer::new_for_http().make_span_with(RequestSpan)
}

#[derive(Clone, Default)]
pub(crate) struct RequestSpan;

impl<B> MakeSpan<B> for RequestSpan {
    fn make_span(&mut self, req: &Request<B>) -> Span {
        let request_id_header = HeaderName::from_static("x-request-id");
        let request_id = req
            .headers()
            .get(&request_id_header)
            .and_then(|value| value.to_str().ok())
            .unwrap_or("-");
        info_span!(
            "http_request",
            method = %req.method(),
            uri = %req.uri(),
            request_id = %request_id
        )
    }
}

pub fn set_request_id_layer() -> SetRequestIdLayer<UuidRequestId> {
    SetRequestIdLayer::x_request_id(UuidRequestId)
}

pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::x_request_id()
}

pub fn timeout_layer() -> TimeoutLayer {
    TimeoutLayer::new(Duration::from_secs(30))
}

pub type RateLimitLayer = GovernorLayer<SmartIpKeyExtractor, NoOpMiddleware>;

/// Per-client token bucket keyed the same way as [`client_ip`]: two requests
/// per second sustained, bursts of sixty.
pub fn rate_limit_layer() -> Option<RateLimitLayer> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(SmartIpKeyExtractor)
        .per_millisecond(500)
        .burst_size(60)
        .finish();
    if config.is_none() {
        tracing::error!("rate limit config builder produced invalid values; rate limiting off");
    }
    config.map(|config| GovernorLayer {
        config: Arc::new(config),
    })
}

pub async fn metrics_layer(req: Request<Body>, next: Next) -> Response {
    let start = std::time::Instant::now();
    let method = req.method().as_str().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| matched.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let response = next.run(req).await;
    let status = response.status();
    observability::register_http_request(&method, &route, status, start.elapsed());
    response
}

/// Admin routes need `Authorization: Bearer <admin_token>`. An empty
/// configured token disables them entirely.
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    req: Request<Body>,
    next: Next,
) -> Response {
    let expected = state.config.admin_token.as_str();
    let authorized = !expected.is_empty()
        && bearer_token(req.headers()).is_some_and(|token| tokens_match(token, expected));
    if authorized {
        next.run(req).await
    } else {
        tracing::warn!(uri = %req.uri(), "admin request rejected");
        ApiError::Unauthorized.into_response()
    }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?;
    let value = value.to_str().ok()?;
    value
        .strip_prefix("Bearer ")
        .or_else(|| value.strip_prefix("bearer "))
}

/// Compares without short-circuiting on the first differing byte.
fn tokens_match(provided: &str, expected: &str) -> bool {
    provided.len() == expected.len()
        && provided
            .bytes()
            .zip(expected.bytes())
            .fold(0u8, |diff, (left, right)| diff | (left ^ right))
            == 0
}

/// First `x-forwarded-for` hop, then `x-real-ip`, then the socket peer.
pub(crate) fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    let header_value = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
    };
    header_value("x-forwarded-for")
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .or_else(|| header_value("x-real-ip"))
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| FALLBACK_CLIENT_IP.to_string())
}

/// Salted hash of the caller's address; the raw address never leaves here.
#[derive(Clone, Debug)]
pub struct ClientAddress(pub String);

#[async_trait]
impl FromRequestParts<AppState> for ClientAddress {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let ip = client_ip(&parts.headers, peer);
        Ok(Self(hash_client_ip(&state.config.ip_salt, &ip)))
    }
}

fn cookie_value<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            (key.trim() == name).then(|| value.trim())
        })
}

/// Entries of a list cookie such as `pb_upvotes`.
pub(crate) fn cookie_list(headers: &HeaderMap, name: &str) -> Vec<String> {
    cookie_value(headers, name)
        .map(|value| {
            value
                .split(COOKIE_LIST_SEPARATOR)
                .filter(|entry| !entry.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// `Set-Cookie` value adding `entry` to the list cookie `name`.
pub(crate) fn append_cookie_list(
    headers: &HeaderMap,
    name: &str,
    entry: &str,
    secure: bool,
) -> Option<HeaderValue> {
    let mut entries = cookie_list(headers, name);
    if !entries.iter().any(|existing| existing == entry) {
        entries.push(entry.to_string());
    }
    let skip = entries.len().saturating_sub(COOKIE_LIST_MAX_ENTRIES);
    let value = entries[skip..].join(&COOKIE_LIST_SEPARATOR.to_string());

    let mut cookie =
        format!("{name}={value}; Path=/; Max-Age={COOKIE_MAX_AGE_SECS}; HttpOnly; SameSite=Lax");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).expect("header"));
        }
        map
    }

    #[test]
    fn client_ip_prefers_first_forwarded_hop() {
        let map = headers(&[
            ("x-forwarded-for", " 203.0.113.9 , 10.0.0.1"),
            ("x-real-ip", "198.51.100.2"),
        ]);
        assert_eq!(client_ip(&map, None), "203.0.113.9");
    }

    #[test]
    fn client_ip_falls_back_through_real_ip_peer_and_loopback() {
        let real = headers(&[("x-real-ip", "198.51.100.2")]);
        assert_eq!(client_ip(&real, None), "198.51.100.2");

        let peer: SocketAddr = "192.0.2.4:5555".parse().expect("addr");
        assert_eq!(client_ip(&HeaderMap::new(), Some(peer)), "192.0.2.4");
        assert_eq!(client_ip(&HeaderMap::new(), None), FALLBACK_CLIENT_IP);
    }

    #[test]
    fn cookie_lists_parse_and_append_without_duplicates() {
        let map = headers(&[("cookie", "theme=dark; pb_upvotes=a.b")]);
        assert_eq!(cookie_list(&map, UPVOTES_COOKIE), ["a", "b"]);
        assert!(cookie_list(&map, EDIT_TOKENS_COOKIE).is_empty());

        let value = append_cookie_list(&map, UPVOTES_COOKIE, "b", false).expect("cookie");
        assert!(value.to_str().expect("ascii").starts_with("pb_upvotes=a.b;"));
        let value = append_cookie_list(&map, UPVOTES_COOKIE, "c", true).expect("cookie");
        let value = value.to_str().expect("ascii");
        assert!(value.starts_with("pb_upvotes=a.b.c;"));
        assert!(value.ends_with("; Secure"));
    }

    #[test]
    fn cookie_list_keeps_most_recent_entries() {
        let existing: Vec<String> = (0..COOKIE_LIST_MAX_ENTRIES).map(|i| format!("p{i}")).collect();
        let raw = format!("pb_upvotes={}", existing.join("."));
        let map = headers(&[("cookie", raw.as_str())]);
        let value = append_cookie_list(&map, UPVOTES_COOKIE, "newest", false).expect("cookie");
        let value = value.to_str().expect("ascii");
        assert!(!value.contains("p0."));
        assert!(value.contains("p1."));
        assert!(value.contains(".newest;"));
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(tokens_match("secret", "secret"));
        assert!(!tokens_match("secreT", "secret"));
        assert!(!tokens_match("secret-longer", "secret"));
        assert!(!tokens_match("", "secret"));
    }
}
