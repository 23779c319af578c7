//! Rate limiting middleware using governor and `tower_governor`.
//!
//! Provides rate limiters for two endpoint categories:
//! - `auth_rate_limiter`: Strict limits for sign-in and registration (~10/min)
//! - `api_rate_limiter`: Relaxed limits for cart and admin mutations (~60/min)

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::Arc;

use axum::extract::ConnectInfo;
use axum::http::Request;
use governor::clock::QuantaInstant;
use governor::middleware::NoOpMiddleware;
use thiserror::Error;
use tower_governor::{GovernorError, GovernorLayer, governor::GovernorConfigBuilder};

// =============================================================================
// Client IP Key Extractor
// =============================================================================

/// Key extractor that prefers proxy headers, then the peer address.
///
/// Requests with no usable source share the unspecified address bucket
/// rather than failing.
#[derive(Clone, Copy)]
pub struct ClientIpKeyExtractor;

impl tower_governor::key_extractor::KeyExtractor for ClientIpKeyExtractor {
    type Key = IpAddr;

    fn extract<T>(&self, req: &Request<T>) -> Result<Self::Key, GovernorError> {
        Ok(client_ip(req))
    }
}

/// Cloudflare, then X-Forwarded-For (first hop), X-Real-IP, Fly-Client-IP,
/// then the socket peer.
fn client_ip<T>(req: &Request<T>) -> IpAddr {
    let headers = req.headers();

    header_ip(headers, "cf-connecting-ip")
        .or_else(|| {
            headers
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .and_then(|s| s.trim().parse::<IpAddr>().ok())
        })
        .or_else(|| header_ip(headers, "x-real-ip"))
        .or_else(|| header_ip(headers, "fly-client-ip"))
        .or_else(|| {
            req.extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

fn header_ip(headers: &axum::http::HeaderMap, name: &str) -> Option<IpAddr> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse::<IpAddr>().ok())
}

// =============================================================================
// Rate Limiter Configuration
// =============================================================================

/// Rate limiter layer type for Axum.
pub type RateLimiterLayer =
    GovernorLayer<ClientIpKeyExtractor, NoOpMiddleware<QuantaInstant>, axum::body::Body>;

/// Rejected limiter settings.
#[derive(Debug, Error)]
#[error("invalid rate limiter settings: replenish every {period_secs}s, burst {burst}")]
pub struct RateLimitConfigError {
    pub period_secs: u64,
    pub burst: u32,
}

fn limiter(period_secs: u64, burst: u32) -> Result<RateLimiterLayer, RateLimitConfigError> {
    let config = GovernorConfigBuilder::default()
        .key_extractor(ClientIpKeyExtractor)
        .per_second(period_secs)
        .burst_size(burst)
        .finish()
        .ok_or(RateLimitConfigError { period_secs, burst })?;
    Ok(GovernorLayer::new(Arc::new(config)))
}

/// Create rate limiter for auth endpoints: ~10 requests per minute per IP.
///
/// Configuration: 1 request every 6 seconds (replenish), burst of 5.
///
/// # Errors
///
/// Returns an error if governor rejects the settings.
pub fn auth_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(6, 5)
}

/// Create rate limiter for cart and admin mutations: ~60 requests per minute per IP.
///
/// Configuration: 1 request per second (replenish), burst of 30.
///
/// # Errors
///
/// Returns an error if governor rejects the settings.
pub fn api_rate_limiter() -> Result<RateLimiterLayer, RateLimitConfigError> {
    limiter(1, 30)
}
