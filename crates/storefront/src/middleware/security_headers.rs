//! Security headers middleware for XSS, clickjacking, and isolation protection.
//!
//! Every response gets a locked-down header set. The only same-origin
//! connection the pages open is the auth event stream, so `connect-src 'self'`
//! is all the CSP allows beyond static assets.

use axum::{
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue,
        header::{
            CACHE_CONTROL, CONTENT_SECURITY_POLICY, REFERRER_POLICY, X_CONTENT_TYPE_OPTIONS,
            X_FRAME_OPTIONS,
        },
    },
    middleware::Next,
    response::Response,
};

const CONTENT_SECURITY_POLICY_VALUE: &str = "default-src 'none'; \
     script-src 'self'; \
     style-src 'self'; \
     font-src 'self'; \
     img-src 'self' data:; \
     connect-src 'self'; \
     frame-src 'none'; \
     object-src 'none'; \
     base-uri 'self'; \
     form-action 'self'; \
     frame-ancestors 'none'";

const PERMISSIONS_POLICY_VALUE: &str = "accelerometer=(), \
     autoplay=(), \
     browsing-topics=(), \
     camera=(), \
     display-capture=(), \
     encrypted-media=(), \
     fullscreen=(), \
     geolocation=(), \
     gyroscope=(), \
     hid=(), \
     idle-detection=(), \
     magnetometer=(), \
     microphone=(), \
     midi=(), \
     payment=(), \
     publickey-credentials-get=(), \
     screen-wake-lock=(), \
     serial=(), \
     usb=(), \
     xr-spatial-tracking=()";

/// Static, always-applied headers.
const FIXED_HEADERS: [(HeaderName, &str); 9] = [
    (X_FRAME_OPTIONS, "DENY"),
    (X_CONTENT_TYPE_OPTIONS, "nosniff"),
    (REFERRER_POLICY, "no-referrer"),
    (CONTENT_SECURITY_POLICY, CONTENT_SECURITY_POLICY_VALUE),
    (
        HeaderName::from_static("permissions-policy"),
        PERMISSIONS_POLICY_VALUE,
    ),
    (
        HeaderName::from_static("cross-origin-opener-policy"),
        "same-origin",
    ),
    (
        HeaderName::from_static("cross-origin-resource-policy"),
        "same-origin",
    ),
    (
        HeaderName::from_static("cross-origin-embedder-policy"),
        "require-corp",
    ),
    (HeaderName::from_static("x-dns-prefetch-control"), "off"),
];

/// Add security headers to all responses.
///
/// Pages carry per-user cart and catalog state, so anything outside
/// `/static/` is marked `no-store`.
pub async fn security_headers_middleware(request: Request, next: Next) -> Response {
    let is_static = request.uri().path().starts_with("/static/");
    let mut response = next.run(request).await;
    apply_security_headers(response.headers_mut(), is_static);
    response
}

fn apply_security_headers(headers: &mut HeaderMap, is_static: bool) {
    for (name, value) in &FIXED_HEADERS {
        headers.insert(name.clone(), HeaderValue::from_static(*value));
    }

    if !is_static {
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-store, max-age=0"));
    }
}
