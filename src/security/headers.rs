//! Security and cross-origin response headers.
//!
//! The same fixed header set is attached to every outbound response,
//! including 404, 429 and 500 responses produced further down the stack.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, HeaderName, HeaderValue, Request},
    middleware::Next,
    response::Response,
};

/// Content-Security-Policy directives, in emission order.
const CSP_DIRECTIVES: &[(&str, &[&str])] = &[
    ("default-src", &["'self'"]),
    ("media-src", &["'self'", "data:", "blob:"]),
    ("img-src", &["'self'", "data:", "blob:"]),
    ("script-src", &["'self'"]),
    ("style-src", &["'self'", "'unsafe-inline'"]),
    ("font-src", &["'self'", "data:"]),
    ("connect-src", &["'self'"]),
    ("frame-src", &["'none'"]),
    ("object-src", &["'none'"]),
    ("base-uri", &["'self'"]),
    ("form-action", &["'self'"]),
    ("frame-ancestors", &["'self'"]),
    ("script-src-attr", &["'none'"]),
    ("upgrade-insecure-requests", &[]),
];

const HARDENING: &[(&str, &str)] = &[
    ("cross-origin-opener-policy", "same-origin"),
    ("cross-origin-resource-policy", "same-origin"),
    ("origin-agent-cluster", "?1"),
    ("referrer-policy", "no-referrer"),
    ("strict-transport-security", "max-age=31536000; includeSubDomains"),
    ("x-content-type-options", "nosniff"),
    ("x-dns-prefetch-control", "off"),
    ("x-download-options", "noopen"),
    ("x-frame-options", "SAMEORIGIN"),
    ("x-permitted-cross-domain-policies", "none"),
    ("x-xss-protection", "0"),
];

const CORS: &[(&str, &str)] = &[
    ("access-control-allow-origin", "*"),
    (
        "access-control-allow-methods",
        "GET, POST, PUT, PATCH, DELETE, OPTIONS",
    ),
    ("access-control-allow-headers", "Content-Type, Authorization"),
];

/// Render the CSP header value.
pub fn content_security_policy() -> String {
    CSP_DIRECTIVES
        .iter()
        .map(|(name, sources)| {
            if sources.is_empty() {
                (*name).to_string()
            } else {
                format!("{} {}", name, sources.join(" "))
            }
        })
        .collect::<Vec<_>>()
        .join(";")
}

/// Precomputed header set applied to every response.
#[derive(Debug, Clone)]
pub struct SecurityHeaders {
    headers: Vec<(HeaderName, HeaderValue)>,
}

impl SecurityHeaders {
    pub fn new() -> Self {
        let mut headers = Vec::with_capacity(1 + HARDENING.len() + CORS.len());
        headers.push((
            header::CONTENT_SECURITY_POLICY,
            HeaderValue::from_str(&content_security_policy())
                .unwrap_or_else(|_| HeaderValue::from_static("default-src 'self'")),
        ));
        for &(name, value) in HARDENING.iter().chain(CORS) {
            headers.push((
                HeaderName::from_static(name),
                HeaderValue::from_static(value),
            ));
        }
        Self { headers }
    }

    /// Attach the header set, replacing any value already present.
    pub fn apply(&self, headers: &mut HeaderMap) {
        for (name, value) in &self.headers {
            headers.insert(name.clone(), value.clone());
        }
        headers.remove("x-powered-by");
    }
}

impl Default for SecurityHeaders {
    fn default() -> Self {
        Self::new()
    }
}

/// Middleware annotating every response, whatever produced it.
pub async fn security_headers_middleware(
    State(policy): State<Arc<SecurityHeaders>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let mut response = next.run(request).await;
    policy.apply(response.headers_mut());
    response
}
