//! Error responses: 404 fallback, 429 rate limit, 500 generic.
//!
//! Operators get the detail in the logs; clients only ever see the fixed
//! fallback document or a fixed JSON message.

use std::any::Any;
use std::fmt::Display;
use std::path::Path;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::assets::{is_within_root, CacheDirective};
use crate::error::AppError;
use crate::observability::metrics;

pub const RATE_LIMITED_MESSAGE: &str = "Too many requests, please try again later";
pub const INTERNAL_ERROR_MESSAGE: &str = "Internal server error";

/// Served when no `404.html` is available in the content root.
const BUILTIN_NOT_FOUND: &str = "<!DOCTYPE html>\n<html lang=\"en\">\n<head><meta charset=\"utf-8\"><title>404 Not Found</title></head>\n<body><h1>404</h1><p>The page you are looking for does not exist.</p><p><a href=\"/\">Back to home</a></p></body>\n</html>\n";

/// Produces every non-asset response of the site.
#[derive(Debug, Clone)]
pub struct ErrorResponder {
    not_found_page: Bytes,
}

impl ErrorResponder {
    pub fn new(not_found_page: impl Into<Bytes>) -> Self {
        Self {
            not_found_page: not_found_page.into(),
        }
    }

    /// Responder using the built-in fallback document.
    pub fn builtin() -> Self {
        Self::new(BUILTIN_NOT_FOUND)
    }

    /// Load the fallback document from the content root, once.
    pub async fn load(root: &Path, page: &str) -> Self {
        let Some(relative) = is_within_root(page) else {
            tracing::warn!(page, "Fallback page escapes the content root; using built-in page");
            return Self::builtin();
        };

        let path = root.join(relative);
        match tokio::fs::read(&path).await {
            Ok(bytes) => {
                tracing::debug!(path = %path.display(), "Loaded fallback page");
                Self::new(bytes)
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Fallback page unreadable; using built-in page"
                );
                Self::builtin()
            }
        }
    }

    /// Map a request error to its response.
    pub fn respond(&self, path: &str, err: AppError) -> Response {
        match err {
            AppError::RateExceeded { retry_after } => Self::rate_limited(retry_after),
            AppError::AssetNotFound => self.not_found(path),
            AppError::PathTraversalAttempt => {
                tracing::warn!(path, "Path traversal attempt refused");
                self.not_found(path)
            }
            AppError::Internal(detail) => Self::internal_error(&detail),
        }
    }

    /// 404 with the fallback document.
    pub fn not_found(&self, path: &str) -> Response {
        tracing::warn!(path, "404 - page not found");
        metrics::record_not_found();

        let mut response = Response::new(Body::from(self.not_found_page.clone()));
        *response.status_mut() = StatusCode::NOT_FOUND;
        let headers = response.headers_mut();
        headers.insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("text/html; charset=utf-8"),
        );
        CacheDirective::NoStore.apply(headers);
        response
    }

    /// 500 with a generic body. Performs no I/O and cannot fail.
    pub fn internal_error(detail: &dyn Display) -> Response {
        tracing::error!(error = %detail, "Internal server error");
        metrics::record_internal_error();

        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({ "error": INTERNAL_ERROR_MESSAGE })),
        )
            .into_response()
    }

    /// 429 with a `Retry-After` hint in whole seconds.
    pub fn rate_limited(retry_after: Duration) -> Response {
        let mut response = (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({ "error": RATE_LIMITED_MESSAGE })),
        )
            .into_response();
        response
            .headers_mut()
            .insert(header::RETRY_AFTER, HeaderValue::from(retry_after_secs(retry_after)));
        response
    }

    /// Turn a caught panic into the generic 500.
    pub fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
        let detail = if let Some(s) = panic.downcast_ref::<&str>() {
            (*s).to_string()
        } else if let Some(s) = panic.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self::internal_error(&format!("handler panicked: {detail}"))
    }
}

fn retry_after_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
    secs.max(1)
}
