//! Asset categories and the caching headers they carry.

use std::path::Path;

use axum::http::{header, HeaderMap, HeaderValue};

/// Coarse file category, derived from the extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    /// HTML documents; never cached so the UI always fetches fresh markup.
    Markup,
    /// MP4 video; long-lived and range-capable.
    Video,
    /// Everything else (CSS, JS, images, audio, fonts).
    Other,
}

impl AssetCategory {
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase());

        match ext.as_deref() {
            Some("html" | "htm") => AssetCategory::Markup,
            Some("mp4") => AssetCategory::Video,
            _ => AssetCategory::Other,
        }
    }

    pub fn cache_directive(self) -> CacheDirective {
        match self {
            AssetCategory::Markup => CacheDirective::NoStore,
            AssetCategory::Video => CacheDirective::LongLivedRange,
            AssetCategory::Other => CacheDirective::ShortPublic,
        }
    }
}

/// Cache behaviour attached to a delivered asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheDirective {
    NoStore,
    LongLivedRange,
    ShortPublic,
}

impl CacheDirective {
    pub const NO_STORE: &'static str = "no-cache, no-store, must-revalidate";
    pub const LONG_LIVED: &'static str = "public, max-age=86400000";
    pub const SHORT_PUBLIC: &'static str = "public, max-age=86400";

    pub fn cache_control(self) -> &'static str {
        match self {
            CacheDirective::NoStore => Self::NO_STORE,
            CacheDirective::LongLivedRange => Self::LONG_LIVED,
            CacheDirective::ShortPublic => Self::SHORT_PUBLIC,
        }
    }

    /// Write the directive's headers, overriding whatever the file server chose.
    pub fn apply(self, headers: &mut HeaderMap) {
        headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(self.cache_control()),
        );

        match self {
            CacheDirective::NoStore => {
                headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
                headers.insert(header::EXPIRES, HeaderValue::from_static("0"));
            }
            CacheDirective::LongLivedRange => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("video/mp4"));
                headers.insert(header::ACCEPT_RANGES, HeaderValue::from_static("bytes"));
            }
            CacheDirective::ShortPublic => {}
        }
    }
}
