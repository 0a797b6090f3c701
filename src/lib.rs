//! Static site server with request admission and delivery policy.
//!
//! Every request is annotated with security headers, gated by a per-client
//! sliding-window rate limiter, and then answered from the content root or
//! with the fallback 404 document. Faults anywhere become an opaque 500.

pub mod assets;
pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::SiteConfig;
pub use error::AppError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
