//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, layer stack)
//!         security headers → metrics → panic catcher → request id
//!         → trace → timeout → rate limiter → body limit
//!     → server.rs (asset handler, file streaming)
//!     → error.rs (404 / 429 / 500 responses)
//!     → Send to client
//! ```

pub mod error;
pub mod request;
pub mod server;

pub use error::ErrorResponder;
pub use request::{RequestUuid, X_REQUEST_ID};
pub use server::{build_router, with_policies, AppState, HttpServer};
