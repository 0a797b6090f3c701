//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request:
//!     → headers.rs (annotate the eventual response, whatever it is)
//!     → rate_limit.rs (per-client sliding window admission)
//!         → window_store.rs (timestamps per client identity)
//!     → Pass to asset delivery
//! ```
//!
//! # Design Decisions
//! - Headers are applied outermost so error responses carry them too
//! - Rate-limit state is an owned store injected through middleware state
//! - Client identity is the peer IP; it is coarse and spoofable by design

pub mod headers;
pub mod rate_limit;
pub mod window_store;

pub use headers::{security_headers_middleware, SecurityHeaders};
pub use rate_limit::{rate_limit_middleware, spawn_sweeper, Admission, RateLimiter};
pub use window_store::{ClientId, ClientWindowStore, WindowSnapshot};
