//! Static asset delivery policy.
//!
//! # Data Flow
//! ```text
//! request path
//!     → path.rs (percent-decode, normalize, containment)
//!     → resolve.rs (directory → index, existence, symlink check)
//!     → policy.rs (category → cache / content-type headers)
//!     → bytes streamed by the HTTP layer
//! ```
//!
//! # Design Decisions
//! - Containment is a pure function, tested on its own
//! - Escape attempts and missing files look identical to clients
//! - Byte streaming, ranges and conditional requests are left to the file server

pub mod path;
pub mod policy;
pub mod resolve;

pub use path::is_within_root;
pub use policy::{AssetCategory, CacheDirective};
pub use resolve::{ContentRoot, ResolvedAsset};
