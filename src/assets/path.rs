//! Request path normalization and containment.
//!
//! [`is_within_root`] is purely lexical: it never touches the filesystem.
//! Symlinks are handled separately when a candidate file is canonicalized.

use std::path::{Component, Path, PathBuf};

use percent_encoding::percent_decode_str;

/// Normalize a request path into a path relative to the content root.
///
/// Returns `None` when the path would escape the root, is not valid UTF-8
/// after percent-decoding, or contains a segment that is not a plain file
/// name on this platform. An empty result means the root itself.
pub fn is_within_root(request_path: &str) -> Option<PathBuf> {
    let decoded = percent_decode_str(request_path).decode_utf8().ok()?;

    let mut segments: Vec<&str> = Vec::new();
    for segment in decoded.split('/') {
        match segment {
            "" | "." => continue,
            ".." => {
                // Popping past the root is an escape attempt, not a no-op.
                segments.pop()?;
            }
            _ if !is_plain_segment(segment) => return None,
            _ => segments.push(segment),
        }
    }

    Some(segments.iter().collect())
}

fn is_plain_segment(segment: &str) -> bool {
    if segment.contains(['\\', '\0']) {
        return false;
    }
    let mut components = Path::new(segment).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}
