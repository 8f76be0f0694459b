//! Upstream module
//!
//! Transport to the upstream web application: browser-like headers and a
//! request executor that attaches the current session.

pub mod executor;
pub mod headers;

pub use executor::{RawResponse, UpstreamExecutor};
pub use headers::build_browser_headers;

/// Maximum number of characters of an upstream body kept in error messages
pub const EXCERPT_CHARS: usize = 200;

/// First [`EXCERPT_CHARS`] characters of `body`
pub fn excerpt(body: &str) -> &str {
    match body.char_indices().nth(EXCERPT_CHARS) {
        Some((idx, _)) => &body[..idx],
        None => body,
    }
}
