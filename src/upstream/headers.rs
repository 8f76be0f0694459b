//! Header utilities for upstream requests
//!
//! The upstream is a browser application, so every call carries the
//! headers a browser tab on the upstream's own origin would send. Inbound
//! client headers are never forwarded.

use reqwest::header::{
    HeaderMap, HeaderValue, InvalidHeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONTENT_TYPE, ORIGIN,
    REFERER, USER_AGENT,
};

/// Desktop browser User-Agent presented to the upstream
pub const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Build the fixed header set for requests to `base_url`
///
/// Fails only when `base_url` contains characters not allowed in a header.
pub fn build_browser_headers(base_url: &str) -> Result<HeaderMap, InvalidHeaderValue> {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(BROWSER_USER_AGENT));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static("application/json, text/plain, */*"),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(ORIGIN, HeaderValue::from_str(base_url)?);
    headers.insert(REFERER, HeaderValue::from_str(&format!("{}/", base_url))?);

    Ok(headers)
}
