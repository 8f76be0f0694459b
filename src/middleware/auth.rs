//! Authentication middleware
//!
//! Checks that callers present the configured gateway API key as a bearer
//! token. Keys are compared by SHA-256 digest so the comparison does not
//! depend on how much of the key matches.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use tracing::{debug, instrument, warn};

use crate::{error::AppError, AppState};

/// Return the token of a `Bearer` Authorization header
///
/// The scheme name is matched case-insensitively.
pub fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    let (scheme, token) = auth_header.split_once(' ')?;
    scheme.eq_ignore_ascii_case("bearer").then_some(token)
}

/// Hex SHA-256 of an API key
pub fn hash_api_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// True when `presented` equals `expected`
pub fn api_key_matches(presented: &str, expected: &str) -> bool {
    Sha256::digest(presented.as_bytes())
        .ct_eq(&Sha256::digest(expected.as_bytes()))
        .into()
}

/// API key middleware
///
/// Rejects requests without a bearer token (401 UNAUTHORIZED) or with the
/// wrong one (401 INVALID_API_KEY).
#[instrument(skip_all, fields(path = %request.uri().path()))]
pub async fn api_key_middleware(
    State(state): State<Arc<AppState>>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let token = extract_bearer_token(auth_header).ok_or(AppError::Unauthorized)?;

    if !api_key_matches(token, &state.config.api_key) {
        let key_hash = hash_api_key(token);
        warn!(key_hash = %&key_hash[..12], "Rejected invalid API key");
        return Err(AppError::InvalidApiKey);
    }

    debug!("API key accepted");
    Ok(next.run(request).await)
}
