//! Upstream session management
//!
//! The upstream only offers a browser login flow, so the gateway logs in
//! with credentials, keeps the resulting cookie jar and reuses it until it
//! expires. [`SessionStore`] owns the cached session and makes sure only one
//! login runs at a time; [`WebLoginAcquirer`] performs the login itself.

pub mod acquirer;
pub mod store;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::HeaderValue;
use reqwest::Url;
use thiserror::Error;

pub use acquirer::{WebLoginAcquirer, SIGNIN_PATHS};
pub use store::{SessionState, SessionStatus, SessionStore};

/// Errors produced while obtaining an upstream session
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    /// Every sign-in endpoint was tried and none accepted the credentials.
    /// Holds one line per attempted endpoint.
    #[error("all authentication endpoints failed")]
    AllEndpointsFailed(Vec<String>),

    #[error("session acquisition aborted: {0}")]
    Aborted(String),
}

/// Authenticated upstream session
///
/// Cheap to clone; clones share the same cookie jar.
#[derive(Clone)]
pub struct Session {
    jar: Arc<Jar>,
    bearer_token: Option<String>,
    pub acquired_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(
        jar: Arc<Jar>,
        bearer_token: Option<String>,
        acquired_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            jar,
            bearer_token,
            acquired_at,
            expires_at,
        }
    }

    /// Whether the session can still be used
    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at
    }

    /// `Cookie` header value the jar would send to `url`
    pub fn cookie_header(&self, url: &Url) -> Option<HeaderValue> {
        self.jar.cookies(url)
    }

    /// Token returned in the login body, if the upstream sent one
    pub fn bearer_token(&self) -> Option<&str> {
        self.bearer_token.as_deref()
    }

    /// True when both values come from the same login
    pub fn same_login(&self, other: &Session) -> bool {
        Arc::ptr_eq(&self.jar, &other.jar)
    }
}

// Keep cookie and token material out of logs.
impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("has_bearer_token", &self.bearer_token.is_some())
            .field("acquired_at", &self.acquired_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Strategy for logging into the upstream
///
/// Each call performs one complete login attempt; retrying is left to the
/// caller.
#[async_trait]
pub trait SessionAcquirer: Send + Sync {
    async fn acquire(&self) -> Result<Session, AuthError>;
}
