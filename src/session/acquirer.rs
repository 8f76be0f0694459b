//! Credential-based login against the upstream web application
//!
//! The upstream does not document its sign-in route, so a fixed list of
//! likely paths is tried in order until one accepts the credentials. The
//! cookies the upstream sets along the way become the session.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::header::HeaderMap;
use reqwest::StatusCode;
use serde_json::{json, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::Config;
use crate::session::{AuthError, Session, SessionAcquirer};
use crate::upstream::{build_browser_headers, excerpt};

/// Sign-in paths, tried in this order
pub const SIGNIN_PATHS: &[&str] = &[
    "/api/v1/auths/signin",
    "/api/auths/signin",
    "/auth/signin",
    "/signin",
    "/api/auth/signin",
    "/api/v1/auth/signin",
];

/// Login page fetched before signing in to pick up any pre-auth cookies
const LOGIN_PAGE_PATH: &str = "/auth";

/// Result of inspecting one sign-in response
#[derive(Debug, PartialEq)]
pub enum SigninOutcome {
    Accepted { token: Option<String> },
    Rejected(String),
}

/// Decide whether a sign-in response means the credentials were accepted
///
/// Accepted when the status is 200 and the body is a JSON object, or when
/// the body mentions "success". A bare 200 with anything else is rejected.
pub fn classify_signin(status: StatusCode, body: &str) -> SigninOutcome {
    if status != StatusCode::OK {
        return SigninOutcome::Rejected(format!("{} - {}", status.as_u16(), excerpt(body)));
    }

    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => SigninOutcome::Accepted {
            token: map
                .get("token")
                .and_then(Value::as_str)
                .filter(|t| !t.is_empty())
                .map(str::to_string),
        },
        _ if body.to_lowercase().contains("success") => SigninOutcome::Accepted { token: None },
        _ => SigninOutcome::Rejected(format!(
            "200 without success indicator - {}",
            excerpt(body)
        )),
    }
}

/// Logs in through the upstream's browser sign-in form
pub struct WebLoginAcquirer {
    base_url: String,
    email: String,
    password: String,
    headers: HeaderMap,
    timeout: Duration,
    session_ttl: Duration,
}

impl WebLoginAcquirer {
    /// Create a new acquirer from configuration
    pub fn new(config: &Config) -> anyhow::Result<Self> {
        Ok(Self {
            base_url: config.upstream_base_url.clone(),
            email: config.upstream_email.clone(),
            password: config.upstream_password.clone(),
            headers: build_browser_headers(&config.upstream_base_url)?,
            timeout: config.auth_timeout(),
            session_ttl: config.session_ttl(),
        })
    }

    /// Best-effort GET of the login page; failures are only logged
    async fn warm_up(&self, client: &reqwest::Client) {
        let url = format!("{}{}", self.base_url, LOGIN_PAGE_PATH);
        match client.get(&url).send().await {
            Ok(response) => debug!(status = %response.status(), "Login page response"),
            Err(e) => warn!(error = %e, "Login page warm-up failed"),
        }
    }

    async fn try_signin(&self, client: &reqwest::Client, path: &str) -> SigninOutcome {
        let url = format!("{}{}", self.base_url, path);
        let payload = json!({
            "email": self.email,
            "password": self.password,
        });

        let response = match client.post(&url).json(&payload).send().await {
            Ok(response) => response,
            Err(e) => return SigninOutcome::Rejected(e.to_string()),
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_signin(status, &body),
            Err(e) => SigninOutcome::Rejected(format!("{} - {}", status.as_u16(), e)),
        }
    }
}

#[async_trait]
impl SessionAcquirer for WebLoginAcquirer {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn acquire(&self) -> Result<Session, AuthError> {
        info!("Authenticating with upstream");

        let jar = Arc::new(Jar::default());
        let client = reqwest::Client::builder()
            .cookie_provider(jar.clone())
            .default_headers(self.headers.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| AuthError::Aborted(format!("failed to build login client: {}", e)))?;

        self.warm_up(&client).await;

        let mut attempts = Vec::with_capacity(SIGNIN_PATHS.len());
        for path in SIGNIN_PATHS {
            debug!(endpoint = %path, "Trying authentication endpoint");

            match self.try_signin(&client, path).await {
                SigninOutcome::Accepted { token } => {
                    info!(endpoint = %path, "Authentication succeeded");
                    let acquired_at = Utc::now();
                    let ttl = chrono::Duration::from_std(self.session_ttl)
                        .unwrap_or_else(|_| chrono::Duration::hours(2));
                    return Ok(Session::new(jar, token, acquired_at, acquired_at + ttl));
                }
                SigninOutcome::Rejected(reason) => {
                    warn!(endpoint = %path, reason = %reason, "Authentication endpoint rejected");
                    attempts.push(format!("{}: {}", path, reason));
                }
            }
        }

        Err(AuthError::AllEndpointsFailed(attempts))
    }
}
