//! Configuration management for Conduit
//!
//! Configuration is loaded from environment variables. Upstream credentials
//! and the gateway API key have no defaults and must be supplied.

use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Email value shipped in sample `.env` files; treated as "not configured"
pub const PLACEHOLDER_EMAIL: &str = "your_email@example.com";

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Host to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,

    /// Upstream web application base URL (no trailing slash)
    pub upstream_base_url: String,
    /// Login email for the upstream
    pub upstream_email: String,
    /// Login password for the upstream
    pub upstream_password: String,

    /// API key callers must present as a bearer token
    pub api_key: String,

    /// How long an acquired upstream session is reused (in seconds)
    pub session_ttl_seconds: u64,
    /// Timeout for login and other auth-adjacent calls (in seconds)
    pub auth_timeout_seconds: u64,
    /// Timeout for completion calls (in seconds)
    pub completion_timeout_seconds: u64,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            host: env::var("CONDUIT_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8000".to_string())
                .parse()
                .context("Invalid PORT")?,

            upstream_base_url: env::var("UPSTREAM_BASE_URL")
                .context("UPSTREAM_BASE_URL must be set")?
                .trim_end_matches('/')
                .to_string(),
            upstream_email: env::var("UPSTREAM_EMAIL").context("UPSTREAM_EMAIL must be set")?,
            upstream_password: env::var("UPSTREAM_PASSWORD")
                .context("UPSTREAM_PASSWORD must be set")?,

            api_key: env::var("API_KEY").context("API_KEY must be set")?,

            session_ttl_seconds: env::var("SESSION_TTL_SECONDS")
                .unwrap_or_else(|_| "7200".to_string())
                .parse()
                .context("Invalid SESSION_TTL_SECONDS")?,
            auth_timeout_seconds: env::var("AUTH_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("Invalid AUTH_TIMEOUT_SECONDS")?,
            completion_timeout_seconds: env::var("COMPLETION_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()
                .context("Invalid COMPLETION_TIMEOUT_SECONDS")?,
        })
    }

    /// True when the upstream credentials are empty or still the sample values
    pub fn has_placeholder_credentials(&self) -> bool {
        self.upstream_email.trim().is_empty()
            || self.upstream_password.is_empty()
            || self.upstream_email == PLACEHOLDER_EMAIL
    }

    /// Create a configuration pointing at a mock upstream
    #[cfg(any(test, feature = "test-utils"))]
    pub fn for_testing(upstream_base_url: &str, api_key: &str) -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 0,
            upstream_base_url: upstream_base_url.trim_end_matches('/').to_string(),
            upstream_email: "ops@example.org".to_string(),
            upstream_password: "correct-horse".to_string(),
            api_key: api_key.to_string(),
            session_ttl_seconds: 7200,
            auth_timeout_seconds: 5,
            completion_timeout_seconds: 5,
        }
    }

    pub fn session_ttl(&self) -> Duration {
        Duration::from_secs(self.session_ttl_seconds)
    }

    pub fn auth_timeout(&self) -> Duration {
        Duration::from_secs(self.auth_timeout_seconds)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_seconds)
    }
}
