//! Conduit - chat-completion gateway for browser-only chat web apps
//!
//! This library provides the core functionality for the Conduit server.
//! It logs into the upstream web application, caches the session, and
//! forwards OpenAI-style chat requests to whichever upstream endpoint
//! answers.

pub mod completion;
pub mod config;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod upstream;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;

pub use crate::completion::CompletionDispatcher;
pub use crate::config::Config;
pub use crate::session::{SessionAcquirer, SessionStore, WebLoginAcquirer};
pub use crate::upstream::UpstreamExecutor;

/// Application state shared across all request handlers
pub struct AppState {
    pub config: Config,
    pub start_time: Instant,
    /// Process-wide upstream session cache
    pub session_store: Arc<SessionStore>,
    /// Candidate endpoint runner for chat completions
    pub dispatcher: Arc<CompletionDispatcher>,
}

impl AppState {
    /// Create a new application state
    pub fn new(config: Config) -> Result<Self> {
        let acquirer: Arc<dyn SessionAcquirer> = Arc::new(WebLoginAcquirer::new(&config)?);
        Self::with_acquirer(config, acquirer)
    }

    /// Create an application state with a custom login strategy
    ///
    /// Used by integration tests to count or stub upstream logins.
    #[cfg(any(test, feature = "test-utils"))]
    pub fn new_for_testing(config: Config, acquirer: Arc<dyn SessionAcquirer>) -> Result<Self> {
        Self::with_acquirer(config, acquirer)
    }

    fn with_acquirer(config: Config, acquirer: Arc<dyn SessionAcquirer>) -> Result<Self> {
        // Initialize HTTP client with connection pooling; per-call timeouts
        // are applied by the executor.
        let http_client = reqwest::Client::builder()
            .pool_max_idle_per_host(16)
            .build()?;

        let session_store = Arc::new(SessionStore::new(acquirer));
        let executor = Arc::new(UpstreamExecutor::new(http_client, &config)?);
        let dispatcher = Arc::new(CompletionDispatcher::new(
            session_store.clone(),
            executor,
            &config,
        ));

        Ok(Self {
            config,
            start_time: Instant::now(),
            session_store,
            dispatcher,
        })
    }
}
