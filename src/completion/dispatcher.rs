//! Completion dispatcher
//!
//! Tries each candidate endpoint in order with the shared upstream session
//! and returns the first response it can interpret. Failed candidates are
//! recorded and reported together if nothing works.

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use reqwest::{Method, StatusCode};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::{
    completion::{
        candidates::{CandidateEndpoint, Interpretation, DEFAULT_CANDIDATES},
        types::{ChatRequest, CompletionOutcome, CompletionResult},
    },
    config::Config,
    error::{AppError, AppResult},
    routes::metrics::record_candidate_attempt,
    session::{Session, SessionStore},
    upstream::{excerpt, UpstreamExecutor},
};

/// Why a candidate did not produce a usable response
#[derive(Debug, Clone, PartialEq)]
pub enum FailureReason {
    /// Non-200 status with the start of the body
    Status { status: u16, body_excerpt: String },
    /// Connection error, timeout, or body read failure
    Transport(String),
    /// 200 whose body is not JSON
    InvalidBody(String),
}

impl FailureReason {
    fn is_auth_rejection(&self) -> bool {
        matches!(self, FailureReason::Status { status: 401 | 403, .. })
    }

    fn metric_label(&self) -> &'static str {
        match self {
            FailureReason::Status { .. } => "http_error",
            FailureReason::Transport(_) => "transport_error",
            FailureReason::InvalidBody(_) => "invalid_body",
        }
    }
}

/// One failed candidate, as reported to the caller
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateFailure {
    pub endpoint: String,
    pub reason: FailureReason,
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            FailureReason::Status {
                status,
                body_excerpt,
            } => write!(f, "{}: {} - {}", self.endpoint, status, body_excerpt),
            FailureReason::Transport(e) => write!(f, "{}: {}", self.endpoint, e),
            FailureReason::InvalidBody(e) => {
                write!(f, "{}: invalid JSON body - {}", self.endpoint, e)
            }
        }
    }
}

/// Runs a chat request against the candidate endpoints
pub struct CompletionDispatcher {
    store: Arc<SessionStore>,
    executor: Arc<UpstreamExecutor>,
    candidates: Vec<CandidateEndpoint>,
    timeout: Duration,
    placeholder_credentials: bool,
}

impl CompletionDispatcher {
    /// Create a new dispatcher using [`DEFAULT_CANDIDATES`]
    pub fn new(store: Arc<SessionStore>, executor: Arc<UpstreamExecutor>, config: &Config) -> Self {
        Self {
            store,
            executor,
            candidates: DEFAULT_CANDIDATES.to_vec(),
            timeout: config.completion_timeout(),
            placeholder_credentials: config.has_placeholder_credentials(),
        }
    }

    /// Replace the candidate list
    pub fn with_candidates(mut self, candidates: Vec<CandidateEndpoint>) -> Self {
        self.candidates = candidates;
        self
    }

    /// Complete `request`, stopping at the first interpretable success
    #[instrument(skip(self, request), fields(model = %request.model, messages = request.messages.len()))]
    pub async fn complete(&self, request: &ChatRequest) -> AppResult<CompletionOutcome> {
        if self.placeholder_credentials {
            return Err(AppError::Configuration(
                "Upstream credentials are not configured; set UPSTREAM_EMAIL and UPSTREAM_PASSWORD"
                    .to_string(),
            ));
        }

        let session = self.store.get_valid_session().await?;
        debug!("Upstream session ready");

        let mut failures = Vec::with_capacity(self.candidates.len());
        for candidate in &self.candidates {
            debug!(endpoint = %candidate.path, "Trying endpoint");
            let started = Instant::now();

            match self.try_candidate(candidate, &session, request).await {
                Ok(outcome) => {
                    record_candidate_attempt(candidate.path, "success", started.elapsed());
                    info!(endpoint = %candidate.path, "Endpoint succeeded");
                    return Ok(outcome);
                }
                Err(reason) => {
                    record_candidate_attempt(
                        candidate.path,
                        reason.metric_label(),
                        started.elapsed(),
                    );
                    let failure = CandidateFailure {
                        endpoint: candidate.path.to_string(),
                        reason,
                    };
                    warn!(failure = %failure, "Endpoint failed");
                    failures.push(failure);
                }
            }
        }

        // Every candidate refused the session, so the next request logs in again.
        if !failures.is_empty() && failures.iter().all(|f| f.reason.is_auth_rejection()) {
            self.store.invalidate(&session);
        }

        Err(AppError::UpstreamExhausted(failures))
    }

    async fn try_candidate(
        &self,
        candidate: &CandidateEndpoint,
        session: &Session,
        request: &ChatRequest,
    ) -> Result<CompletionOutcome, FailureReason> {
        let payload = (candidate.build_payload)(request);

        let response = self
            .executor
            .execute(
                Method::POST,
                candidate.path,
                session,
                Some(&payload),
                self.timeout,
            )
            .await
            .map_err(|e| FailureReason::Transport(e.to_string()))?;

        if response.status != StatusCode::OK {
            let body = String::from_utf8_lossy(&response.body);
            return Err(FailureReason::Status {
                status: response.status.as_u16(),
                body_excerpt: excerpt(&body).to_string(),
            });
        }

        let value: Value = serde_json::from_slice(&response.body)
            .map_err(|e| FailureReason::InvalidBody(e.to_string()))?;

        Ok(match (candidate.interpret)(&value) {
            Interpretation::Generation(text) => CompletionOutcome::Normalized(
                CompletionResult::from_generation(&request.model, &request.messages, text),
            ),
            Interpretation::OpenAi | Interpretation::Unrecognized => {
                CompletionOutcome::Passthrough(response.body)
            }
        })
    }
}
