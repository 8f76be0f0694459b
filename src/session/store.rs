//! Session store with single-flight acquisition
//!
//! Holds the one upstream session shared by every inbound request. When the
//! session is missing or expired, the first caller starts a login on a
//! background task; callers arriving while it runs await the same result
//! instead of logging in again.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::routes::metrics::record_session_acquisition;
use crate::session::{AuthError, Session, SessionAcquirer};

type SharedAcquisition = Shared<BoxFuture<'static, Result<Session, AuthError>>>;

#[derive(Default)]
struct SessionSlot {
    session: Option<Session>,
    in_flight: Option<SharedAcquisition>,
}

/// Session state as reported by the health endpoint
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SessionState {
    Absent,
    Valid,
    Expired,
}

/// Snapshot of the cached session without any credential material
#[derive(Debug, Clone, Serialize)]
pub struct SessionStatus {
    pub state: SessionState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub acquiring: bool,
}

/// Process-wide holder of the upstream session
pub struct SessionStore {
    acquirer: Arc<dyn SessionAcquirer>,
    slot: Arc<Mutex<SessionSlot>>,
}

impl SessionStore {
    pub fn new(acquirer: Arc<dyn SessionAcquirer>) -> Self {
        Self {
            acquirer,
            slot: Arc::new(Mutex::new(SessionSlot::default())),
        }
    }

    /// Return the cached session, logging in first if it is absent or expired
    #[instrument(skip(self))]
    pub async fn get_valid_session(&self) -> Result<Session, AuthError> {
        let acquisition = {
            let mut slot = lock(&self.slot);

            if let Some(session) = slot.session.as_ref().filter(|s| s.is_valid()) {
                debug!("Session cache hit");
                return Ok(session.clone());
            }

            match &slot.in_flight {
                Some(in_flight) => {
                    debug!("Joining in-flight session acquisition");
                    in_flight.clone()
                }
                None => {
                    debug!("Session cache miss, starting acquisition");
                    let acquisition = self.spawn_acquisition();
                    slot.in_flight = Some(acquisition.clone());
                    acquisition
                }
            }
        };

        acquisition.await
    }

    /// Drop `session` if it is still the cached one
    ///
    /// A session that was already replaced by a newer login is left alone.
    pub fn invalidate(&self, session: &Session) {
        let mut slot = lock(&self.slot);
        if slot
            .session
            .as_ref()
            .is_some_and(|cached| cached.same_login(session))
        {
            info!("Invalidating upstream session");
            slot.session = None;
        }
    }

    /// Current state of the cache
    pub fn status(&self) -> SessionStatus {
        let slot = lock(&self.slot);
        let acquiring = slot.in_flight.is_some();

        match &slot.session {
            None => SessionStatus {
                state: SessionState::Absent,
                expires_at: None,
                acquiring,
            },
            Some(session) => SessionStatus {
                state: if session.is_valid() {
                    SessionState::Valid
                } else {
                    SessionState::Expired
                },
                expires_at: Some(session.expires_at),
                acquiring,
            },
        }
    }

    /// Place a session in the cache without logging in
    #[cfg(any(test, feature = "test-utils"))]
    pub fn seed(&self, session: Session) {
        lock(&self.slot).session = Some(session);
    }

    fn spawn_acquisition(&self) -> SharedAcquisition {
        let acquirer = self.acquirer.clone();
        let task_slot = self.slot.clone();

        // The task stores its own result so the login completes even when
        // every waiting request has gone away.
        let task = tokio::spawn(async move {
            let result = acquirer.acquire().await;

            let mut slot = lock(&task_slot);
            slot.in_flight = None;
            match &result {
                Ok(session) => {
                    info!(expires_at = %session.expires_at, "Upstream session acquired");
                    record_session_acquisition("success");
                    slot.session = Some(session.clone());
                }
                Err(e) => {
                    warn!(error = %e, "Upstream session acquisition failed");
                    record_session_acquisition("failure");
                }
            }

            result
        });

        let slot = self.slot.clone();
        async move {
            match task.await {
                Ok(result) => result,
                Err(e) => {
                    lock(&slot).in_flight = None;
                    Err(AuthError::Aborted(e.to_string()))
                }
            }
        }
        .boxed()
        .shared()
    }
}

fn lock(slot: &Mutex<SessionSlot>) -> MutexGuard<'_, SessionSlot> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}
