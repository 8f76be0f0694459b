//! Health and informational endpoints
//!
//! - `/health` - Service status plus the cached upstream session state
//! - `/` - Static description of the API
//!
//! Neither endpoint contacts the upstream.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;

use crate::session::SessionStatus;
use crate::AppState;

/// Health status enum
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
}

/// Full health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub timestamp: String,
    pub session: SessionStatus,
}

/// Endpoint listing in the root response
#[derive(Debug, Serialize)]
pub struct EndpointIndex {
    pub chat: &'static str,
    pub health: &'static str,
}

/// Root endpoint response
#[derive(Debug, Serialize)]
pub struct RootResponse {
    pub message: &'static str,
    pub version: &'static str,
    pub endpoints: EndpointIndex,
    pub authentication: &'static str,
}

/// Health check endpoint
pub async fn health_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<HealthResponse>) {
    let response = HealthResponse {
        status: HealthStatus::Healthy,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        timestamp: chrono::Utc::now().to_rfc3339(),
        session: state.session_store.status(),
    };

    (StatusCode::OK, Json(response))
}

/// Root endpoint with API information
pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "Chat Completions API",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: EndpointIndex {
            chat: "/v1/chat/completions",
            health: "/health",
        },
        authentication: "Bearer token required",
    })
}
