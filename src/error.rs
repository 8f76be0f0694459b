//! Error types for Conduit
//!
//! This module defines custom error types used throughout the application.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::completion::CandidateFailure;
use crate::session::AuthError;

/// Application-level errors
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Authentication required")]
    Unauthorized,

    #[error("Invalid API key")]
    InvalidApiKey,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Failed to authenticate with upstream: {0}")]
    Authentication(#[from] AuthError),

    #[error("All upstream chat endpoints failed. Errors: {}", join_failures(.0))]
    UpstreamExhausted(Vec<CandidateFailure>),
}

fn join_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Error response body
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Per-candidate failure lines, in trial order
#[derive(Debug, Serialize)]
pub struct ErrorDetails {
    pub failures: Vec<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match &self {
            AppError::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "UNAUTHORIZED",
                self.to_string(),
                None,
            ),
            AppError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "INVALID_API_KEY",
                self.to_string(),
                None,
            ),
            AppError::BadRequest(msg) => (
                StatusCode::BAD_REQUEST,
                "BAD_REQUEST",
                msg.clone(),
                None,
            ),
            AppError::Configuration(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "CONFIGURATION_ERROR",
                msg.clone(),
                None,
            ),
            AppError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "UPSTREAM_AUTH_FAILED",
                self.to_string(),
                None,
            ),
            AppError::UpstreamExhausted(failures) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "UPSTREAM_EXHAUSTED",
                self.to_string(),
                Some(ErrorDetails {
                    failures: failures.iter().map(ToString::to_string).collect(),
                }),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        };

        let mut response = (status, Json(body)).into_response();
        if status == StatusCode::UNAUTHORIZED {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
        }
        response
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;
