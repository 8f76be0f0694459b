//! Chat completions endpoint
//!
//! OpenAI-compatible chat completions API endpoint (non-streaming only).

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use tracing::{debug, info, warn};

use crate::{
    completion::{ChatCompletionRequest, CompletionOutcome},
    error::AppError,
    routes::metrics::record_request,
    AppState,
};

/// Handle chat completion requests
///
/// The API key has already been checked by the auth middleware.
pub async fn chat_completions(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<ChatCompletionRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let start_time = Instant::now();

    let Json(body) =
        payload.map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e)))?;
    let request = body.into_chat_request()?;
    let model = request.model.clone();

    info!(
        model = %model,
        messages = %request.messages.len(),
        "Processing chat completion request"
    );
    for message in &request.messages {
        debug!(
            role = message.role.as_str(),
            content = %message.content.chars().take(100).collect::<String>(),
            "Message"
        );
    }

    let result = state.dispatcher.complete(&request).await;
    let duration = start_time.elapsed().as_secs_f64();

    match result {
        Ok(outcome) => {
            record_request("success", duration);
            info!(
                model = %model,
                duration_ms = %format!("{:.2}", duration * 1000.0),
                "Chat completion request completed"
            );
            Ok(outcome_response(outcome))
        }
        Err(e) => {
            record_request("error", duration);
            warn!(model = %model, error = %e, "Chat completion request failed");
            Err(e)
        }
    }
}

fn outcome_response(outcome: CompletionOutcome) -> Response {
    match outcome {
        CompletionOutcome::Passthrough(bytes) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "application/json")],
            Body::from(bytes),
        )
            .into_response(),
        CompletionOutcome::Normalized(result) => (StatusCode::OK, Json(result)).into_response(),
    }
}
