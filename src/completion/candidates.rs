//! Candidate upstream endpoints
//!
//! The upstream's real completion route is not known in advance. Each
//! candidate pairs a path with the payload shape it expects and the way its
//! response is read. Chat-shaped candidates come before generate-shaped ones.

use serde_json::{json, Value};

use crate::completion::types::ChatRequest;

/// How a successful upstream body should be treated
#[derive(Debug, Clone, PartialEq)]
pub enum Interpretation {
    /// Already OpenAI-shaped (`choices` present)
    OpenAi,
    /// Free-form generation (`response` present), trimmed
    Generation(String),
    /// Neither shape; handed back as-is
    Unrecognized,
}

/// One guessed upstream endpoint
#[derive(Debug, Clone, Copy)]
pub struct CandidateEndpoint {
    pub path: &'static str,
    pub build_payload: fn(&ChatRequest) -> Value,
    pub interpret: fn(&Value) -> Interpretation,
}

/// Candidates in trial order
pub const DEFAULT_CANDIDATES: &[CandidateEndpoint] = &[
    CandidateEndpoint {
        path: "/api/v1/chat/completions",
        build_payload: chat_payload,
        interpret: interpret_response,
    },
    CandidateEndpoint {
        path: "/api/chat/completions",
        build_payload: chat_payload,
        interpret: interpret_response,
    },
    CandidateEndpoint {
        path: "/ollama/v1/chat/completions",
        build_payload: chat_payload,
        interpret: interpret_response,
    },
    CandidateEndpoint {
        path: "/api/generate",
        build_payload: generate_payload,
        interpret: interpret_response,
    },
    CandidateEndpoint {
        path: "/ollama/api/generate",
        build_payload: generate_payload,
        interpret: interpret_response,
    },
];

/// OpenAI-style chat payload
pub fn chat_payload(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "messages": request.messages,
        "temperature": request.temperature,
        "stream": false,
    })
}

/// Ollama-style generate payload with the conversation flattened into a prompt
pub fn generate_payload(request: &ChatRequest) -> Value {
    json!({
        "model": request.model,
        "prompt": build_prompt(request),
        "stream": false,
        "temperature": request.temperature,
    })
}

/// `role: content` lines followed by an open assistant turn
pub fn build_prompt(request: &ChatRequest) -> String {
    let mut prompt = request
        .messages
        .iter()
        .map(|m| format!("{}: {}", m.role.as_str(), m.content))
        .collect::<Vec<_>>()
        .join("\n");
    prompt.push_str("\nassistant:");
    prompt
}

pub fn interpret_response(body: &Value) -> Interpretation {
    if body.get("choices").is_some() {
        Interpretation::OpenAi
    } else if let Some(response) = body.get("response") {
        Interpretation::Generation(response.as_str().unwrap_or_default().trim().to_string())
    } else {
        Interpretation::Unrecognized
    }
}
