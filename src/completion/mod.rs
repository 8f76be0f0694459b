//! Completion module
//!
//! Endpoint discovery and response normalization for chat completions.

pub mod candidates;
pub mod dispatcher;
pub mod types;

pub use candidates::{CandidateEndpoint, Interpretation, DEFAULT_CANDIDATES};
pub use dispatcher::{CandidateFailure, CompletionDispatcher, FailureReason};
pub use types::{
    ChatCompletionRequest, ChatMessage, ChatRequest, CompletionOutcome, CompletionResult, Role,
    Usage,
};
