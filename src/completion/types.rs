//! Chat completion request and response types
//!
//! Inbound requests are accepted loosely (any role string, optional model
//! and temperature) and normalized into [`ChatRequest`] before anything is
//! sent upstream.

use std::io;

use bytes::Bytes;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::ser::Formatter;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

pub const DEFAULT_MODEL: &str = "llama3.2:1b";
pub const DEFAULT_TEMPERATURE: f64 = 0.7;

/// Chat message role accepted by the upstream
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Map an inbound role string; anything unrecognized becomes `User`
    pub fn normalize(raw: &str) -> Self {
        match raw {
            "system" => Role::System,
            "assistant" => Role::Assistant,
            _ => Role::User,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

fn default_role() -> String {
    "user".to_string()
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Message as sent by the caller
#[derive(Debug, Clone, Deserialize)]
pub struct IncomingMessage {
    #[serde(default = "default_role")]
    pub role: String,
    pub content: String,
}

/// Chat completion request body
#[derive(Debug, Clone, Deserialize)]
pub struct ChatCompletionRequest {
    #[serde(default = "default_model")]
    pub model: String,
    pub messages: Vec<IncomingMessage>,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
}

impl ChatCompletionRequest {
    /// Validate and normalize roles
    pub fn into_chat_request(self) -> AppResult<ChatRequest> {
        if self.messages.is_empty() {
            return Err(AppError::BadRequest(
                "messages must contain at least one message".to_string(),
            ));
        }

        Ok(ChatRequest {
            model: self.model,
            messages: self
                .messages
                .into_iter()
                .map(|m| ChatMessage {
                    role: Role::normalize(&m.role),
                    content: m.content,
                })
                .collect(),
            temperature: self.temperature,
        })
    }
}

/// Normalized chat message
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

/// Normalized chat request forwarded upstream
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f64,
}

/// Usage statistics
///
/// Counts are whitespace-separated words, not tokenizer output.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    pub fn estimate(messages: &[ChatMessage], completion: &str) -> Self {
        let prompt_tokens = whitespace_tokens(&serialize_messages(messages));
        let completion_tokens = whitespace_tokens(completion);
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }
}

/// Number of whitespace-separated words in `text`
pub fn whitespace_tokens(text: &str) -> u64 {
    text.split_whitespace().count() as u64
}

/// JSON form of the message list used for prompt token estimates
///
/// Separators are `", "` and `": "`, so every key and value of every
/// message is its own word.
pub fn serialize_messages(messages: &[ChatMessage]) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    if messages.serialize(&mut serializer).is_err() {
        return String::new();
    }
    String::from_utf8(buf).unwrap_or_default()
}

/// Single-line JSON with a space after each `,` and `:`
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

/// Chat completion choice
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletionChoice {
    pub index: u32,
    pub message: ChatMessage,
    pub finish_reason: Option<String>,
}

/// OpenAI-compatible chat completion response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompletionResult {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatCompletionChoice>,
    pub usage: Usage,
}

impl CompletionResult {
    /// Wrap free-form generated text as a single assistant choice
    pub fn from_generation(model: &str, messages: &[ChatMessage], text: String) -> Self {
        let usage = Usage::estimate(messages, &text);
        Self {
            id: format!("chatcmpl-{}", Uuid::new_v4().simple()),
            object: "chat.completion".to_string(),
            created: Utc::now().timestamp(),
            model: model.to_string(),
            choices: vec![ChatCompletionChoice {
                index: 0,
                message: ChatMessage {
                    role: Role::Assistant,
                    content: text,
                },
                finish_reason: Some("stop".to_string()),
            }],
            usage,
        }
    }
}

/// What the gateway hands back for a successful completion
#[derive(Debug, Clone)]
pub enum CompletionOutcome {
    /// Upstream body returned exactly as received
    Passthrough(Bytes),
    /// Upstream generation wrapped into the OpenAI shape
    Normalized(CompletionResult),
}
