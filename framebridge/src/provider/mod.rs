// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// OpenAI chat-completions adapter
//
// Responsibilities:
// - Parse the inbound chat request JSON (model, messages[], stream)
// - Reject models that cannot stream before anything else is checked
// - Coerce message content to text (strings, JSON values, null)
// - Convert turns into upstream envelope messages
// - Build chat.completion and chat.completion.chunk bodies
// - Serialize error bodies
// - Strip the echoed prompt prefix from accumulated non-streaming text

use bytes::Bytes;
use serde::Serialize;

use crate::message::{ChatRequestMessage, Role};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Request validation failures. All map to 400 Bad Request.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ProviderError {
    #[error("request body is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("Model not supported stream")]
    StreamNotSupported { model: String },

    #[error("Model is required")]
    MissingModel,

    #[error("Messages should be a non-empty array")]
    EmptyMessages,

    #[error("Message at index {index} must be an object")]
    MessageNotObject { index: usize },

    #[error("Message at index {index}: role is required and must be a string")]
    MissingRole { index: usize },

    #[error("System message at index {index} requires content")]
    MissingSystemContent { index: usize },
}

// ---------------------------------------------------------------------------
// Parsed request
// ---------------------------------------------------------------------------

/// Top-level request fields, checked before credentials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub model: String,
    pub stream: bool,
}

/// One inbound turn with its content coerced to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
    pub message_id: Option<String>,
}

impl ChatTurn {
    pub fn to_upstream(&self) -> ChatRequestMessage {
        ChatRequestMessage::new(
            Role::from_chat_role(&self.role),
            self.content.clone(),
            self.message_id.clone(),
        )
    }
}

/// Parse the raw body into JSON.
pub fn parse_body(body: &[u8]) -> Result<serde_json::Value, ProviderError> {
    serde_json::from_slice(body).map_err(|e| ProviderError::InvalidJson(e.to_string()))
}

/// Read `model` and `stream`.
///
/// `stream` is read loosely: `1`, `"true"` or any non-empty string, number
/// other than zero, array or object asks for streaming. `false`, `0`, `""`,
/// `null` and an absent field do not.
///
/// The stream-capability check runs first so that a streaming request for a
/// reserved model is refused regardless of what else is wrong with it.
pub fn parse_head(
    root: &serde_json::Value,
    no_stream_prefixes: &[String],
) -> Result<RequestHead, ProviderError> {
    let model = root.get("model").and_then(|v| v.as_str()).unwrap_or("");
    let stream = root.get("stream").is_some_and(is_truthy);

    if stream && no_stream_prefixes.iter().any(|p| model.starts_with(p.as_str())) {
        return Err(ProviderError::StreamNotSupported {
            model: model.to_string(),
        });
    }

    if model.is_empty() {
        return Err(ProviderError::MissingModel);
    }

    Ok(RequestHead {
        model: model.to_string(),
        stream,
    })
}

fn is_truthy(value: &serde_json::Value) -> bool {
    match value {
        serde_json::Value::Null => false,
        serde_json::Value::Bool(b) => *b,
        serde_json::Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        serde_json::Value::String(s) => !s.is_empty(),
        serde_json::Value::Array(_) | serde_json::Value::Object(_) => true,
    }
}

/// Read and coerce `messages[]`.
pub fn parse_messages(root: &serde_json::Value) -> Result<Vec<ChatTurn>, ProviderError> {
    let messages = match root.get("messages").and_then(|v| v.as_array()) {
        Some(arr) if !arr.is_empty() => arr,
        _ => return Err(ProviderError::EmptyMessages),
    };

    messages
        .iter()
        .enumerate()
        .map(|(index, msg)| parse_turn(index, msg))
        .collect()
}

fn parse_turn(index: usize, msg: &serde_json::Value) -> Result<ChatTurn, ProviderError> {
    let obj = msg
        .as_object()
        .ok_or(ProviderError::MessageNotObject { index })?;

    let role = obj
        .get("role")
        .and_then(|v| v.as_str())
        .filter(|r| !r.is_empty())
        .ok_or(ProviderError::MissingRole { index })?;

    let content = match obj.get("content") {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => {
            if role == "system" {
                return Err(ProviderError::MissingSystemContent { index });
            }
            String::new()
        }
        // Objects, arrays, numbers and booleans keep their JSON text.
        Some(other) => other.to_string(),
    };

    let message_id = obj
        .get("message_id")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());

    Ok(ChatTurn {
        role: role.to_string(),
        content,
        message_id,
    })
}

// ---------------------------------------------------------------------------
// Response bodies
// ---------------------------------------------------------------------------

#[derive(Debug, Serialize)]
pub struct ChatCompletion {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<CompletionChoice>,
    pub usage: Usage,
}

#[derive(Debug, Serialize)]
pub struct CompletionChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: &'static str,
}

#[derive(Debug, Serialize)]
pub struct AssistantMessage {
    pub role: &'static str,
    pub content: String,
}

/// Token accounting is not reported by the upstream; always zero.
#[derive(Debug, Default, Serialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

#[derive(Debug, Serialize)]
pub struct ChatCompletionChunk {
    pub id: String,
    pub object: &'static str,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Serialize)]
pub struct ChunkChoice {
    pub index: u32,
    pub delta: Delta,
}

#[derive(Debug, Serialize)]
pub struct Delta {
    pub content: String,
}

impl ChatCompletion {
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: i64, content: String) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion",
            created,
            model: model.into(),
            choices: vec![CompletionChoice {
                index: 0,
                message: AssistantMessage {
                    role: "assistant",
                    content,
                },
                finish_reason: "stop",
            }],
            usage: Usage::default(),
        }
    }
}

impl ChatCompletionChunk {
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: i64, content: String) -> Self {
        Self {
            id: id.into(),
            object: "chat.completion.chunk",
            created,
            model: model.into(),
            choices: vec![ChunkChoice {
                index: 0,
                delta: Delta { content },
            }],
        }
    }
}

/// Terminal event of every successful stream.
pub const SSE_DONE: &str = "data: [DONE]\n\n";

/// Frame a serializable value as one SSE `data:` event.
pub fn sse_event<T: Serialize>(value: &T) -> Bytes {
    match serde_json::to_string(value) {
        Ok(json) => Bytes::from(format!("data: {json}\n\n")),
        Err(e) => Bytes::from(format!(
            "data: {}\n\n",
            serde_json::json!({ "error": "Internal Server Error", "details": e.to_string() })
        )),
    }
}

/// Error body: `{"error": <status reason>, "details": <message>}`.
pub fn serialize_error(error: &str, details: &str) -> Vec<u8> {
    let response = serde_json::json!({
        "error": error,
        "details": details,
    });
    serde_json::to_vec(&response).unwrap_or_else(|_| error.as_bytes().to_vec())
}

// ---------------------------------------------------------------------------
// Non-streaming text cleanup
// ---------------------------------------------------------------------------

/// Marker closing the echoed user prompt at the head of accumulated output.
pub const END_USER_MARKER: &str = "<|END_USER|>";

/// Remove the echoed prompt from the front of a non-streaming reply.
///
/// Drops everything through the last `<|END_USER|>`, then a leading newline
/// and at most one ASCII letter after it, then trims whitespace.
pub fn strip_prompt_prefix(text: &str) -> String {
    let after_marker = match text.rfind(END_USER_MARKER) {
        Some(pos) => &text[pos + END_USER_MARKER.len()..],
        None => text,
    };

    let rest = match after_marker.strip_prefix('\n') {
        Some(rest) => match rest.chars().next() {
            Some(c) if c.is_ascii_alphabetic() => &rest[1..],
            _ => rest,
        },
        None => after_marker,
    };

    rest.trim().to_string()
}
