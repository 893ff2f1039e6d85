// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// HTTP front
//
// Responsibilities:
// - POST /v1/chat/completions: validate, select credential, forward via
//   the injected UpstreamClient
// - Heartbeat endpoint
// - 404 for unknown paths
// - Map every failure to a status and an `{"error", "details"}` body

use axum::body::Body;
use axum::extract::State;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Request, Response, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;

use crate::auth::{select_credential, AuthError};
use crate::codec::CodecError;
use crate::identity::{IdentityError, CHECKSUM_HEADER};
use crate::provider::{parse_body, parse_head, parse_messages, serialize_error, ChatTurn, ProviderError};

/// Largest inbound body accepted.
pub const MAX_REQUEST_BODY: usize = 10 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Domain types
// ---------------------------------------------------------------------------

/// A fully validated chat request, ready to forward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub model: String,
    pub stream: bool,
    /// Upstream credential, already selected from the Authorization header.
    pub token: String,
    /// Caller-supplied checksum header, if any.
    pub checksum: Option<String>,
    pub messages: Vec<ChatTurn>,
}

/// Response produced by the upstream client.
#[derive(Debug)]
pub struct ProxyResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Body,
}

impl ProxyResponse {
    pub fn json(status: StatusCode, body: Vec<u8>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Self {
            status,
            headers,
            body: Body::from(body),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProxyError {
    #[error("request body is empty")]
    EmptyBody,

    #[error(transparent)]
    InvalidRequest(#[from] ProviderError),

    #[error(transparent)]
    Unauthorized(#[from] AuthError),

    #[error(transparent)]
    InvalidHeader(#[from] IdentityError),

    #[error(transparent)]
    Encode(#[from] CodecError),

    #[error("API request failed with status {status}: {body}")]
    UpstreamStatus { status: u16, body: serde_json::Value },

    #[error("upstream request failed: {0}")]
    UpstreamFailure(String),

    #[error("upstream request timed out: {0}")]
    UpstreamTimeout(String),
}

impl ProxyError {
    pub fn status(&self) -> StatusCode {
        match self {
            ProxyError::EmptyBody | ProxyError::InvalidRequest(_) | ProxyError::InvalidHeader(_) => {
                StatusCode::BAD_REQUEST
            }
            ProxyError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ProxyError::Encode(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ProxyError::UpstreamStatus { .. } | ProxyError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ProxyError::UpstreamTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
        }
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> axum::response::Response {
        let status = self.status();
        let reason = status.canonical_reason().unwrap_or("Error");
        let body = serialize_error(reason, &self.to_string());
        ProxyResponse::json(status, body).into_response()
    }
}

impl IntoResponse for ProxyResponse {
    fn into_response(self) -> axum::response::Response {
        let mut response = Response::new(self.body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

// ---------------------------------------------------------------------------
// Trait: UpstreamClient (dependency injection point)
// ---------------------------------------------------------------------------

/// Forwards a validated chat request upstream and shapes the reply.
///
/// Shared across handlers via `Arc`.
#[async_trait::async_trait]
pub trait UpstreamClient: Send + Sync {
    async fn forward(&self, request: ChatRequest) -> Result<ProxyResponse, ProxyError>;
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate an inbound chat request.
///
/// Order: JSON, stream capability, model, credential, messages. A refused
/// streaming model never reaches the credential or message checks.
pub fn validate_request(
    headers: &HeaderMap,
    body: &[u8],
    no_stream_prefixes: &[String],
) -> Result<ChatRequest, ProxyError> {
    if body.is_empty() {
        return Err(ProxyError::EmptyBody);
    }
    let root = parse_body(body)?;
    let head = parse_head(&root, no_stream_prefixes)?;

    let authorization = headers.get(AUTHORIZATION).and_then(|v| v.to_str().ok());
    let token = select_credential(authorization)?;

    let messages = parse_messages(&root)?;

    let checksum = headers
        .get(CHECKSUM_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    Ok(ChatRequest {
        model: head.model,
        stream: head.stream,
        token,
        checksum,
        messages,
    })
}

// ---------------------------------------------------------------------------
// Shared application state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<dyn UpstreamClient>,
    pub no_stream_prefixes: Arc<Vec<String>>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// Heartbeat endpoint: GET /v1/heartbeat -> 200 OK
pub async fn heartbeat() -> StatusCode {
    StatusCode::OK
}

pub async fn chat_completions(
    State(state): State<AppState>,
    request: Request<Body>,
) -> axum::response::Response {
    let headers = request.headers().clone();

    let body = match axum::body::to_bytes(request.into_body(), MAX_REQUEST_BODY).await {
        Ok(b) => b,
        Err(e) => {
            let body = serialize_error("Bad Request", &format!("failed to read request body: {e}"));
            return ProxyResponse::json(StatusCode::BAD_REQUEST, body).into_response();
        }
    };

    let chat = match validate_request(&headers, &body, &state.no_stream_prefixes) {
        Ok(chat) => chat,
        Err(e) => {
            tracing::info!(status = e.status().as_u16(), reason = %e, "request rejected");
            return e.into_response();
        }
    };

    match state.upstream.forward(chat).await {
        Ok(resp) => resp.into_response(),
        Err(e) => {
            tracing::warn!(status = e.status().as_u16(), error = %e, "upstream call failed");
            e.into_response()
        }
    }
}

async fn not_found() -> axum::response::Response {
    ProxyResponse::json(StatusCode::NOT_FOUND, serialize_error("Not Found", "unknown path")).into_response()
}

// ---------------------------------------------------------------------------
// Router construction
// ---------------------------------------------------------------------------

/// Build the axum router. The upstream client is injected.
pub fn build_router(upstream: Arc<dyn UpstreamClient>, no_stream_prefixes: Vec<String>) -> Router {
    let state = AppState {
        upstream,
        no_stream_prefixes: Arc::new(no_stream_prefixes),
    };

    Router::new()
        .route("/v1/heartbeat", get(heartbeat))
        .route("/v1/chat/completions", post(chat_completions))
        .fallback(not_found)
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
