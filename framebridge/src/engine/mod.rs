// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Engine
//
// The `UpstreamClient` behind the HTTP front:
// - Build the outbound envelope from validated turns
// - Encode it as one frame
// - Send it with the client-identity headers
// - Non-success status -> 502 with the upstream's JSON body when it has one
// - Streaming: relay decoded chunks as SSE events
// - Non-streaming: accumulate, strip the echoed prompt, answer once

use async_trait::async_trait;
use axum::body::Body;
use axum::http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use std::convert::Infallible;
use std::pin::Pin;
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};
use uuid::Uuid;

use crate::codec::encode_envelope;
use crate::config::Config;
use crate::identity::{upstream_headers, ConfiguredIdentity, IdentityProvider};
use crate::message::{ChatRequestMessage, OutboundEnvelope};
use crate::provider::{strip_prompt_prefix, ChatCompletion};
use crate::proxy::{ChatRequest, ProxyError, ProxyResponse, UpstreamClient};
use crate::stream::{accumulate_text, SseRelay};


/// Cap on how much of a failed upstream response body is read.
const MAX_ERROR_BODY: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Request context for structured logging
// ---------------------------------------------------------------------------

struct RequestContext {
    request_id: String,
    config_hash: String,
    model: String,
    stream: bool,
    messages: usize,
}

// ---------------------------------------------------------------------------
// Interfaces
// ---------------------------------------------------------------------------

/// Sends HTTP requests upstream.
#[async_trait]
pub trait HttpSender: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

// ---------------------------------------------------------------------------
// Transport types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub timeout_ms: Option<u64>,
}

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, HttpError>> + Send>>;

/// Status plus the live body. The body is never buffered: frames are
/// decoded per network chunk.
pub struct HttpResponse {
    pub status: StatusCode,
    pub body: ByteStream,
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum HttpError {
    #[error("upstream request failed: {0}")]
    Transport(String),
    #[error("upstream request timed out: {0}")]
    Timeout(String),
}

impl From<HttpError> for ProxyError {
    fn from(e: HttpError) -> Self {
        match e {
            HttpError::Timeout(msg) => ProxyError::UpstreamTimeout(msg),
            HttpError::Transport(msg) => ProxyError::UpstreamFailure(msg),
        }
    }
}

// ---------------------------------------------------------------------------
// Engine dependencies
// ---------------------------------------------------------------------------

pub struct EngineDeps {
    pub config: Arc<Config>,
    pub http: Arc<dyn HttpSender>,
    pub identity: Arc<dyn IdentityProvider>,
}

// ---------------------------------------------------------------------------
// EngineUpstreamClient
// ---------------------------------------------------------------------------

pub struct EngineUpstreamClient {
    deps: EngineDeps,
}

impl EngineUpstreamClient {
    pub fn new_with(deps: EngineDeps) -> Self {
        Self { deps }
    }
}

#[async_trait]
impl UpstreamClient for EngineUpstreamClient {
    async fn forward(&self, request: ChatRequest) -> Result<ProxyResponse, ProxyError> {
        let ctx = RequestContext {
            request_id: Uuid::new_v4().to_string(),
            config_hash: self.deps.config.config_hash.clone(),
            model: request.model.clone(),
            stream: request.stream,
            messages: request.messages.len(),
        };

        tracing::debug!(
            request_id = %ctx.request_id,
            config_hash = %ctx.config_hash,
            model = %ctx.model,
            stream = ctx.stream,
            messages = ctx.messages,
            "processing request"
        );

        // 1) Envelope and frame
        let turns: Vec<ChatRequestMessage> = request.messages.iter().map(|t| t.to_upstream()).collect();
        let envelope = OutboundEnvelope::build(turns, &request.model, &self.deps.config.envelope)
            .map_err(crate::codec::CodecError::from)?;
        let body = encode_envelope(&envelope)?;

        // 2) Headers
        let headers = upstream_headers(
            self.deps.identity.as_ref(),
            &request.token,
            request.checksum.as_deref(),
        )?;

        // 3) Send
        let http_req = HttpRequest {
            method: Method::POST,
            url: self.deps.config.upstream.url.clone(),
            headers,
            body,
            timeout_ms: self.deps.config.upstream.timeout_ms,
        };

        let started = Instant::now();
        let upstream = self.deps.http.send(http_req).await.map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, model = %ctx.model, error = %e, "upstream send failed");
            ProxyError::from(e)
        })?;

        tracing::info!(
            request_id = %ctx.request_id,
            model = %ctx.model,
            stream = ctx.stream,
            status = upstream.status.as_u16(),
            latency_ms = started.elapsed().as_secs_f64() * 1000.0,
            "upstream responded"
        );

        if !upstream.status.is_success() {
            return Err(upstream_status_error(upstream, &ctx).await);
        }

        if ctx.stream {
            Ok(self.handle_streaming_response(upstream, &ctx))
        } else {
            self.handle_non_streaming_response(upstream, &ctx).await
        }
    }
}

impl EngineUpstreamClient {
    fn handle_streaming_response(&self, upstream: HttpResponse, ctx: &RequestContext) -> ProxyResponse {
        let relay = SseRelay::new(completion_id(), &*ctx.model, unix_now());
        let events = relay.relay(upstream.body);

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/event-stream"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));
        headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));

        ProxyResponse {
            status: StatusCode::OK,
            headers,
            body: Body::from_stream(events.map(Ok::<_, Infallible>)),
        }
    }

    async fn handle_non_streaming_response(
        &self,
        upstream: HttpResponse,
        ctx: &RequestContext,
    ) -> Result<ProxyResponse, ProxyError> {
        let text = accumulate_text(upstream.body).await.map_err(|e| {
            tracing::warn!(request_id = %ctx.request_id, error = %e, "upstream body failed");
            ProxyError::from(e)
        })?;

        let content = strip_prompt_prefix(&text);
        tracing::debug!(
            request_id = %ctx.request_id,
            raw_len = text.len(),
            content_len = content.len(),
            "non-streaming reply assembled"
        );

        let completion = ChatCompletion::new(completion_id(), &*ctx.model, unix_now(), content);
        let body = serde_json::to_vec(&completion)
            .map_err(|e| ProxyError::UpstreamFailure(format!("failed to serialize completion: {e}")))?;
        Ok(ProxyResponse::json(StatusCode::OK, body))
    }
}

// ---------------------------------------------------------------------------
// Reqwest HTTP sender
// ---------------------------------------------------------------------------

pub struct ReqwestHttpSender {
    client: reqwest::Client,
}

impl ReqwestHttpSender {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpSender for ReqwestHttpSender {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let mut req = self
            .client
            .request(request.method, &request.url)
            .headers(request.headers)
            .body(request.body);

        if let Some(timeout_ms) = request.timeout_ms {
            req = req.timeout(std::time::Duration::from_millis(timeout_ms));
        }

        let resp = req.send().await.map_err(map_reqwest_error)?;

        let status = resp.status();
        let body = resp.bytes_stream().map(|item| item.map_err(map_reqwest_error));

        Ok(HttpResponse {
            status,
            body: Box::pin(body),
        })
    }
}

fn map_reqwest_error(e: reqwest::Error) -> HttpError {
    if e.is_timeout() {
        HttpError::Timeout(e.to_string())
    } else {
        HttpError::Transport(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// Public factory for default engine client
// ---------------------------------------------------------------------------

pub fn build_engine_client(config: Arc<Config>) -> EngineUpstreamClient {
    let identity = ConfiguredIdentity::new(config.identity.clone());
    let deps = EngineDeps {
        config,
        http: Arc::new(ReqwestHttpSender::new(reqwest::Client::new())),
        identity: Arc::new(identity),
    };

    EngineUpstreamClient::new_with(deps)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Read what the upstream said about a failure. Non-JSON bodies become `{}`.
async fn upstream_status_error(upstream: HttpResponse, ctx: &RequestContext) -> ProxyError {
    let status = upstream.status.as_u16();
    let mut stream = upstream.body;
    let mut collected = Vec::new();

    while let Some(chunk) = stream.next().await {
        match chunk {
            Ok(bytes) => {
                collected.extend_from_slice(&bytes);
                if collected.len() >= MAX_ERROR_BODY {
                    collected.truncate(MAX_ERROR_BODY);
                    break;
                }
            }
            Err(_) => break,
        }
    }

    let body = serde_json::from_slice::<serde_json::Value>(&collected)
        .unwrap_or_else(|_| serde_json::json!({}));

    tracing::warn!(
        request_id = %ctx.request_id,
        model = %ctx.model,
        status,
        body_len = collected.len(),
        "upstream returned non-success status"
    );

    ProxyError::UpstreamStatus { status, body }
}

fn completion_id() -> String {
    format!("chatcmpl-{}", Uuid::new_v4())
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}
