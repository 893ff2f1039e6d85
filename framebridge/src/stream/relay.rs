// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use std::fmt::Display;

use bytes::Bytes;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use crate::codec::decode_stream;
use crate::provider::{serialize_error, sse_event, ChatCompletionChunk, SSE_DONE};

/// Converts a framed upstream body into an OpenAI-style SSE byte stream.
///
/// All chunks of one call share the completion id, model and timestamp.
pub struct SseRelay {
    id: String,
    model: String,
    created: i64,
}

impl SseRelay {
    pub fn new(id: impl Into<String>, model: impl Into<String>, created: i64) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
            created,
        }
    }

    /// Spawn the relay task and return the client-facing stream.
    ///
    /// The task ends when the upstream body ends, when it fails, or when the
    /// receiving side is dropped.
    pub fn relay<S, E>(self, input: S) -> impl Stream<Item = Bytes>
    where
        S: Stream<Item = Result<Bytes, E>> + Send + 'static,
        E: Display + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<Bytes>(64);

        tokio::spawn(async move {
            let mut decoded = Box::pin(decode_stream(input));
            let mut fragments = 0usize;

            while let Some(item) = decoded.next().await {
                match item {
                    Ok(text) => {
                        if text.is_empty() {
                            continue;
                        }
                        fragments += 1;
                        let chunk = ChatCompletionChunk::new(&*self.id, &*self.model, self.created, text);
                        if tx.send(sse_event(&chunk)).await.is_err() {
                            tracing::debug!(id = %self.id, fragments, "client disconnected, abandoning upstream body");
                            return;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(id = %self.id, fragments, error = %e, "upstream body failed mid-stream");
                        let _ = tx.send(error_event(&e.to_string())).await;
                        return;
                    }
                }
            }

            tracing::debug!(id = %self.id, fragments, "stream complete");
            let _ = tx.send(Bytes::from_static(SSE_DONE.as_bytes())).await;
        });

        ReceiverStream::new(rx)
    }
}

/// Decode and concatenate a whole upstream body.
pub async fn accumulate_text<S, E>(input: S) -> Result<String, E>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    let mut decoded = Box::pin(decode_stream(input));
    let mut text = String::new();
    while let Some(item) = decoded.next().await {
        text.push_str(&item?);
    }
    Ok(text)
}

fn error_event(details: &str) -> Bytes {
    let mut event = b"data: ".to_vec();
    event.extend_from_slice(&serialize_error("Bad Gateway", details));
    event.extend_from_slice(b"\n\n");
    Bytes::from(event)
}
