// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Frame stream decoder
//
// Each chunk delivered by the upstream body is decoded on its own:
// as many complete frames as the chunk holds are extracted, and a
// trailing partial frame is dropped. Nothing is carried over to the next
// chunk. The upstream aligns frame boundaries with chunk boundaries, and
// turning this into a reassembling buffer would change what clients see.
//
// A chunk that yields no frames, or whose frames fail to decode, is handed
// to the fallback decompressor instead.

use std::fmt::Write as _;

use bytes::Bytes;
use futures_util::stream::{Stream, StreamExt};
use prost::Message as _;

use super::fallback::decompress_chunk;
use super::frame::{read_length_prefix, LENGTH_PREFIX_BYTES};
use crate::message::ResponseFragment;

/// Result of the strict frame pass over one chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    /// One or more frames decoded, texts in frame order.
    Frames(Vec<String>),
    /// Not even one complete frame in the chunk.
    NoFrames,
    /// A complete frame whose payload is not a `ResponseFragment`.
    DecodeError(String),
}

/// Extract every complete frame from `chunk`.
pub fn extract_frames(chunk: &[u8]) -> DecodeOutcome {
    let mut cursor = 0usize;
    let mut texts = Vec::new();

    loop {
        let remaining = &chunk[cursor..];
        let Some(len) = read_length_prefix(remaining) else {
            break;
        };
        let available = (remaining.len() - LENGTH_PREFIX_BYTES) as u64;
        if len > available {
            // Incomplete frame: abandon the rest of the chunk.
            break;
        }

        let start = cursor + LENGTH_PREFIX_BYTES;
        let end = start + len as usize;
        match ResponseFragment::decode(&chunk[start..end]) {
            Ok(fragment) => texts.push(fragment.text_lossy()),
            Err(e) => return DecodeOutcome::DecodeError(e.to_string()),
        }
        cursor = end;
    }

    if texts.is_empty() {
        DecodeOutcome::NoFrames
    } else {
        DecodeOutcome::Frames(texts)
    }
}

/// Turn one chunk into the text it carries.
///
/// Frames are joined without a separator. On `NoFrames` or `DecodeError`
/// the result comes from the fallback decompressor and may be empty.
pub fn decode_chunk(chunk: &[u8]) -> String {
    if tracing::enabled!(tracing::Level::TRACE) {
        tracing::trace!(chunk_len = chunk.len(), hex = %hex_preview(chunk, 64), "upstream chunk");
    }

    match extract_frames(chunk) {
        DecodeOutcome::Frames(texts) => texts.concat(),
        DecodeOutcome::NoFrames => {
            tracing::debug!(chunk_len = chunk.len(), "no frames in chunk, trying fallback");
            decompress_chunk(chunk)
        }
        DecodeOutcome::DecodeError(reason) => {
            tracing::debug!(chunk_len = chunk.len(), %reason, "frame decode failed, trying fallback");
            decompress_chunk(chunk)
        }
    }
}

/// Decode a live upstream body chunk by chunk.
///
/// Yields one string per chunk, in arrival order; empty strings included.
/// Transport errors pass through untouched.
pub fn decode_stream<S, E>(input: S) -> impl Stream<Item = Result<String, E>>
where
    S: Stream<Item = Result<Bytes, E>>,
{
    input.map(|item| item.map(|chunk| decode_chunk(&chunk)))
}

fn hex_preview(bytes: &[u8], max: usize) -> String {
    let mut out = String::with_capacity(max.min(bytes.len()) * 2 + 3);
    for b in bytes.iter().take(max) {
        let _ = write!(out, "{b:02x}");
    }
    if bytes.len() > max {
        out.push_str("...");
    }
    out
}
