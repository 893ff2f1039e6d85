// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Fallback decompressor
//
// Upstream error and edge conditions arrive as a gzip blob behind a 5-byte
// header instead of as frames. Anything that fails to decompress is noise
// and yields an empty string. A payload that echoes the whole prompt back
// (system and user delimiters) is dropped as well.

use std::io::Read as _;
use std::sync::OnceLock;

use flate2::read::MultiGzDecoder;
use regex::Regex;

/// Bytes skipped before the compressed payload.
pub const FALLBACK_HEADER_BYTES: usize = 5;

const ECHO_SENTINEL: &str =
    r"(?s)<\|BEGIN_SYSTEM\|>.*?<\|END_SYSTEM\|>.*?<\|BEGIN_USER\|>.*?<\|END_USER\|>";

fn echo_sentinel() -> &'static Regex {
    static SENTINEL: OnceLock<Regex> = OnceLock::new();
    // Our own constant pattern.
    SENTINEL.get_or_init(|| Regex::new(ECHO_SENTINEL).expect("echo sentinel regex is invalid"))
}

/// True when `text` is an echo of the full prompt rather than new output.
pub fn is_prompt_echo(text: &str) -> bool {
    echo_sentinel().is_match(text)
}

/// Interpret `chunk` as a header plus gzip payload.
///
/// Never fails: undecodable input and prompt echoes both produce `""`.
pub fn decompress_chunk(chunk: &[u8]) -> String {
    let Some(body) = chunk.get(FALLBACK_HEADER_BYTES..) else {
        tracing::debug!(chunk_len = chunk.len(), "fallback chunk shorter than header");
        return String::new();
    };

    let mut decompressed = Vec::new();
    if let Err(e) = MultiGzDecoder::new(body).read_to_end(&mut decompressed) {
        tracing::debug!(chunk_len = chunk.len(), error = %e, "fallback chunk is not gzip");
        return String::new();
    }

    let text = String::from_utf8_lossy(&decompressed).into_owned();
    if is_prompt_echo(&text) {
        tracing::debug!(len = text.len(), "dropping prompt echo from fallback payload");
        return String::new();
    }
    text
}
