// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Upstream binary framing
//
// Responsibilities:
// - Encode one validated envelope into one length-prefixed frame
// - Split each inbound chunk into frames and decode their text
// - Fall back to gzip interpretation when a chunk is not frames
// - Drop prompt echoes surfaced by the fallback
// - No buffering across chunks

mod decoder;
mod fallback;
mod frame;

pub use decoder::{decode_chunk, decode_stream, extract_frames, DecodeOutcome};
pub use fallback::{decompress_chunk, is_prompt_echo, FALLBACK_HEADER_BYTES};
pub use frame::{
    encode_envelope, encode_frame, length_prefix_hex, read_length_prefix, CodecError,
    LENGTH_PREFIX_BYTES, MAX_FRAME_PAYLOAD,
};
