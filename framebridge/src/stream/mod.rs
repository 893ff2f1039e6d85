// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Upstream body relay
//
// Responsibilities:
// - Decode the upstream body chunk by chunk, in arrival order
// - Streaming: one chat.completion.chunk event per non-empty chunk,
//   then `data: [DONE]`
// - Streaming: a transport error mid-body becomes one in-band error event
//   and the stream closes without `[DONE]`
// - Stop reading upstream once the client has gone away
// - Non-streaming: concatenate every chunk's text

mod relay;

pub use relay::{accumulate_text, SseRelay};

#[cfg(test)]
mod tests;
