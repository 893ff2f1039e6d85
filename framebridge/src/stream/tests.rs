// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Relay tests
//
//  1. Fragments forwarded in order as chunk events, then [DONE]
//  2. Empty fragments produce no event
//  3. Gzip fallback text is forwarded like frame text
//  4. Transport error -> in-band error event, no [DONE]
//  5. Dropped receiver stops the relay
//  6. Accumulation concatenates chunk texts

use super::*;
use crate::codec::encode_frame;
use crate::message::ResponseFragment;
use bytes::Bytes;
use flate2::write::GzEncoder;
use flate2::Compression;
use prost::Message as _;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio_stream::StreamExt;

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

fn frames(texts: &[&str]) -> Bytes {
    let mut out = Vec::new();
    for text in texts {
        let payload = ResponseFragment::new(text).encode_to_vec();
        out.extend_from_slice(&encode_frame(&payload).unwrap());
    }
    Bytes::from(out)
}

fn gzip_chunk(text: &str) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    let mut chunk = vec![0x02, 0, 0, 0, 0x30];
    chunk.extend_from_slice(&encoder.finish().unwrap());
    Bytes::from(chunk)
}

async fn collect_events(stream: impl tokio_stream::Stream<Item = Bytes>) -> Vec<String> {
    let bytes: Vec<Bytes> = stream.collect().await;
    let joined: String = bytes
        .iter()
        .map(|b| String::from_utf8(b.to_vec()).unwrap())
        .collect();
    joined
        .split("\n\n")
        .filter(|e| !e.is_empty())
        .map(|e| e.strip_prefix("data: ").unwrap().to_string())
        .collect()
}

fn delta_of(event: &str) -> String {
    let json: serde_json::Value = serde_json::from_str(event).unwrap();
    json["choices"][0]["delta"]["content"].as_str().unwrap().to_string()
}

fn relay() -> SseRelay {
    SseRelay::new("chatcmpl-test", "gpt-x", 1_700_000_000)
}

// ---------------------------------------------------------------------------
// Test 1: ordered events and terminator
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fragments_forwarded_in_order_then_done() {
    let input = tokio_stream::iter(vec![
        Ok::<_, String>(frames(&["Hel", "lo"])),
        Ok(frames(&[", world"])),
    ]);

    let events = collect_events(relay().relay(input)).await;

    assert_eq!(events.len(), 3);
    assert_eq!(delta_of(&events[0]), "Hello");
    assert_eq!(delta_of(&events[1]), ", world");
    assert_eq!(events[2], "[DONE]");

    let first: serde_json::Value = serde_json::from_str(&events[0]).unwrap();
    assert_eq!(first["id"], "chatcmpl-test");
    assert_eq!(first["model"], "gpt-x");
    assert_eq!(first["object"], "chat.completion.chunk");
    assert_eq!(first["created"], 1_700_000_000);
}

// ---------------------------------------------------------------------------
// Test 2: empty fragments suppressed
// ---------------------------------------------------------------------------

#[tokio::test]
async fn empty_chunks_emit_nothing() {
    let input = tokio_stream::iter(vec![
        Ok::<_, String>(frames(&[""])),
        Ok(Bytes::from_static(b"\xff\xff\xff\xff\xffnoise")),
        Ok(frames(&["x"])),
    ]);

    let events = collect_events(relay().relay(input)).await;
    assert_eq!(events.len(), 2);
    assert_eq!(delta_of(&events[0]), "x");
    assert_eq!(events[1], "[DONE]");
}

#[tokio::test]
async fn empty_body_emits_only_done() {
    let input = tokio_stream::iter(Vec::<Result<Bytes, String>>::new());
    let events = collect_events(relay().relay(input)).await;
    assert_eq!(events, vec!["[DONE]".to_string()]);
}

// ---------------------------------------------------------------------------
// Test 3: fallback text
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fallback_text_is_forwarded() {
    let input = tokio_stream::iter(vec![
        Ok::<_, String>(gzip_chunk(r#"{"error":"quota"}"#)),
        Ok(gzip_chunk("<|BEGIN_SYSTEM|>s<|END_SYSTEM|><|BEGIN_USER|>u<|END_USER|>")),
    ]);

    let events = collect_events(relay().relay(input)).await;
    assert_eq!(events.len(), 2);
    assert_eq!(delta_of(&events[0]), r#"{"error":"quota"}"#);
    assert_eq!(events[1], "[DONE]");
}

// ---------------------------------------------------------------------------
// Test 4: mid-stream failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn transport_error_becomes_in_band_error_event() {
    let input = tokio_stream::iter(vec![
        Ok(frames(&["partial"])),
        Err("connection reset".to_string()),
        Ok(frames(&["never sent"])),
    ]);

    let events = collect_events(relay().relay(input)).await;
    assert_eq!(events.len(), 2);
    assert_eq!(delta_of(&events[0]), "partial");

    let error: serde_json::Value = serde_json::from_str(&events[1]).unwrap();
    assert_eq!(error["error"], "Bad Gateway");
    assert_eq!(error["details"], "connection reset");
    assert!(!events.iter().any(|e| e == "[DONE]"));
}

// ---------------------------------------------------------------------------
// Test 5: client disconnect
// ---------------------------------------------------------------------------

#[tokio::test]
async fn dropped_receiver_stops_reading_upstream() {
    let pulled = Arc::new(AtomicUsize::new(0));
    let counter = pulled.clone();
    let input = tokio_stream::iter(0..10_000).map(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok::<_, String>(frames(&["tick"]))
    });

    let mut out = Box::pin(relay().relay(input));
    assert!(out.next().await.is_some());
    drop(out);

    // Let the relay task observe the closed channel.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    let seen = pulled.load(Ordering::SeqCst);
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    assert_eq!(pulled.load(Ordering::SeqCst), seen);
    assert!(seen < 10_000);
}

// ---------------------------------------------------------------------------
// Test 6: accumulation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accumulate_concatenates_chunks() {
    let input = tokio_stream::iter(vec![
        Ok::<_, String>(frames(&["a", "b"])),
        Ok(frames(&[""])),
        Ok(frames(&["c"])),
    ]);
    assert_eq!(accumulate_text(input).await.unwrap(), "abc");
}

#[tokio::test]
async fn accumulate_stops_at_first_error() {
    let input = tokio_stream::iter(vec![Ok(frames(&["a"])), Err("boom".to_string())]);
    assert_eq!(accumulate_text(input).await.unwrap_err(), "boom");
}
