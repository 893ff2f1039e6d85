// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Frame encoder
//
// A frame is a fixed-width length prefix followed by exactly that many
// payload bytes. The prefix is 5 bytes, big-endian: the raw form of a
// 10-character, zero-padded hexadecimal byte count.

use bytes::{BufMut, Bytes, BytesMut};

use crate::message::{ModelError, OutboundEnvelope};

/// Width of the length prefix in bytes (10 hex characters).
pub const LENGTH_PREFIX_BYTES: usize = 5;

/// Largest payload a 5-byte prefix can describe.
pub const MAX_FRAME_PAYLOAD: u64 = (1 << 40) - 1;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    Invalid(#[from] ModelError),

    #[error("frame payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: u64 },
}

/// Validate, serialize and frame an envelope into a request body.
pub fn encode_envelope(envelope: &OutboundEnvelope) -> Result<Bytes, CodecError> {
    let violations = envelope.validate();
    if !violations.is_empty() {
        return Err(ModelError::Invalid(violations).into());
    }
    encode_frame(&envelope.to_bytes())
}

/// Prefix `payload` with its length.
pub fn encode_frame(payload: &[u8]) -> Result<Bytes, CodecError> {
    let len = payload.len() as u64;
    if len > MAX_FRAME_PAYLOAD {
        return Err(CodecError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_FRAME_PAYLOAD,
        });
    }

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_BYTES + payload.len());
    // Low 5 bytes of the big-endian u64.
    buf.put_slice(&len.to_be_bytes()[8 - LENGTH_PREFIX_BYTES..]);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// Read the payload length from the first 5 bytes, if present.
pub fn read_length_prefix(bytes: &[u8]) -> Option<u64> {
    let prefix = bytes.get(..LENGTH_PREFIX_BYTES)?;
    Some(prefix.iter().fold(0u64, |acc, b| (acc << 8) | u64::from(*b)))
}

/// Render a length the way the upstream documents it: 10 uppercase hex digits.
pub fn length_prefix_hex(len: u64) -> String {
    format!("{len:010X}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{ChatRequestMessage, EnvelopeTemplate, Role};
    use prost::Message as _;

    fn envelope() -> OutboundEnvelope {
        OutboundEnvelope::build(
            vec![ChatRequestMessage::new(Role::User, "hi", Some("m1".into()))],
            "gpt-x",
            &EnvelopeTemplate {
                instruction: "Always respond in English".into(),
                project_path: "/path/to/project".into(),
            },
        )
        .unwrap()
    }

    #[test]
    fn prefix_is_hex_length_rendered_as_bytes() {
        let frame = encode_frame(&[0xAB; 300]).unwrap();
        let hex: String = frame[..LENGTH_PREFIX_BYTES]
            .iter()
            .map(|b| format!("{b:02X}"))
            .collect();
        assert_eq!(hex, length_prefix_hex(300));
        assert_eq!(hex, "000000012C");
        assert_eq!(frame.len(), LENGTH_PREFIX_BYTES + 300);
    }

    #[test]
    fn empty_payload_is_a_bare_prefix() {
        let frame = encode_frame(&[]).unwrap();
        assert_eq!(&frame[..], &[0, 0, 0, 0, 0]);
    }

    #[test]
    fn read_length_prefix_inverts_encoding() {
        let frame = encode_frame(b"hello").unwrap();
        assert_eq!(read_length_prefix(&frame), Some(5));
        assert_eq!(read_length_prefix(&[0x01, 0x00, 0x00, 0x00, 0x00]), Some(1 << 32));
        assert_eq!(read_length_prefix(&[0, 0, 0]), None);
    }

    #[test]
    fn encoded_envelope_payload_decodes_back() {
        let env = envelope();
        let frame = encode_envelope(&env).unwrap();

        let len = read_length_prefix(&frame).unwrap() as usize;
        assert_eq!(len, frame.len() - LENGTH_PREFIX_BYTES);

        let decoded = OutboundEnvelope::decode(&frame[LENGTH_PREFIX_BYTES..]).unwrap();
        assert_eq!(decoded.messages[0].role(), Role::User);
        assert_eq!(decoded.messages[0].content, "hi");
        assert_eq!(decoded.messages[0].message_id, "m1");
        assert_eq!(decoded.request_id, env.request_id);
        assert_eq!(decoded.conversation_id, env.conversation_id);
        assert_eq!(decoded.model_name(), "gpt-x");
    }

    #[test]
    fn encoding_is_deterministic() {
        let env = envelope();
        assert_eq!(encode_envelope(&env).unwrap(), encode_envelope(&env).unwrap());
    }

    #[test]
    fn invalid_envelope_is_rejected_before_encoding() {
        let mut env = envelope();
        env.model = None;
        let err = encode_envelope(&env).unwrap_err();
        assert!(matches!(err, CodecError::Invalid(_)));
        assert!(err.to_string().contains("model name is required"));
    }
}
