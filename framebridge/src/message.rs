// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Upstream message model
//
// The two typed schemas exchanged with the upstream:
// - `OutboundEnvelope`: the composite chat request, one per inbound call
// - `ResponseFragment`: one slice of assistant text, one per inbound frame
//
// Both are protobuf messages (prost). Field tags are fixed by the upstream
// schema and must not change.

use std::fmt;

use prost::Message as _;
use uuid::Uuid;

/// Role of a conversational turn as the upstream sees it.
///
/// The upstream only distinguishes the user from everyone else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Role {
    Unspecified = 0,
    User = 1,
    Other = 2,
}

impl Role {
    /// Map an OpenAI-style role string. Anything but `"user"` collapses to `Other`.
    pub fn from_chat_role(role: &str) -> Self {
        if role == "user" {
            Role::User
        } else {
            Role::Other
        }
    }
}

/// One conversational turn inside the envelope.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ChatRequestMessage {
    #[prost(string, tag = "1")]
    pub content: String,
    #[prost(enumeration = "Role", tag = "2")]
    pub role: i32,
    #[prost(string, tag = "13")]
    pub message_id: String,
}

impl ChatRequestMessage {
    /// Build a turn, generating a message id when none is supplied.
    pub fn new(role: Role, content: impl Into<String>, message_id: Option<String>) -> Self {
        Self {
            content: content.into(),
            role: role as i32,
            message_id: message_id
                .filter(|id| !id.is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
        }
    }
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct Instructions {
    #[prost(string, tag = "1")]
    pub instruction: String,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct ModelSpec {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "4")]
    pub empty: String,
}

/// The full outbound request before framing.
///
/// Constructed once per inbound call, validated, encoded, then dropped.
#[derive(Clone, PartialEq, prost::Message)]
pub struct OutboundEnvelope {
    #[prost(message, repeated, tag = "2")]
    pub messages: Vec<ChatRequestMessage>,
    #[prost(message, optional, tag = "4")]
    pub instructions: Option<Instructions>,
    #[prost(string, tag = "5")]
    pub project_path: String,
    #[prost(message, optional, tag = "7")]
    pub model: Option<ModelSpec>,
    #[prost(string, tag = "9")]
    pub request_id: String,
    #[prost(string, tag = "11")]
    pub summary: String,
    #[prost(string, tag = "15")]
    pub conversation_id: String,
}

/// Static parts of every envelope, taken from config.
#[derive(Debug, Clone, PartialEq)]
pub struct EnvelopeTemplate {
    pub instruction: String,
    pub project_path: String,
}

impl OutboundEnvelope {
    /// Build and validate an envelope with fresh request and conversation ids.
    pub fn build(
        messages: Vec<ChatRequestMessage>,
        model_name: &str,
        template: &EnvelopeTemplate,
    ) -> Result<Self, ModelError> {
        let envelope = Self {
            messages,
            instructions: Some(Instructions {
                instruction: template.instruction.clone(),
            }),
            project_path: template.project_path.clone(),
            model: Some(ModelSpec {
                name: model_name.to_string(),
                empty: String::new(),
            }),
            request_id: Uuid::new_v4().to_string(),
            summary: String::new(),
            conversation_id: Uuid::new_v4().to_string(),
        };

        let violations = envelope.validate();
        if violations.is_empty() {
            Ok(envelope)
        } else {
            Err(ModelError::Invalid(violations))
        }
    }

    /// Check the envelope against the upstream schema's requirements.
    ///
    /// Content may be empty, but the role must be set.
    pub fn validate(&self) -> Vec<Violation> {
        let mut violations = Vec::new();

        if self.messages.is_empty() {
            violations.push(Violation::new("messages", "at least one message is required"));
        }

        for (index, msg) in self.messages.iter().enumerate() {
            match Role::try_from(msg.role) {
                Ok(Role::User) | Ok(Role::Other) => {}
                _ => violations.push(Violation::new(
                    format!("messages[{index}].role"),
                    "role is required",
                )),
            }
        }

        match &self.model {
            Some(model) if !model.name.is_empty() => {}
            _ => violations.push(Violation::new("model.name", "model name is required")),
        }

        violations
    }

    /// Serialize to the upstream binary schema.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.encode_to_vec()
    }

    pub fn model_name(&self) -> &str {
        self.model.as_ref().map(|m| m.name.as_str()).unwrap_or("")
    }
}

/// Decoded payload of one inbound frame.
///
/// Only `text` is load-bearing. Unknown fields are skipped by the decoder.
/// `text` is carried as raw bytes so that a fragment with broken UTF-8
/// still decodes; `text_lossy` replaces the bad sequences.
#[derive(Clone, PartialEq, prost::Message)]
pub struct ResponseFragment {
    #[prost(bytes = "vec", tag = "1")]
    pub text: Vec<u8>,
}

impl ResponseFragment {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.as_bytes().to_vec(),
        }
    }

    pub fn text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.text).into_owned()
    }
}

// ---------------------------------------------------------------------------
// Validation errors
// ---------------------------------------------------------------------------

/// A single schema violation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub reason: String,
}

impl Violation {
    pub fn new(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path, self.reason)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("invalid envelope: {}", join_violations(.0))]
    Invalid(Vec<Violation>),
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(Violation::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message as _;

    fn template() -> EnvelopeTemplate {
        EnvelopeTemplate {
            instruction: "Always respond in English".to_string(),
            project_path: "/path/to/project".to_string(),
        }
    }

    #[test]
    fn user_role_maps_to_user() {
        assert_eq!(Role::from_chat_role("user"), Role::User);
    }

    #[test]
    fn non_user_roles_collapse_to_other() {
        for role in ["system", "assistant", "tool", "developer", "USER"] {
            assert_eq!(Role::from_chat_role(role), Role::Other, "role {role}");
        }
    }

    #[test]
    fn message_id_generated_when_absent() {
        let a = ChatRequestMessage::new(Role::User, "hi", None);
        let b = ChatRequestMessage::new(Role::User, "hi", Some(String::new()));
        assert!(!a.message_id.is_empty());
        assert!(!b.message_id.is_empty());
        assert_ne!(a.message_id, b.message_id);
    }

    #[test]
    fn message_id_preserved_when_supplied() {
        let m = ChatRequestMessage::new(Role::Other, "x", Some("mid-1".to_string()));
        assert_eq!(m.message_id, "mid-1");
        assert_eq!(m.role(), Role::Other);
    }

    #[test]
    fn build_fills_identifiers_and_empty_summary() {
        let env = OutboundEnvelope::build(
            vec![ChatRequestMessage::new(Role::User, "hi", None)],
            "gpt-x",
            &template(),
        )
        .unwrap();
        assert_eq!(env.model_name(), "gpt-x");
        assert!(env.summary.is_empty());
        assert!(!env.request_id.is_empty());
        assert!(!env.conversation_id.is_empty());
        assert_ne!(env.request_id, env.conversation_id);
        assert_eq!(
            env.instructions.as_ref().unwrap().instruction,
            "Always respond in English"
        );
        assert_eq!(env.project_path, "/path/to/project");
    }

    #[test]
    fn build_rejects_missing_model() {
        let err = OutboundEnvelope::build(
            vec![ChatRequestMessage::new(Role::User, "hi", None)],
            "",
            &template(),
        )
        .unwrap_err();
        let ModelError::Invalid(violations) = err;
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].path, "model.name");
    }

    #[test]
    fn build_rejects_empty_messages() {
        let err = OutboundEnvelope::build(Vec::new(), "gpt-x", &template()).unwrap_err();
        assert!(err.to_string().contains("at least one message"));
    }

    #[test]
    fn validate_flags_unspecified_role() {
        let mut env = OutboundEnvelope::build(
            vec![ChatRequestMessage::new(Role::User, "hi", None)],
            "gpt-x",
            &template(),
        )
        .unwrap();
        env.messages[0].role = Role::Unspecified as i32;
        env.messages.push(ChatRequestMessage {
            content: String::new(),
            role: 7,
            message_id: "m".to_string(),
        });
        let violations = env.validate();
        assert_eq!(violations.len(), 2);
        assert_eq!(violations[0].path, "messages[0].role");
        assert_eq!(violations[1].path, "messages[1].role");
    }

    #[test]
    fn empty_content_is_valid() {
        let env = OutboundEnvelope::build(
            vec![ChatRequestMessage::new(Role::Other, "", None)],
            "gpt-x",
            &template(),
        );
        assert!(env.is_ok());
    }

    #[test]
    fn envelope_round_trips_through_binary_schema() {
        let env = OutboundEnvelope::build(
            vec![
                ChatRequestMessage::new(Role::Other, "be brief", Some("m1".to_string())),
                ChatRequestMessage::new(Role::User, "hi", Some("m2".to_string())),
            ],
            "gpt-x",
            &template(),
        )
        .unwrap();

        let decoded = OutboundEnvelope::decode(env.to_bytes().as_slice()).unwrap();
        assert_eq!(decoded, env);
        assert_eq!(decoded.messages[0].role(), Role::Other);
        assert_eq!(decoded.messages[1].content, "hi");
        assert_eq!(decoded.messages[1].message_id, "m2");
    }

    #[test]
    fn response_fragment_skips_unknown_fields() {
        // field 1 (text) = "ok", field 3 (varint) = 150
        let bytes = [0x0a, 0x02, b'o', b'k', 0x18, 0x96, 0x01];
        let fragment = ResponseFragment::decode(&bytes[..]).unwrap();
        assert_eq!(fragment.text_lossy(), "ok");
    }

    #[test]
    fn response_fragment_missing_text_is_empty() {
        let fragment = ResponseFragment::decode(&[][..]).unwrap();
        assert_eq!(fragment.text_lossy(), "");
    }

    #[test]
    fn response_fragment_with_broken_utf8_decodes_lossily() {
        let fragment = ResponseFragment::decode(&[0x0a, 0x03, b'o', b'k', 0xFF][..]).unwrap();
        assert_eq!(fragment.text_lossy(), "ok\u{FFFD}");
    }

    #[test]
    fn response_fragment_wire_form_matches_string_field() {
        // A string field and a bytes field share wire type 2.
        assert_eq!(
            ResponseFragment::new("ok").encode_to_vec(),
            vec![0x0a, 0x02, b'o', b'k']
        );
    }
}
