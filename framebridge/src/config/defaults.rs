// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use crate::message::EnvelopeTemplate;

pub const UPSTREAM_URL: &str = "https://api2.cursor.sh/aiserver.v1.AiService/StreamChat";

pub const INSTRUCTION: &str = "Always respond in 中文";

pub const PROJECT_PATH: &str = "/path/to/project";

/// Reasoning models the upstream cannot stream.
pub const NO_STREAM_PREFIXES: &[&str] = &["o1-"];

pub fn envelope_template() -> EnvelopeTemplate {
    EnvelopeTemplate {
        instruction: INSTRUCTION.to_string(),
        project_path: PROJECT_PATH.to_string(),
    }
}
