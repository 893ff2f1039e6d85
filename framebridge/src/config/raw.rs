// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Raw YAML layer. Every section and field is optional except the version
// marker; interpolation and defaults are applied when building `Config`.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub framebridge: String,
    pub upstream: Option<RawUpstream>,
    pub identity: Option<RawIdentity>,
    pub envelope: Option<RawEnvelope>,
    pub models: Option<RawModels>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawUpstream {
    pub url: Option<String>,
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawIdentity {
    pub checksum: Option<String>,
    pub client_version: Option<String>,
    pub timezone: Option<String>,
    pub ghost_mode: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawEnvelope {
    pub instruction: Option<String>,
    pub project_path: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RawModels {
    pub no_stream_prefixes: Option<Vec<String>>,
}
