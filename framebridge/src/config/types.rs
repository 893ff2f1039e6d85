// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use crate::identity::IdentitySettings;
use crate::message::EnvelopeTemplate;

use super::defaults;

/// Fully resolved configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub upstream: UpstreamConfig,
    pub identity: IdentitySettings,
    pub envelope: EnvelopeTemplate,
    pub models: ModelPolicy,
    /// `sha256:<hex>` of the source YAML, empty for built-in defaults.
    pub config_hash: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamConfig {
    pub url: String,
    /// Whole-call timeout. Unset means no limit, which long streams need.
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelPolicy {
    /// Model name prefixes that must not be called with `stream: true`.
    pub no_stream_prefixes: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            upstream: UpstreamConfig::default(),
            identity: IdentitySettings::default(),
            envelope: defaults::envelope_template(),
            models: ModelPolicy::default(),
            config_hash: String::new(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: defaults::UPSTREAM_URL.to_string(),
            timeout_ms: None,
        }
    }
}

impl Default for ModelPolicy {
    fn default() -> Self {
        Self {
            no_stream_prefixes: defaults::NO_STREAM_PREFIXES
                .iter()
                .map(|p| p.to_string())
                .collect(),
        }
    }
}
