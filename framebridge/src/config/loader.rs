// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use sha2::{Digest, Sha256};

use crate::identity::IdentitySettings;
use crate::message::EnvelopeTemplate;

use super::error::ConfigError;
use super::interpolation::{resolve_optional, resolve_unset_as_none, resolve_variables};
use super::raw;
use super::source::ConfigSource;
use super::types::*;

/// Load and validate a framebridge config.
///
/// Steps:
/// 1. Read raw YAML from source
/// 2. Hash it
/// 3. Parse into raw types
/// 4. Check the version marker
/// 5. Resolve `${VAR}` in string fields, fill defaults
/// 6. Validate values
pub fn load_config(source: &dyn ConfigSource) -> Result<Config, ConfigError> {
    let raw_yaml = source.load()?;
    let config_hash = compute_hash(&raw_yaml);

    let raw: raw::RawConfig = serde_yaml::from_str(&raw_yaml)?;

    if raw.framebridge != "v1" {
        return Err(ConfigError::Validation(format!(
            "unsupported config version \"{}\", expected \"v1\"",
            raw.framebridge
        )));
    }

    let upstream = build_upstream(raw.upstream)?;
    let identity = build_identity(raw.identity)?;
    let envelope = build_envelope(raw.envelope)?;
    let models = build_models(raw.models)?;

    Ok(Config {
        upstream,
        identity,
        envelope,
        models,
        config_hash,
    })
}

pub fn compute_hash(raw_yaml: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw_yaml.as_bytes());
    let hash = hasher.finalize();
    format!("sha256:{:x}", hash)
}

fn build_upstream(raw: Option<raw::RawUpstream>) -> Result<UpstreamConfig, ConfigError> {
    let defaults = UpstreamConfig::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    let url = resolve_optional(raw.url)?.unwrap_or(defaults.url);
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        return Err(ConfigError::Validation(format!(
            "upstream.url must be an http(s) URL, got \"{url}\""
        )));
    }
    if raw.timeout_ms == Some(0) {
        return Err(ConfigError::Validation(
            "upstream.timeout_ms must be greater than 0".to_string(),
        ));
    }

    Ok(UpstreamConfig {
        url,
        timeout_ms: raw.timeout_ms,
    })
}

fn build_identity(raw: Option<raw::RawIdentity>) -> Result<IdentitySettings, ConfigError> {
    let defaults = IdentitySettings::default();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    Ok(IdentitySettings {
        checksum: resolve_unset_as_none(raw.checksum)?.filter(|c| !c.is_empty()),
        client_version: resolve_optional(raw.client_version)?.unwrap_or(defaults.client_version),
        timezone: resolve_optional(raw.timezone)?.unwrap_or(defaults.timezone),
        ghost_mode: raw.ghost_mode.unwrap_or(defaults.ghost_mode),
    })
}

fn build_envelope(raw: Option<raw::RawEnvelope>) -> Result<EnvelopeTemplate, ConfigError> {
    let defaults = super::defaults::envelope_template();
    let Some(raw) = raw else {
        return Ok(defaults);
    };

    Ok(EnvelopeTemplate {
        instruction: resolve_optional(raw.instruction)?.unwrap_or(defaults.instruction),
        project_path: resolve_optional(raw.project_path)?.unwrap_or(defaults.project_path),
    })
}

fn build_models(raw: Option<raw::RawModels>) -> Result<ModelPolicy, ConfigError> {
    let Some(prefixes) = raw.and_then(|m| m.no_stream_prefixes) else {
        return Ok(ModelPolicy::default());
    };

    let no_stream_prefixes = prefixes
        .iter()
        .map(|p| resolve_variables(p))
        .collect::<Result<Vec<_>, _>>()?;

    if no_stream_prefixes.iter().any(|p| p.is_empty()) {
        // An empty prefix would refuse streaming for every model.
        return Err(ConfigError::Validation(
            "models.no_stream_prefixes must not contain empty strings".to_string(),
        ));
    }

    Ok(ModelPolicy { no_stream_prefixes })
}
