// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Upstream client identity
//
// Every upstream call carries a set of client-identity headers: a checksum,
// trace and request identifiers, the client version, timezone and ghost-mode
// flag. Values come from an `IdentityProvider` so tests and deployments can
// pin them.

use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use uuid::Uuid;

use crate::random::{generate, Alphabet};

pub const CONTENT_TYPE_CONNECT_PROTO: &str = "application/connect+proto";
pub const CLIENT_USER_AGENT: &str = "connect-es/1.4.0";

pub const CHECKSUM_HEADER: &str = "x-cursor-checksum";
const CLIENT_VERSION_HEADER: &str = "x-cursor-client-version";
const TIMEZONE_HEADER: &str = "x-cursor-timezone";
const GHOST_MODE_HEADER: &str = "x-ghost-mode";
const REQUEST_ID_HEADER: &str = "x-request-id";
const TRACE_ID_HEADER: &str = "x-amzn-trace-id";
const ACCEPT_ENCODING_HEADER: &str = "connect-accept-encoding";
const PROTOCOL_VERSION_HEADER: &str = "connect-protocol-version";

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum IdentityError {
    #[error("value for header {name} contains characters not allowed in HTTP headers")]
    InvalidHeaderValue { name: &'static str },
}

/// Source of the per-call identity values.
pub trait IdentityProvider: Send + Sync {
    /// Checksum to send: the caller-supplied one when present, else a
    /// provider-chosen value.
    fn checksum(&self, supplied: Option<&str>) -> String;
    fn trace_id(&self) -> String;
    fn request_id(&self) -> String;
    fn client_version(&self) -> &str;
    fn timezone(&self) -> &str;
    fn ghost_mode(&self) -> bool;
}

/// Static identity settings, usually from the `identity` config section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentitySettings {
    pub checksum: Option<String>,
    pub client_version: String,
    pub timezone: String,
    pub ghost_mode: bool,
}

impl Default for IdentitySettings {
    fn default() -> Self {
        Self {
            checksum: None,
            client_version: "0.42.3".to_string(),
            timezone: "Asia/Shanghai".to_string(),
            ghost_mode: false,
        }
    }
}

impl IdentitySettings {
    /// Use `fallback` as the checksum when none is set.
    pub fn with_checksum_fallback(mut self, fallback: Option<String>) -> Self {
        if self.checksum.is_none() {
            self.checksum = fallback.filter(|c| !c.is_empty());
        }
        self
    }
}

/// Identity from settings, with fresh UUIDs per call and a random checksum
/// when neither the caller nor the settings provide one.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredIdentity {
    settings: IdentitySettings,
}

impl ConfiguredIdentity {
    pub fn new(settings: IdentitySettings) -> Self {
        Self { settings }
    }
}

impl IdentityProvider for ConfiguredIdentity {
    fn checksum(&self, supplied: Option<&str>) -> String {
        supplied
            .filter(|s| !s.is_empty())
            .or(self.settings.checksum.as_deref().filter(|s| !s.is_empty()))
            .map(str::to_string)
            .unwrap_or_else(random_checksum)
    }

    fn trace_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn request_id(&self) -> String {
        Uuid::new_v4().to_string()
    }

    fn client_version(&self) -> &str {
        &self.settings.client_version
    }

    fn timezone(&self) -> &str {
        &self.settings.timezone
    }

    fn ghost_mode(&self) -> bool {
        self.settings.ghost_mode
    }
}

/// `zo` + 6 + 64 random chars, a slash, then 64 more.
pub fn random_checksum() -> String {
    format!(
        "zo{}{}/{}",
        generate(6, &Alphabet::Max),
        generate(64, &Alphabet::Max),
        generate(64, &Alphabet::Max),
    )
}

/// Assemble the full header set for one upstream call.
pub fn upstream_headers(
    identity: &dyn IdentityProvider,
    token: &str,
    supplied_checksum: Option<&str>,
) -> Result<HeaderMap, IdentityError> {
    let mut headers = HeaderMap::new();

    headers.insert(CONTENT_TYPE, HeaderValue::from_static(CONTENT_TYPE_CONNECT_PROTO));
    headers.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    headers.insert(
        HeaderName::from_static(ACCEPT_ENCODING_HEADER),
        HeaderValue::from_static("gzip,br"),
    );
    headers.insert(
        HeaderName::from_static(PROTOCOL_VERSION_HEADER),
        HeaderValue::from_static("1"),
    );

    insert(&mut headers, AUTHORIZATION, "authorization", &format!("Bearer {token}"))?;
    insert(
        &mut headers,
        HeaderName::from_static(TRACE_ID_HEADER),
        TRACE_ID_HEADER,
        &format!("Root={}", identity.trace_id()),
    )?;
    insert(
        &mut headers,
        HeaderName::from_static(CHECKSUM_HEADER),
        CHECKSUM_HEADER,
        &identity.checksum(supplied_checksum),
    )?;
    insert(
        &mut headers,
        HeaderName::from_static(CLIENT_VERSION_HEADER),
        CLIENT_VERSION_HEADER,
        identity.client_version(),
    )?;
    insert(
        &mut headers,
        HeaderName::from_static(TIMEZONE_HEADER),
        TIMEZONE_HEADER,
        identity.timezone(),
    )?;
    headers.insert(
        HeaderName::from_static(GHOST_MODE_HEADER),
        HeaderValue::from_static(if identity.ghost_mode() { "true" } else { "false" }),
    );
    insert(
        &mut headers,
        HeaderName::from_static(REQUEST_ID_HEADER),
        REQUEST_ID_HEADER,
        &identity.request_id(),
    )?;

    Ok(headers)
}

fn insert(
    headers: &mut HeaderMap,
    name: HeaderName,
    label: &'static str,
    value: &str,
) -> Result<(), IdentityError> {
    let value =
        HeaderValue::from_str(value).map_err(|_| IdentityError::InvalidHeaderValue { name: label })?;
    headers.insert(name, value);
    Ok(())
}
