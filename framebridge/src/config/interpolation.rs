// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

use super::error::ConfigError;

/// Expand `${VAR_NAME}` references from the environment.
///
/// An unset variable is an error. An unterminated or empty `${` is kept as
/// literal text.
pub fn resolve_variables(input: &str) -> Result<String, ConfigError> {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        result.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(0) | None => {
                result.push_str("${");
                rest = after;
            }
            Some(end) => {
                let name = &after[..end];
                let value = std::env::var(name).map_err(|_| ConfigError::UndefinedVariable {
                    name: name.to_string(),
                })?;
                result.push_str(&value);
                rest = &after[end + 1..];
            }
        }
    }
    result.push_str(rest);

    Ok(result)
}

/// `resolve_variables` over an optional field.
pub fn resolve_optional(input: Option<String>) -> Result<Option<String>, ConfigError> {
    input.map(|s| resolve_variables(&s)).transpose()
}

/// `resolve_optional` for fields that may be left unset: a reference to an
/// unset variable yields `None` instead of an error.
pub fn resolve_unset_as_none(input: Option<String>) -> Result<Option<String>, ConfigError> {
    match resolve_optional(input) {
        Err(ConfigError::UndefinedVariable { name }) => {
            tracing::debug!(variable = %name, "referenced variable unset, leaving field unset");
            Ok(None)
        }
        other => other,
    }
}
