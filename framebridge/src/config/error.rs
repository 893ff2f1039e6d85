// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

/// All errors that can occur during config loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config source: {0}")]
    IoError(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("undefined variable ${{{name}}} in config (not set in environment)")]
    UndefinedVariable { name: String },
}

impl ConfigError {
    /// True when the source file simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ConfigError::IoError(e) if e.kind() == std::io::ErrorKind::NotFound)
    }
}
