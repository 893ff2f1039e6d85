// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

// Config loader
//
// Loads framebridge.yaml, checks the version marker, resolves `${VAR}`
// references, fills defaults and computes a content hash for logging.

mod defaults;
mod error;
mod interpolation;
mod loader;
mod raw;
mod source;
mod types;

pub use error::ConfigError;
pub use interpolation::resolve_variables;
pub use loader::{compute_hash, load_config};
pub use source::{ConfigSource, FileSource, StringSource};
pub use types::{Config, ModelPolicy, UpstreamConfig};

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
