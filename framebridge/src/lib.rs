// Copyright 2026 The Framebridge Project
// SPDX-License-Identifier: Apache-2.0

pub mod auth;
pub mod codec;
pub mod config;
pub mod engine;
pub mod identity;
pub mod message;
pub mod provider;
pub mod proxy;
pub mod random;
pub(crate) mod stream;
