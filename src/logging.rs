// Service Admin - Logging
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Tracing setup for applications embedding the registry.

use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "service_admin=info";

/// Install a `fmt` subscriber filtered by `RUST_LOG`.
///
/// Returns `false` if a global subscriber was already installed.
pub fn init() -> bool {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .is_ok()
}
