// Service Admin - Systemd Module
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Systemd D-Bus client for unit listing and enablement.

mod client;

pub use client::SystemdClient;

use anyhow::Result;

use crate::models::{UnitFileRecord, UnitFileState, UnitRecord};

/// The init system operations the registry depends on.
pub trait InitSystem {
    /// Units currently loaded by the manager.
    fn list_units(&mut self) -> Result<Vec<UnitRecord>>;

    /// Every installed unit file, loaded or not.
    fn list_unit_files(&mut self) -> Result<Vec<UnitFileRecord>>;

    /// Enablement state of a single unit file.
    fn unit_file_state(&mut self, name: &str) -> Result<UnitFileState>;

    fn enable_unit_files(&mut self, names: &[String], runtime: bool, force: bool) -> Result<()>;

    fn disable_unit_files(&mut self, names: &[String], runtime: bool) -> Result<()>;
}
