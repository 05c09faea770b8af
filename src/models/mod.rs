// Service Admin - Models
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Data models for services and systemd units.

mod service;
mod unit;

pub use service::{
    is_templated, service_base_name, BackendKind, EntrySource, ServiceEntry, UnitFileState,
    PLACEHOLDER_DESCRIPTION, SERVICE_SUFFIX,
};
pub use unit::{UnitFileRecord, UnitRecord};
