// Service Admin - Unit Records
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Rows returned by the init system listings.

use std::path::{Path, PathBuf};

use super::service::UnitFileState;

/// One loaded unit, as reported by `ListUnits`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitRecord {
    pub name: String,
    pub description: String,
    pub load_state: String,
    pub active_state: String,
    pub sub_state: String,
    pub unit_path: String,
}

#[cfg(test)]
impl UnitRecord {
    /// A loaded unit with the object path systemd would assign it.
    pub(crate) fn new(name: &str, description: &str, active_state: &str, sub_state: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
            load_state: "loaded".to_string(),
            active_state: active_state.to_string(),
            sub_state: sub_state.to_string(),
            unit_path: format!("/org/freedesktop/systemd1/unit/{}", escape_unit_path(name)),
        }
    }
}

/// One installed unit file, as reported by `ListUnitFiles`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitFileRecord {
    pub path: PathBuf,
    pub state: UnitFileState,
}

impl UnitFileRecord {
    pub fn new(path: impl Into<PathBuf>, state: &str) -> Self {
        Self {
            path: path.into(),
            state: UnitFileState::parse(state),
        }
    }

    /// File name component, e.g. `sshd.service`.
    pub fn file_name(&self) -> Option<&str> {
        self.path.file_name().and_then(|n| n.to_str())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Escape a unit name the way systemd builds its object paths.
#[cfg(test)]
fn escape_unit_path(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for (i, b) in name.bytes().enumerate() {
        if b.is_ascii_alphanumeric() && !(i == 0 && b.is_ascii_digit()) {
            out.push(b as char);
        } else {
            out.push_str(&format!("_{:02x}", b));
        }
    }
    out
}
