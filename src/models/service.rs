// Service Admin - Service Model
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Service entries kept by the registry.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::unit::UnitRecord;

/// Suffix carried by systemd service unit names.
pub const SERVICE_SUFFIX: &str = ".service";

/// Description used for services found only through their unit file.
pub const PLACEHOLDER_DESCRIPTION: &str = "---";

/// Strip the `.service` suffix, returning `None` for other unit types.
pub fn service_base_name(unit_name: &str) -> Option<&str> {
    unit_name
        .strip_suffix(SERVICE_SUFFIX)
        .filter(|base| !base.is_empty())
}

/// Whether a unit name refers to an instance template (`getty@.service`).
pub fn is_templated(unit_name: &str) -> bool {
    unit_name.contains('@')
}

/// Where an entry's data came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntrySource {
    /// The unit is loaded and was reported by the live unit listing.
    Loaded,
    /// Only the unit file was found; state came from the status probe.
    UnitFile,
}

/// Boot-time enablement state of a unit file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitFileState {
    Enabled,
    EnabledRuntime,
    Linked,
    LinkedRuntime,
    Alias,
    Masked,
    MaskedRuntime,
    Static,
    Indirect,
    Disabled,
    Generated,
    Transient,
    Bad,
    Invalid,
    /// Anything systemd may add later.
    Other(String),
}

impl UnitFileState {
    pub fn parse(s: &str) -> Self {
        match s {
            "enabled" => UnitFileState::Enabled,
            "enabled-runtime" => UnitFileState::EnabledRuntime,
            "linked" => UnitFileState::Linked,
            "linked-runtime" => UnitFileState::LinkedRuntime,
            "alias" => UnitFileState::Alias,
            "masked" => UnitFileState::Masked,
            "masked-runtime" => UnitFileState::MaskedRuntime,
            "static" => UnitFileState::Static,
            "indirect" => UnitFileState::Indirect,
            "disabled" => UnitFileState::Disabled,
            "generated" => UnitFileState::Generated,
            "transient" => UnitFileState::Transient,
            "bad" => UnitFileState::Bad,
            "invalid" => UnitFileState::Invalid,
            other => UnitFileState::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            UnitFileState::Enabled => "enabled",
            UnitFileState::EnabledRuntime => "enabled-runtime",
            UnitFileState::Linked => "linked",
            UnitFileState::LinkedRuntime => "linked-runtime",
            UnitFileState::Alias => "alias",
            UnitFileState::Masked => "masked",
            UnitFileState::MaskedRuntime => "masked-runtime",
            UnitFileState::Static => "static",
            UnitFileState::Indirect => "indirect",
            UnitFileState::Disabled => "disabled",
            UnitFileState::Generated => "generated",
            UnitFileState::Transient => "transient",
            UnitFileState::Bad => "bad",
            UnitFileState::Invalid => "invalid",
            UnitFileState::Other(s) => s,
        }
    }

    /// Only a permanently enabled unit counts as enabled at boot.
    pub fn is_enabled(&self) -> bool {
        *self == UnitFileState::Enabled
    }

    pub fn is_static(&self) -> bool {
        *self == UnitFileState::Static
    }

    /// An empty state string means systemd could not tell.
    pub fn is_unknown(&self) -> bool {
        matches!(self, UnitFileState::Other(s) if s.is_empty())
    }
}

impl fmt::Display for UnitFileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which mechanism owns a service's boot-time enablement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Enabled and disabled through the systemd manager.
    Systemd,
    /// SysV init script toggled by chkconfig.
    Legacy,
    /// xinetd-managed service toggled by chkconfig.
    Xinetd,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BackendKind::Systemd => "systemd",
            BackendKind::Legacy => "legacy",
            BackendKind::Xinetd => "xinetd",
        })
    }
}

/// A service as presented to the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServiceEntry {
    /// Full unit name, e.g. `sshd.service`.
    pub name: String,
    pub description: String,
    pub load_state: Option<String>,
    /// `active` or `inactive` for probed services, systemd's value otherwise.
    pub active_state: String,
    pub sub_state: Option<String>,
    /// D-Bus object path of the loaded unit.
    pub unit_path: Option<String>,
    /// Enabled at boot.
    pub enabled: bool,
    pub source: EntrySource,
}

impl ServiceEntry {
    /// Build an entry from a live unit listing row.
    pub fn from_unit(unit: &UnitRecord, state: &UnitFileState) -> Self {
        Self {
            name: unit.name.clone(),
            description: unit.description.clone(),
            load_state: Some(unit.load_state.clone()),
            active_state: unit.active_state.clone(),
            sub_state: Some(unit.sub_state.clone()),
            unit_path: Some(unit.unit_path.clone()),
            enabled: state.is_enabled(),
            source: EntrySource::Loaded,
        }
    }

    /// Build an entry for a service found only through its unit file.
    pub fn from_unit_file(base_name: &str, running: bool, state: &UnitFileState) -> Self {
        Self {
            name: format!("{}{}", base_name, SERVICE_SUFFIX),
            description: PLACEHOLDER_DESCRIPTION.to_string(),
            load_state: None,
            active_state: if running { "active" } else { "inactive" }.to_string(),
            sub_state: None,
            unit_path: None,
            enabled: state.is_enabled(),
            source: EntrySource::UnitFile,
        }
    }

    /// Unit name without the `.service` suffix.
    pub fn base_name(&self) -> &str {
        service_base_name(&self.name).unwrap_or(&self.name)
    }

    pub fn is_active(&self) -> bool {
        self.active_state == "active"
    }
}
