// Service Admin - Systemd D-Bus Client
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Systemd D-Bus client implementation for the service registry.

use anyhow::{anyhow, Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};
use zbus::blocking::Connection;
use zbus::zvariant::{DynamicType, OwnedObjectPath, OwnedValue, Type};

use super::InitSystem;
use crate::models::{UnitFileRecord, UnitFileState, UnitRecord};

const SYSTEMD_BUS: &str = "org.freedesktop.systemd1";
const SYSTEMD_PATH: &str = "/org/freedesktop/systemd1";
const MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";
const PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

/// Row of `ListUnits`: name, description, load state, active state, sub
/// state, followed unit, object path, job id, job type, job path.
type ListUnitsRow = (
    String,
    String,
    String,
    String,
    String,
    String,
    OwnedObjectPath,
    u32,
    String,
    OwnedObjectPath,
);

/// Change reported by `EnableUnitFiles`/`DisableUnitFiles`: type, file, destination.
type UnitFileChange = (String, String, String);

/// Client for the systemd manager on the system bus.
///
/// The connection is opened on first use and closed when the client drops.
pub struct SystemdClient {
    connection: Option<Connection>,
}

impl SystemdClient {
    /// Create a new systemd client.
    pub fn new() -> Self {
        Self { connection: None }
    }

    /// Ensure we're connected to D-Bus.
    fn ensure_connected(&mut self) -> Result<&Connection> {
        if self.connection.is_none() {
            info!("Connecting to systemd...");
            let conn = Connection::system().context("Failed to connect to system D-Bus")?;
            match manager_version(&conn) {
                Ok(version) => info!("Connected to systemd {}", version),
                Err(e) => debug!("Connected to systemd, version unavailable: {:#}", e),
            }
            self.connection = Some(conn);
        }
        self.connection
            .as_ref()
            .ok_or_else(|| anyhow!("Not connected to systemd"))
    }

    /// Call a manager method and decode its reply.
    fn call_manager<B, R>(&mut self, method: &str, body: &B) -> Result<R>
    where
        B: Serialize + DynamicType,
        R: DeserializeOwned + Type,
    {
        let conn = self.ensure_connected()?;
        let reply = conn
            .call_method(
                Some(SYSTEMD_BUS),
                SYSTEMD_PATH,
                Some(MANAGER_INTERFACE),
                method,
                body,
            )
            .with_context(|| format!("{} call failed", method))?;

        let body = reply.body();
        let value: R = body
            .deserialize()
            .with_context(|| format!("Unexpected {} reply", method))?;
        Ok(value)
    }
}

/// Version string of the running systemd.
fn manager_version(conn: &Connection) -> Result<String> {
    let reply = conn.call_method(
        Some(SYSTEMD_BUS),
        SYSTEMD_PATH,
        Some(PROPERTIES_INTERFACE),
        "Get",
        &(MANAGER_INTERFACE, "Version"),
    )?;

    let body = reply.body();
    let value: OwnedValue = body.deserialize()?;
    let version: String = value
        .try_into()
        .map_err(|_| anyhow!("Version property is not a string"))?;
    Ok(version)
}

impl InitSystem for SystemdClient {
    fn list_units(&mut self) -> Result<Vec<UnitRecord>> {
        let rows: Vec<ListUnitsRow> = self.call_manager("ListUnits", &())?;
        debug!("ListUnits returned {} units", rows.len());

        Ok(rows
            .into_iter()
            .map(|(name, description, load_state, active_state, sub_state, _, path, ..)| {
                UnitRecord {
                    name,
                    description,
                    load_state,
                    active_state,
                    sub_state,
                    unit_path: path.to_string(),
                }
            })
            .collect())
    }

    fn list_unit_files(&mut self) -> Result<Vec<UnitFileRecord>> {
        let rows: Vec<(String, String)> = self.call_manager("ListUnitFiles", &())?;
        debug!("ListUnitFiles returned {} files", rows.len());

        Ok(rows
            .into_iter()
            .map(|(path, state)| UnitFileRecord::new(path, &state))
            .collect())
    }

    fn unit_file_state(&mut self, name: &str) -> Result<UnitFileState> {
        let state: String = self.call_manager("GetUnitFileState", &(name,))?;
        Ok(UnitFileState::parse(&state))
    }

    fn enable_unit_files(&mut self, names: &[String], runtime: bool, force: bool) -> Result<()> {
        let (_carries_install_info, changes): (bool, Vec<UnitFileChange>) =
            self.call_manager("EnableUnitFiles", &(names, runtime, force))?;

        for (kind, file, destination) in &changes {
            debug!("{}: {} -> {}", kind, file, destination);
        }
        info!("Enabled unit files: {}", names.join(", "));
        Ok(())
    }

    fn disable_unit_files(&mut self, names: &[String], runtime: bool) -> Result<()> {
        let changes: Vec<UnitFileChange> =
            self.call_manager("DisableUnitFiles", &(names, runtime))?;

        for (kind, file, destination) in &changes {
            debug!("{}: {} -> {}", kind, file, destination);
        }
        info!("Disabled unit files: {}", names.join(", "));
        Ok(())
    }
}

impl Default for SystemdClient {
    fn default() -> Self {
        Self::new()
    }
}
