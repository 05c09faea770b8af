// Service Admin - Configuration
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Registry settings, optionally loaded from a local JSON file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Settings consumed by the service registry and the legacy helpers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Include units whose file state is `static`.
    pub include_static_services: bool,
    /// Directory holding SysV init scripts.
    pub init_script_dir: PathBuf,
    /// Legacy status probe, invoked as `<service_command> <name> status`.
    pub service_command: PathBuf,
    /// chkconfig binary used for listing and toggling legacy services.
    pub chkconfig_command: PathBuf,
    /// Privilege escalation wrapper for chkconfig changes.
    pub pkexec_command: PathBuf,
    /// PATH handed to helpers, which otherwise run with a cleared environment.
    pub helper_path: String,
    /// Upper bound for every helper invocation.
    pub helper_timeout_secs: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            include_static_services: false,
            init_script_dir: PathBuf::from("/etc/rc.d/init.d"),
            service_command: PathBuf::from("/usr/sbin/service"),
            chkconfig_command: PathBuf::from("/usr/sbin/chkconfig"),
            pkexec_command: PathBuf::from("/usr/bin/pkexec"),
            helper_path: "/usr/bin:/usr/sbin".to_string(),
            helper_timeout_secs: 120,
        }
    }
}

impl RegistryConfig {
    /// Default location: `<config dir>/service-admin/config.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("service-admin")
            .join("config.json")
    }

    /// Load from the default location.
    pub fn load() -> Self {
        Self::load_from(Self::default_path())
    }

    /// Load from `path`, falling back to defaults if it is missing or invalid.
    pub fn load_from(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        if !path.exists() {
            debug!("No config at {}, using defaults", path.display());
            return Self::default();
        }

        match fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => config,
                Err(e) => {
                    warn!("Failed to parse config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                warn!("Failed to read config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Write the settings to `path` as pretty JSON.
    pub fn save_to(&self, path: impl AsRef<Path>) -> io::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(self).map_err(io::Error::other)?;
        fs::write(path, content)
    }

    /// Helper timeout as a [`Duration`].
    pub fn helper_timeout(&self) -> Duration {
        Duration::from_secs(self.helper_timeout_secs)
    }

    /// Path of the init script for `name`.
    pub fn init_script(&self, name: &str) -> PathBuf {
        self.init_script_dir.join(name)
    }
}
