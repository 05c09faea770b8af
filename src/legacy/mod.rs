// Service Admin - Legacy Services
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! SysV init script and xinetd support through the classic shell tools.
//!
//! Three helpers are involved:
//! - `service <name> status` to probe whether a service without a loaded
//!   unit is running (exit code 0 means active)
//! - `pkexec chkconfig --add|--del <name>` to toggle boot-time enablement
//! - `chkconfig --list --type xinetd` to enumerate xinetd services
//!
//! Every helper starts from an empty environment and is killed once the
//! configured timeout expires.

mod xinetd;

pub use xinetd::parse_xinetd_listing;

use std::time::Duration;

use tracing::{info, warn};

use crate::config::RegistryConfig;
use crate::error::{Result, ServiceError};
use crate::exec::{HelperCommand, HelperOutput};

/// Exit codes pkexec uses when the user dismisses or fails authentication.
const PKEXEC_DISMISSED: i32 = 126;
const PKEXEC_NOT_AUTHORIZED: i32 = 127;

/// Access to the non-systemd service tools.
pub trait LegacyTools {
    /// Whether the service reports itself as running.
    fn service_status(&mut self, name: &str) -> bool;

    /// Add (`enable`) or delete the service from the boot runlevels.
    fn set_enabled(&mut self, name: &str, enable: bool) -> Result<()>;

    /// Raw output of the xinetd service listing.
    fn list_xinetd(&mut self) -> Result<String>;
}

/// [`LegacyTools`] backed by the real `service`, `chkconfig` and `pkexec`.
#[derive(Debug, Clone)]
pub struct LegacyCommands {
    config: RegistryConfig,
}

impl LegacyCommands {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        self.config.helper_timeout()
    }

    fn chkconfig_toggle(&self, name: &str, enable: bool) -> HelperCommand {
        HelperCommand::new(&self.config.pkexec_command)
            .arg(&self.config.chkconfig_command)
            .arg(if enable { "--add" } else { "--del" })
            .arg(name)
            .env("PATH", &self.config.helper_path)
    }
}

impl LegacyTools for LegacyCommands {
    fn service_status(&mut self, name: &str) -> bool {
        let command = HelperCommand::new(&self.config.service_command)
            .arg(name)
            .arg("status")
            .env("PATH", &self.config.helper_path);

        match command.run(self.timeout()) {
            Ok(output) => output.status.success(),
            Err(e) => {
                warn!("Could not probe status of {}: {}", name, e);
                false
            }
        }
    }

    fn set_enabled(&mut self, name: &str, enable: bool) -> Result<()> {
        let command = self.chkconfig_toggle(name, enable);
        let output = command.run(self.timeout())?;

        if output.status.success() {
            info!(
                "{} legacy service: {}",
                if enable { "Added" } else { "Deleted" },
                name
            );
            return Ok(());
        }

        if authentication_cancelled(&output) {
            return Err(ServiceError::AuthenticationCancelled {
                command: command.display(),
            });
        }

        Err(command.failure(output))
    }

    fn list_xinetd(&mut self) -> Result<String> {
        let command = HelperCommand::new(&self.config.chkconfig_command)
            .arg("--list")
            .arg("--type")
            .arg("xinetd")
            .env("LANGUAGE", "C")
            .env("LC_ALL", "C")
            .env("PATH", &self.config.helper_path);

        Ok(command.run_checked(self.timeout())?.stdout)
    }
}

fn authentication_cancelled(output: &HelperOutput) -> bool {
    matches!(
        output.status.code(),
        Some(PKEXEC_DISMISSED) | Some(PKEXEC_NOT_AUTHORIZED)
    ) || output.stderr.contains("dismissed")
        || output.stderr.contains("cancelled")
}
