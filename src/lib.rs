// Service Admin - Library Root
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Service management backend for Linux administration tools.
//!
//! [`ServiceRegistry`] merges the services known to systemd with SysV init
//! scripts, caches the result, and enables or disables services at boot
//! through whichever backend owns them.
//!
//! ```text
//! UI / CLI → ServiceRegistry → systemd (D-Bus)
//!                            → service / chkconfig / pkexec
//! ```
//!
//! ```no_run
//! use service_admin::{RegistryConfig, ServiceRegistry};
//!
//! # fn main() -> Result<(), service_admin::ServiceError> {
//! service_admin::logging::init();
//!
//! let mut registry = ServiceRegistry::system(RegistryConfig::load());
//! for (name, entry) in registry.service_info()? {
//!     println!("{name}: {} ({})", entry.active_state, entry.enabled);
//! }
//! registry.set_service("sshd", true)?;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod exec;
pub mod legacy;
pub mod logging;
pub mod models;
pub mod registry;
pub mod systemd;

pub use config::RegistryConfig;
pub use error::{HelperFailure, ServiceError};
pub use legacy::{LegacyCommands, LegacyTools};
pub use models::{BackendKind, EntrySource, ServiceEntry, UnitFileState};
pub use registry::{CacheState, ServiceRegistry};
pub use systemd::{InitSystem, SystemdClient};
