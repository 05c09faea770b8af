// Service Admin - Service Registry
// Copyright (C) 2026 Christos Daggas
// SPDX-License-Identifier: MIT

//! Cached view of every service on the system and the dispatch of boot-time
//! enable/disable requests to the backend that owns each service.
//!
//! # Cache lifecycle
//!
//! ```text
//! Empty ──service_info()──▶ Populated ──invalidate() / set_service()──▶ Stale
//!                               ▲                                         │
//!                               └─────────────service_info()──────────────┘
//! ```
//!
//! The registry is not synchronized. Mutating calls take `&mut self`; wrap it
//! in a `Mutex` to share it between threads.

use std::collections::BTreeMap;
use std::path::Path;

use tracing::{debug, info, warn};

use crate::config::RegistryConfig;
use crate::error::Result;
use crate::legacy::{parse_xinetd_listing, LegacyCommands, LegacyTools};
use crate::models::{
    is_templated, service_base_name, BackendKind, ServiceEntry, UnitFileState, SERVICE_SUFFIX,
};
use crate::systemd::{InitSystem, SystemdClient};

const XINETD: &str = "xinetd";

/// Freshness of the cached service map.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// Never fetched.
    Empty,
    /// Holds the result of the last fetch.
    Populated,
    /// Holds an outdated snapshot; the next read fetches again.
    Stale,
}

/// Merged systemd and legacy service registry.
pub struct ServiceRegistry<I = SystemdClient, L = LegacyCommands> {
    init: I,
    legacy: L,
    config: RegistryConfig,
    services: BTreeMap<String, ServiceEntry>,
    xinetd: BTreeMap<String, bool>,
    state: CacheState,
}

impl ServiceRegistry {
    /// Registry talking to the system bus and the real legacy tools.
    pub fn system(config: RegistryConfig) -> Self {
        let legacy = LegacyCommands::new(config.clone());
        Self::new(SystemdClient::new(), legacy, config)
    }
}

impl<I: InitSystem, L: LegacyTools> ServiceRegistry<I, L> {
    pub fn new(init: I, legacy: L, config: RegistryConfig) -> Self {
        Self {
            init,
            legacy,
            config,
            services: BTreeMap::new(),
            xinetd: BTreeMap::new(),
            state: CacheState::Empty,
        }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    pub fn init_system(&self) -> &I {
        &self.init
    }

    pub fn legacy_tools(&self) -> &L {
        &self.legacy
    }

    pub fn cache_state(&self) -> CacheState {
        self.state
    }

    pub fn include_static_services(&self) -> bool {
        self.config.include_static_services
    }

    /// Takes effect on the next fetch; the current snapshot is kept.
    pub fn set_include_static_services(&mut self, include: bool) {
        self.config.include_static_services = include;
    }

    /// Mark the snapshot outdated so the next read fetches again.
    pub fn invalidate(&mut self) {
        if self.state == CacheState::Populated {
            self.state = CacheState::Stale;
        }
    }

    /// Current snapshot, without fetching.
    pub fn services(&self) -> &BTreeMap<String, ServiceEntry> {
        &self.services
    }

    /// All services keyed by base name, fetched if the cache is not fresh.
    pub fn service_info(&mut self) -> Result<&BTreeMap<String, ServiceEntry>> {
        if self.state != CacheState::Populated {
            self.services = self.fetch()?;
            self.state = CacheState::Populated;
            info!("Loaded {} services", self.services.len());
        }
        Ok(&self.services)
    }

    /// Whether the cached entry for `name` is active. Unknown names are
    /// reported as not running.
    pub fn is_service_running(&self, name: &str) -> bool {
        self.services.get(name).is_some_and(ServiceEntry::is_active)
    }

    /// xinetd services and whether each is on, read only when xinetd itself
    /// is enabled at boot.
    pub fn xinetd_services(&mut self) -> Result<&BTreeMap<String, bool>> {
        let xinetd_enabled = self.services.get(XINETD).is_some_and(|s| s.enabled);
        if !xinetd_enabled {
            return Ok(&self.xinetd);
        }

        let listing = self.legacy.list_xinetd()?;
        self.xinetd = parse_xinetd_listing(&listing);
        debug!("Found {} xinetd services", self.xinetd.len());
        Ok(&self.xinetd)
    }

    /// Which mechanism `set_service` would use for `name`.
    pub fn backend_for(&self, name: &str) -> BackendKind {
        if self.xinetd.contains_key(name) {
            BackendKind::Xinetd
        } else if self.config.init_script(name).is_file() {
            BackendKind::Legacy
        } else {
            BackendKind::Systemd
        }
    }

    /// Enable or disable `name` at boot. On success the cache is marked
    /// stale so the next read reflects the change.
    pub fn set_service(&mut self, name: &str, enable: bool) -> Result<()> {
        let backend = self.backend_for(name);
        debug!(
            "{} {} via {}",
            if enable { "Enabling" } else { "Disabling" },
            name,
            backend
        );

        match backend {
            BackendKind::Xinetd => {
                self.legacy.set_enabled(name, enable)?;
                self.xinetd.insert(name.to_string(), enable);
            }
            BackendKind::Legacy => {
                self.legacy.set_enabled(name, enable)?;
            }
            BackendKind::Systemd => {
                let units = [format!("{}{}", name, SERVICE_SUFFIX)];
                if enable {
                    self.init.enable_unit_files(&units, false, true)?;
                } else {
                    self.init.disable_unit_files(&units, false)?;
                }
            }
        }

        self.invalidate();
        Ok(())
    }

    fn fetch(&mut self) -> Result<BTreeMap<String, ServiceEntry>> {
        let mut services = BTreeMap::new();
        let mut skipped = 0usize;

        for unit in self.init.list_units()? {
            let Some(name) = service_base_name(&unit.name) else {
                continue;
            };
            if is_templated(&unit.name) {
                continue;
            }

            let state = match self.init.unit_file_state(&unit.name) {
                Ok(state) => state,
                Err(e) => {
                    warn!("Skipping {}: {:#}", unit.name, e);
                    skipped += 1;
                    continue;
                }
            };

            if state.is_unknown() || (state.is_static() && !self.config.include_static_services) {
                continue;
            }

            services.insert(name.to_string(), ServiceEntry::from_unit(&unit, &state));
        }

        if skipped > 0 {
            warn!("Skipped {} units whose state could not be read", skipped);
        }

        for file in self.init.list_unit_files()? {
            let Some(name) = file.file_name().and_then(service_base_name) else {
                continue;
            };
            if services.contains_key(name) || is_templated(name) {
                continue;
            }
            if !(file.state.is_enabled() || file.state == UnitFileState::Disabled) {
                continue;
            }
            if !self.has_real_file(file.path(), name) {
                continue;
            }

            let running = self.legacy.service_status(name);
            services.insert(
                name.to_string(),
                ServiceEntry::from_unit_file(name, running, &file.state),
            );
        }

        Ok(services)
    }

    /// The unit file, or a SysV script of the same name, exists as a regular
    /// file and the unit file itself is not a symlink.
    fn has_real_file(&self, path: &Path, name: &str) -> bool {
        let exists = path.is_file() || self.config.init_script(name).is_file();
        let is_link = path
            .symlink_metadata()
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        exists && !is_link
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{HelperFailure, ServiceError};
    use crate::models::{EntrySource, UnitFileRecord, UnitRecord};
    use std::cell::Cell;
    use std::collections::HashMap;
    use std::fs;
    use std::rc::Rc;
    use std::time::Duration;

    use anyhow::anyhow;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FakeInit {
        units: Vec<UnitRecord>,
        files: Vec<UnitFileRecord>,
        states: HashMap<String, String>,
        calls: usize,
        enabled: Vec<String>,
        disabled: Vec<String>,
        fail_unit_files: Rc<Cell<bool>>,
    }

    impl FakeInit {
        fn unit(mut self, name: &str, active: &str, state: &str) -> Self {
            let sub = if active == "active" { "running" } else { "dead" };
            self.units.push(UnitRecord::new(name, &format!("{} daemon", name), active, sub));
            self.states.insert(name.to_string(), state.to_string());
            self
        }

        fn file(mut self, path: &Path, state: &str) -> Self {
            self.files.push(UnitFileRecord::new(path, state));
            self
        }
    }

    impl InitSystem for FakeInit {
        fn list_units(&mut self) -> anyhow::Result<Vec<UnitRecord>> {
            self.calls += 1;
            Ok(self.units.clone())
        }

        fn list_unit_files(&mut self) -> anyhow::Result<Vec<UnitFileRecord>> {
            self.calls += 1;
            if self.fail_unit_files.get() {
                return Err(anyhow!("ListUnitFiles call failed"));
            }
            Ok(self.files.clone())
        }

        fn unit_file_state(&mut self, name: &str) -> anyhow::Result<UnitFileState> {
            self.calls += 1;
            self.states
                .get(name)
                .map(|s| UnitFileState::parse(s))
                .ok_or_else(|| anyhow!("No such unit file: {}", name))
        }

        fn enable_unit_files(&mut self, names: &[String], runtime: bool, force: bool) -> anyhow::Result<()> {
            self.calls += 1;
            assert!(!runtime);
            assert!(force);
            self.enabled.extend(names.iter().cloned());
            Ok(())
        }

        fn disable_unit_files(&mut self, names: &[String], runtime: bool) -> anyhow::Result<()> {
            self.calls += 1;
            assert!(!runtime);
            self.disabled.extend(names.iter().cloned());
            Ok(())
        }
    }

    #[derive(Default)]
    struct FakeLegacy {
        running: Vec<String>,
        probes: usize,
        toggles: Vec<String>,
        xinetd_listing: String,
        fail_toggle: bool,
    }

    impl LegacyTools for FakeLegacy {
        fn service_status(&mut self, name: &str) -> bool {
            self.probes += 1;
            self.running.iter().any(|r| r == name)
        }

        fn set_enabled(&mut self, name: &str, enable: bool) -> Result<()> {
            let call = format!("{} {}", if enable { "add" } else { "del" }, name);
            if self.fail_toggle {
                return Err(ServiceError::HelperExecutionFailed {
                    command: call,
                    failure: HelperFailure::Timeout(Duration::from_secs(120)),
                    stderr: String::new(),
                });
            }
            self.toggles.push(call);
            Ok(())
        }

        fn list_xinetd(&mut self) -> Result<String> {
            Ok(self.xinetd_listing.clone())
        }
    }

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            fs::create_dir_all(dir.path().join("init.d")).unwrap();
            fs::create_dir_all(dir.path().join("units")).unwrap();
            Self { dir }
        }

        fn config(&self) -> RegistryConfig {
            RegistryConfig {
                init_script_dir: self.dir.path().join("init.d"),
                ..RegistryConfig::default()
            }
        }

        fn init_script(&self, name: &str) {
            fs::write(self.dir.path().join("init.d").join(name), "#!/bin/sh\n").unwrap();
        }

        fn unit_file(&self, file_name: &str) -> std::path::PathBuf {
            let path = self.dir.path().join("units").join(file_name);
            fs::write(&path, "[Unit]\n").unwrap();
            path
        }

        fn missing_unit_file(&self, file_name: &str) -> std::path::PathBuf {
            self.dir.path().join("units").join(file_name)
        }

        fn registry(&self, init: FakeInit, legacy: FakeLegacy) -> ServiceRegistry<FakeInit, FakeLegacy> {
            ServiceRegistry::new(init, legacy, self.config())
        }
    }

    #[test]
    fn sshd_end_to_end() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        let services = registry.service_info().unwrap();
        let sshd = &services["sshd"];
        assert_eq!(sshd.name, "sshd.service");
        assert_eq!(sshd.description, "sshd.service daemon");
        assert!(sshd.enabled);
        assert_eq!(sshd.source, EntrySource::Loaded);
        assert_eq!(sshd.sub_state.as_deref(), Some("running"));
        assert!(registry.is_service_running("sshd"));
        assert_eq!(registry.cache_state(), CacheState::Populated);
    }

    #[test]
    fn inactive_unit_is_not_running() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("cups.service", "inactive", "disabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        let services = registry.service_info().unwrap();
        assert!(!services["cups"].enabled);
        assert!(!registry.is_service_running("cups"));
    }

    #[test]
    fn unknown_names_are_not_running() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        assert!(!registry.is_service_running("sshd"));
        registry.service_info().unwrap();
        assert!(!registry.is_service_running("httpd"));
        assert!(!registry.is_service_running(""));
        assert_eq!(registry.init_system().calls, 3);
    }

    #[test]
    fn second_read_hits_the_cache() {
        let fx = Fixture::new();
        let init = FakeInit::default()
            .unit("sshd.service", "active", "enabled")
            .unit("crond.service", "active", "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        let first = registry.service_info().unwrap().clone();
        let calls = registry.init_system().calls;
        let second = registry.service_info().unwrap().clone();

        assert_eq!(first, second);
        assert_eq!(registry.init_system().calls, calls);
    }

    #[test]
    fn failed_listing_keeps_previous_snapshot() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let fail_unit_files = Rc::clone(&init.fail_unit_files);
        let mut registry = fx.registry(init, FakeLegacy::default());

        let before = registry.service_info().unwrap().clone();
        registry.invalidate();
        fail_unit_files.set(true);

        let err = registry.service_info().unwrap_err();
        assert!(matches!(err, ServiceError::InitSystem(_)));
        assert_eq!(err.to_string(), "ListUnitFiles call failed");
        assert_eq!(registry.cache_state(), CacheState::Stale);
        assert_eq!(registry.services(), &before);
        assert!(registry.is_service_running("sshd"));

        fail_unit_files.set(false);
        assert!(registry.service_info().unwrap().contains_key("sshd"));
        assert_eq!(registry.cache_state(), CacheState::Populated);
    }

    #[test]
    fn invalidate_forces_a_new_fetch() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        registry.invalidate();
        assert_eq!(registry.cache_state(), CacheState::Empty);

        registry.service_info().unwrap();
        let calls = registry.init_system().calls;
        registry.invalidate();
        assert_eq!(registry.cache_state(), CacheState::Stale);
        assert!(registry.services().contains_key("sshd"));

        registry.service_info().unwrap();
        assert!(registry.init_system().calls > calls);
        assert_eq!(registry.cache_state(), CacheState::Populated);
    }

    #[test]
    fn static_units_follow_the_flag_on_next_fetch() {
        let fx = Fixture::new();
        let init = FakeInit::default()
            .unit("sshd.service", "active", "enabled")
            .unit("systemd-journald.service", "active", "static");
        let mut registry = fx.registry(init, FakeLegacy::default());

        assert!(!registry.service_info().unwrap().contains_key("systemd-journald"));

        registry.set_include_static_services(true);
        assert!(registry.include_static_services());
        assert!(!registry.service_info().unwrap().contains_key("systemd-journald"));

        registry.invalidate();
        let services = registry.service_info().unwrap();
        assert!(services.contains_key("systemd-journald"));
        assert!(!services["systemd-journald"].enabled);
    }

    #[test]
    fn non_services_templates_and_failures_are_skipped() {
        let fx = Fixture::new();
        let mut init = FakeInit::default()
            .unit("sshd.service", "active", "enabled")
            .unit("dbus.socket", "active", "enabled")
            .unit("getty@tty1.service", "active", "enabled")
            .unit("blank.service", "active", "");
        init.units.push(UnitRecord::new("vanished.service", "", "active", "running"));
        let mut registry = fx.registry(init, FakeLegacy::default());

        let services = registry.service_info().unwrap();
        assert_eq!(services.keys().collect::<Vec<_>>(), vec!["sshd"]);
    }

    #[test]
    fn live_listing_wins_over_unit_files() {
        let fx = Fixture::new();
        let path = fx.unit_file("sshd.service");
        let init = FakeInit::default()
            .unit("sshd.service", "active", "enabled")
            .file(&path, "disabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        let services = registry.service_info().unwrap();
        assert_eq!(services.len(), 1);
        assert_eq!(services["sshd"].source, EntrySource::Loaded);
        assert!(services["sshd"].enabled);
        assert_eq!(registry.legacy_tools().probes, 0);
    }

    #[test]
    fn unit_files_are_probed_for_status() {
        let fx = Fixture::new();
        let ntpd = fx.unit_file("ntpd.service");
        let rsyncd = fx.unit_file("rsyncd.service");
        let legacy = FakeLegacy {
            running: vec!["ntpd".to_string()],
            ..FakeLegacy::default()
        };
        let init = FakeInit::default()
            .file(&ntpd, "enabled")
            .file(&rsyncd, "disabled");
        let mut registry = fx.registry(init, legacy);

        let services = registry.service_info().unwrap().clone();
        assert_eq!(services["ntpd"].active_state, "active");
        assert!(services["ntpd"].enabled);
        assert_eq!(services["ntpd"].description, "---");
        assert_eq!(services["rsyncd"].active_state, "inactive");
        assert!(!services["rsyncd"].enabled);
        assert!(registry.is_service_running("ntpd"));
        assert!(!registry.is_service_running("rsyncd"));
        assert_eq!(registry.legacy_tools().probes, 2);
    }

    #[test]
    fn unit_file_filters() {
        let fx = Fixture::new();
        let masked = fx.unit_file("masked.service");
        let templated = fx.unit_file("getty@.service");
        let missing = fx.missing_unit_file("ghost.service");
        let via_script = fx.missing_unit_file("network.service");
        fx.init_script("network");
        let timer = fx.unit_file("backup.timer");
        let target = fx.unit_file("real.service");
        let link = fx.dir.path().join("units").join("alias.service");
        std::os::unix::fs::symlink(&target, &link).unwrap();

        let init = FakeInit::default()
            .file(&masked, "masked")
            .file(&templated, "enabled")
            .file(&missing, "enabled")
            .file(&via_script, "enabled")
            .file(&timer, "enabled")
            .file(&link, "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        let services = registry.service_info().unwrap();
        assert_eq!(services.keys().collect::<Vec<_>>(), vec!["network"]);
        assert_eq!(services["network"].source, EntrySource::UnitFile);
    }

    #[test]
    fn enable_without_legacy_script_uses_the_bus() {
        let fx = Fixture::new();
        let mut registry = fx.registry(FakeInit::default(), FakeLegacy::default());

        assert_eq!(registry.backend_for("foo"), BackendKind::Systemd);
        registry.set_service("foo", true).unwrap();

        let init = registry.init_system();
        assert_eq!(init.enabled, vec!["foo.service".to_string()]);
        assert!(init.disabled.is_empty());
        assert_eq!(init.calls, 1);
        assert!(registry.legacy_tools().toggles.is_empty());
    }

    #[test]
    fn disable_with_legacy_script_uses_chkconfig() {
        let fx = Fixture::new();
        fx.init_script("foo");
        let mut registry = fx.registry(FakeInit::default(), FakeLegacy::default());

        assert_eq!(registry.backend_for("foo"), BackendKind::Legacy);
        registry.set_service("foo", false).unwrap();

        assert_eq!(registry.legacy_tools().toggles, vec!["del foo".to_string()]);
        assert!(registry.init_system().disabled.is_empty());
        assert_eq!(registry.init_system().calls, 0);
    }

    #[test]
    fn successful_change_marks_cache_stale() {
        let fx = Fixture::new();
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let mut registry = fx.registry(init, FakeLegacy::default());

        registry.service_info().unwrap();
        registry.set_service("sshd", false).unwrap();
        assert_eq!(registry.cache_state(), CacheState::Stale);
        assert_eq!(registry.init_system().disabled, vec!["sshd.service".to_string()]);
    }

    #[test]
    fn failed_helper_is_returned_and_cache_kept() {
        let fx = Fixture::new();
        fx.init_script("foo");
        let init = FakeInit::default().unit("sshd.service", "active", "enabled");
        let legacy = FakeLegacy {
            fail_toggle: true,
            ..FakeLegacy::default()
        };
        let mut registry = fx.registry(init, legacy);
        registry.service_info().unwrap();

        let err = registry.set_service("foo", true).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(registry.cache_state(), CacheState::Populated);
    }

    #[test]
    fn xinetd_listing_needs_enabled_xinetd() {
        let fx = Fixture::new();
        let legacy = FakeLegacy {
            xinetd_listing: "tftp: on\n".to_string(),
            ..FakeLegacy::default()
        };
        let init = FakeInit::default().unit("xinetd.service", "active", "disabled");
        let mut registry = fx.registry(init, legacy);

        assert!(registry.xinetd_services().unwrap().is_empty());
        registry.service_info().unwrap();
        assert!(registry.xinetd_services().unwrap().is_empty());
        assert_eq!(registry.backend_for("tftp"), BackendKind::Systemd);
    }

    #[test]
    fn xinetd_services_route_to_chkconfig() {
        let fx = Fixture::new();
        let legacy = FakeLegacy {
            xinetd_listing: "xinetd based services:\n\ttftp:\toff\n\tbogus\n\trsync:\ton\n".to_string(),
            ..FakeLegacy::default()
        };
        let init = FakeInit::default().unit("xinetd.service", "active", "enabled");
        let mut registry = fx.registry(init, legacy);
        registry.service_info().unwrap();

        let xinetd = registry.xinetd_services().unwrap();
        assert_eq!(xinetd.len(), 2);
        assert_eq!(xinetd.get("tftp"), Some(&false));
        assert_eq!(xinetd.get("rsync"), Some(&true));

        assert_eq!(registry.backend_for("tftp"), BackendKind::Xinetd);
        registry.set_service("tftp", true).unwrap();
        assert_eq!(registry.legacy_tools().toggles, vec!["add tftp".to_string()]);
        assert!(registry.init_system().enabled.is_empty());
    }
}
