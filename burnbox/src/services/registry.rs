//! Unit files on disk and their enabled/disabled state.
//!
//! supervisord only includes `conf.d/*.conf`. A unit is:
//! - enabled: `<name>.conf`
//! - disabled but present: `<name>.conf.disabled`
//! - missing: neither file
//!
//! State changes are renames; unit contents are never edited to toggle.

use super::unit::ServiceUnit;
use crate::util::write_file;
use burnbox_shared::constants::services::{DISABLED_SUFFIX, UNIT_EXTENSION};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    Enabled,
    Disabled,
    Missing,
}

impl fmt::Display for ServiceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ServiceState::Enabled => "enabled",
            ServiceState::Disabled => "disabled",
            ServiceState::Missing => "missing",
        })
    }
}

#[derive(Debug, Clone)]
pub struct ServiceRegistry {
    conf_dir: PathBuf,
}

impl ServiceRegistry {
    pub fn new(conf_dir: impl Into<PathBuf>) -> Self {
        Self {
            conf_dir: conf_dir.into(),
        }
    }

    pub fn conf_dir(&self) -> &Path {
        &self.conf_dir
    }

    pub fn enabled_path(&self, name: &str) -> PathBuf {
        self.conf_dir.join(format!("{}.{}", name, UNIT_EXTENSION))
    }

    pub fn disabled_path(&self, name: &str) -> PathBuf {
        self.conf_dir
            .join(format!("{}.{}.{}", name, UNIT_EXTENSION, DISABLED_SUFFIX))
    }

    pub fn state(&self, name: &str) -> BurnboxResult<ServiceState> {
        match (
            self.enabled_path(name).is_file(),
            self.disabled_path(name).is_file(),
        ) {
            (true, false) => Ok(ServiceState::Enabled),
            (false, true) => Ok(ServiceState::Disabled),
            (false, false) => Ok(ServiceState::Missing),
            (true, true) => Err(BurnboxError::Service(format!(
                "both {} and {} exist; remove one",
                self.enabled_path(name).display(),
                self.disabled_path(name).display()
            ))),
        }
    }

    /// Write `unit`, keeping the state it is already in.
    ///
    /// `default_enabled` only decides the file name of a unit that does not
    /// exist yet; an existing unit gets new contents under its current name.
    pub fn install(&self, unit: &ServiceUnit, default_enabled: bool) -> BurnboxResult<ServiceState> {
        let contents = unit.render()?;
        let state = match self.state(&unit.name)? {
            ServiceState::Missing if default_enabled => ServiceState::Enabled,
            ServiceState::Missing => ServiceState::Disabled,
            existing => existing,
        };
        let target = match state {
            ServiceState::Enabled => self.enabled_path(&unit.name),
            _ => self.disabled_path(&unit.name),
        };

        write_file(&target, &contents)?;

        tracing::info!(
            service = %unit.name,
            path = %target.display(),
            state = %state,
            "Installed service unit"
        );
        Ok(state)
    }

    /// Rename `<name>.conf.disabled` to `<name>.conf`.
    ///
    /// Returns `false` if the unit was already enabled.
    pub fn enable(&self, name: &str) -> BurnboxResult<bool> {
        match self.state(name)? {
            ServiceState::Enabled => Ok(false),
            ServiceState::Disabled => {
                self.rename(&self.disabled_path(name), &self.enabled_path(name))?;
                Ok(true)
            }
            ServiceState::Missing => Err(BurnboxError::NotFound(format!(
                "service unit {} in {}",
                name,
                self.conf_dir.display()
            ))),
        }
    }

    /// Rename `<name>.conf` to `<name>.conf.disabled`.
    ///
    /// Returns `false` if the unit was already disabled.
    pub fn disable(&self, name: &str) -> BurnboxResult<bool> {
        match self.state(name)? {
            ServiceState::Disabled => Ok(false),
            ServiceState::Enabled => {
                self.rename(&self.enabled_path(name), &self.disabled_path(name))?;
                Ok(true)
            }
            ServiceState::Missing => Err(BurnboxError::NotFound(format!(
                "service unit {} in {}",
                name,
                self.conf_dir.display()
            ))),
        }
    }

    fn rename(&self, from: &Path, to: &Path) -> BurnboxResult<()> {
        std::fs::rename(from, to).map_err(|e| {
            BurnboxError::Service(format!(
                "Failed to rename {} to {}: {}",
                from.display(),
                to.display(),
                e
            ))
        })?;
        tracing::info!(from = %from.display(), to = %to.display(), "Renamed service unit");
        Ok(())
    }
}
