//! Filesystem layout of the provisioned environment.
//!
//! ```text
//! <root>/
//! ├── <project>/src/          compute server crate
//! ├── remote-client/src/      example client crate
//! ├── notebooks/
//! ├── .cache/sccache/         shared build cache
//! ├── .burnbox/               materialization ledger, provision report
//! ├── start-burn-server.sh
//! └── README.md
//! ```

use crate::options::ProvisionOptions;
use burnbox_shared::constants::{paths, services};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
    project_name: String,
}

impl WorkspaceLayout {
    pub fn new(root: impl Into<PathBuf>, project_name: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            project_name: project_name.into(),
        }
    }

    pub fn from_options(options: &ProvisionOptions) -> Self {
        Self::new(&options.workspace.root, &options.workspace.project_name)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    pub fn project_dir(&self) -> PathBuf {
        self.root.join(&self.project_name)
    }

    pub fn project_src_dir(&self) -> PathBuf {
        self.project_dir().join("src")
    }

    pub fn project_manifest(&self) -> PathBuf {
        self.project_dir().join("Cargo.toml")
    }

    pub fn notebooks_dir(&self) -> PathBuf {
        self.root.join(paths::NOTEBOOKS_DIR)
    }

    pub fn cache_root(&self) -> PathBuf {
        self.root.join(paths::CACHE_DIR)
    }

    /// Directory handed to the cache tool.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_root().join(paths::CACHE_TOOL_SUBDIR)
    }

    pub fn client_dir(&self) -> PathBuf {
        self.root.join(paths::CLIENT_DIR)
    }

    pub fn state_dir(&self) -> PathBuf {
        self.root.join(paths::STATE_DIR)
    }

    pub fn ledger_path(&self) -> PathBuf {
        self.state_dir().join("materialized.json")
    }

    pub fn report_path(&self) -> PathBuf {
        self.state_dir().join("provision.json")
    }

    pub fn start_script(&self) -> PathBuf {
        self.root.join(paths::START_SCRIPT)
    }

    pub fn readme(&self) -> PathBuf {
        self.root.join(paths::README)
    }

    /// Create every directory of the layout. Existing directories are kept.
    pub fn prepare(&self) -> BurnboxResult<()> {
        for dir in [
            self.project_src_dir(),
            self.notebooks_dir(),
            self.cache_root(),
            self.client_dir().join("src"),
            self.state_dir(),
        ] {
            std::fs::create_dir_all(&dir).map_err(|e| {
                BurnboxError::Storage(format!(
                    "Failed to create directory {}: {}",
                    dir.display(),
                    e
                ))
            })?;
        }
        Ok(())
    }
}

/// Locations outside the workspace: supervisor units, logs, login files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLayout {
    pub supervisor_conf_dir: PathBuf,
    pub supervisor_log_dir: PathBuf,
    pub profile_script: PathBuf,
    pub home_dir: PathBuf,
}

impl SystemLayout {
    pub fn from_options(options: &ProvisionOptions) -> Self {
        Self {
            supervisor_conf_dir: options.system.supervisor_conf_dir.clone(),
            supervisor_log_dir: options.system.supervisor_log_dir.clone(),
            profile_script: options.system.profile_script.clone(),
            home_dir: options.home_dir(),
        }
    }

    pub fn stdout_log(&self, service: &str) -> PathBuf {
        self.supervisor_log_dir.join(format!("{}.out.log", service))
    }

    pub fn stderr_log(&self, service: &str) -> PathBuf {
        self.supervisor_log_dir.join(format!("{}.err.log", service))
    }

    /// Unit path in its enabled form (`<name>.conf`).
    pub fn unit_path(&self, service: &str) -> PathBuf {
        self.supervisor_conf_dir
            .join(format!("{}.{}", service, services::UNIT_EXTENSION))
    }

    pub fn bashrc(&self) -> PathBuf {
        self.home_dir.join(".bashrc")
    }

    /// Marker file that stops the base image's tmux auto-attach.
    pub fn no_auto_tmux(&self) -> PathBuf {
        self.home_dir.join(".no_auto_tmux")
    }

    pub fn multiplexer_config(&self) -> PathBuf {
        self.home_dir.join(".config/zellij/config.kdl")
    }
}
