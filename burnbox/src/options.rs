//! Provisioning configuration.
//!
//! Loaded from a TOML file (`--config` or `BURNBOX_CONFIG`); every field has a
//! default matching the stock image. A `BURNBOX_CONFIG` pointing at a missing
//! file means defaults; a missing `--config` file is an error.

use crate::cache::CacheSize;
use crate::compute::Backend;
use burnbox_shared::constants::{cache, env, paths, ports};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_BASE_IMAGE: &str = "nvidia/cuda:12.4.1-cudnn-devel-ubuntu22.04";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionOptions {
    /// Image the Containerfile starts from. Must ship the GPU driver stack.
    pub base_image: String,
    pub workspace: WorkspaceOptions,
    pub toolchain: ToolchainOptions,
    pub cache: CacheOptions,
    pub compute: ComputeOptions,
    pub notebook: NotebookOptions,
    pub system: SystemOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkspaceOptions {
    pub root: PathBuf,
    pub project_name: String,
    /// Compile the project once after writing it to populate the cache.
    pub warmup: bool,
    /// Overwrite generated files even when the user edited them.
    pub force: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainOptions {
    pub channel: String,
    pub profile: String,
    pub components: Vec<String>,
    pub system_packages: Vec<String>,
    pub python_packages: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Human-readable size, e.g. `10G`.
    pub max_size: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComputeOptions {
    pub port: u16,
    pub default_backend: Backend,
    /// Ship the compute server unit enabled instead of disabled-but-present.
    pub autostart: bool,
    pub autorestart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotebookOptions {
    pub autostart: bool,
    pub autorestart: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemOptions {
    pub supervisor_conf_dir: PathBuf,
    pub supervisor_log_dir: PathBuf,
    pub profile_script: PathBuf,
    /// Home directory receiving the shell hook and multiplexer config.
    /// Defaults to the current user's home.
    pub home_dir: Option<PathBuf>,
    /// Also write burnbox's own log to `<log_dir>/burnbox.log`.
    pub log_dir: Option<PathBuf>,
}

impl Default for ProvisionOptions {
    fn default() -> Self {
        Self {
            base_image: DEFAULT_BASE_IMAGE.to_string(),
            workspace: WorkspaceOptions::default(),
            toolchain: ToolchainOptions::default(),
            cache: CacheOptions::default(),
            compute: ComputeOptions::default(),
            notebook: NotebookOptions::default(),
            system: SystemOptions::default(),
        }
    }
}

impl Default for WorkspaceOptions {
    fn default() -> Self {
        Self {
            root: PathBuf::from(paths::WORKSPACE_ROOT),
            project_name: paths::PROJECT_NAME.to_string(),
            warmup: true,
            force: false,
        }
    }
}

impl Default for ToolchainOptions {
    fn default() -> Self {
        Self {
            channel: "stable".to_string(),
            profile: "default".to_string(),
            components: ["rust-src", "clippy", "rustfmt", "rust-analyzer"]
                .map(String::from)
                .to_vec(),
            system_packages: [
                "build-essential",
                "pkg-config",
                "libssl-dev",
                "curl",
                "git",
                "ca-certificates",
                "supervisor",
                "python3",
                "python3-pip",
                "libvulkan1",
            ]
            .map(String::from)
            .to_vec(),
            python_packages: ["jupyterlab"].map(String::from).to_vec(),
        }
    }
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            max_size: cache::DEFAULT_MAX_SIZE.to_string(),
        }
    }
}

impl Default for ComputeOptions {
    fn default() -> Self {
        Self {
            port: ports::SERVER_DEFAULT,
            default_backend: Backend::Cuda,
            autostart: false,
            autorestart: true,
        }
    }
}

impl Default for NotebookOptions {
    fn default() -> Self {
        Self {
            autostart: true,
            autorestart: true,
        }
    }
}

impl Default for SystemOptions {
    fn default() -> Self {
        Self {
            supervisor_conf_dir: PathBuf::from(paths::SUPERVISOR_CONF_DIR),
            supervisor_log_dir: PathBuf::from(paths::SUPERVISOR_LOG_DIR),
            profile_script: PathBuf::from(paths::PROFILE_SCRIPT),
            home_dir: None,
            log_dir: None,
        }
    }
}

/// Where options come from, resolved before logging is up so the choice can
/// be reported afterwards.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigSource {
    pub path: Option<PathBuf>,
    /// Given on the command line; a missing file is then an error.
    pub explicit: bool,
    pub root_override: Option<PathBuf>,
}

impl ConfigSource {
    /// `--config`, then `BURNBOX_CONFIG`; `BURNBOX_ROOT` overrides the root.
    pub fn discover(path: Option<&Path>) -> Self {
        let root_override = std::env::var_os(env::ROOT).map(PathBuf::from);
        match path {
            Some(path) => Self {
                path: Some(path.to_path_buf()),
                explicit: true,
                root_override,
            },
            None => Self {
                path: std::env::var_os(env::CONFIG_PATH).map(PathBuf::from),
                explicit: false,
                root_override,
            },
        }
    }

    /// The file that will actually be read, if any.
    fn readable_path(&self) -> Option<&Path> {
        self.path
            .as_deref()
            .filter(|path| self.explicit || path.exists())
    }

    pub fn load(&self) -> BurnboxResult<ProvisionOptions> {
        let mut options = match self.readable_path() {
            Some(path) => {
                let text = std::fs::read_to_string(path).map_err(|e| {
                    BurnboxError::Config(format!(
                        "Failed to read config {}: {}",
                        path.display(),
                        e
                    ))
                })?;
                ProvisionOptions::from_toml(&text)?
            }
            None => ProvisionOptions::default(),
        };

        if let Some(root) = &self.root_override {
            options.workspace.root = root.clone();
        }

        options.sanitize()?;
        Ok(options)
    }

    /// Report the resolved source. Call once logging is initialized.
    pub fn log(&self) {
        match (&self.path, self.readable_path()) {
            (_, Some(path)) => tracing::debug!(path = %path.display(), "Loaded config file"),
            (Some(path), None) => tracing::debug!(
                path = %path.display(),
                "{} points at a missing file; using defaults",
                env::CONFIG_PATH
            ),
            (None, None) => tracing::debug!("No config file; using defaults"),
        }
        if let Some(root) = &self.root_override {
            tracing::debug!(root = %root.display(), "Workspace root overridden from environment");
        }
    }
}

impl ProvisionOptions {
    pub fn from_toml(text: &str) -> BurnboxResult<Self> {
        toml::from_str(text).map_err(|e| BurnboxError::Config(format!("Invalid config: {}", e)))
    }

    pub fn to_toml(&self) -> BurnboxResult<String> {
        toml::to_string_pretty(self)
            .map_err(|e| BurnboxError::Config(format!("Failed to serialize config: {}", e)))
    }

    /// Validate option values before any work starts.
    pub fn sanitize(&self) -> BurnboxResult<()> {
        let absolute = [
            ("workspace.root", &self.workspace.root),
            ("system.supervisor_conf_dir", &self.system.supervisor_conf_dir),
            ("system.supervisor_log_dir", &self.system.supervisor_log_dir),
            ("system.profile_script", &self.system.profile_script),
        ];
        for (field, path) in absolute {
            if !path.is_absolute() {
                return Err(BurnboxError::Config(format!(
                    "{} must be an absolute path, got: {}",
                    field,
                    path.display()
                )));
            }
        }

        let name = &self.workspace.project_name;
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(BurnboxError::Config(format!(
                "workspace.project_name must be a non-empty cargo package name, got: {:?}",
                name
            )));
        }

        if self.base_image.trim().is_empty() {
            return Err(BurnboxError::Config("base_image must not be empty".into()));
        }

        self.max_cache_size()?;
        Ok(())
    }

    pub fn max_cache_size(&self) -> BurnboxResult<CacheSize> {
        self.cache.max_size.parse()
    }

    /// Home directory for per-user files.
    pub fn home_dir(&self) -> PathBuf {
        self.system
            .home_dir
            .clone()
            .or_else(dirs::home_dir)
            .unwrap_or_else(|| PathBuf::from("/root"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_image_contract() {
        let options = ProvisionOptions::default();
        assert_eq!(options.workspace.root, PathBuf::from("/workspace"));
        assert_eq!(options.workspace.project_name, "burn-server");
        assert_eq!(options.compute.port, 3000);
        assert_eq!(options.compute.default_backend, Backend::Cuda);
        assert!(!options.compute.autostart);
        assert!(options.notebook.autostart);
        assert_eq!(options.cache.max_size, "10G");
        assert!(options.sanitize().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_other_defaults() {
        let options = ProvisionOptions::from_toml(
            r#"
            [compute]
            autostart = true
            default_backend = "wgpu"

            [cache]
            max_size = "20G"
            "#,
        )
        .unwrap();
        assert!(options.compute.autostart);
        assert_eq!(options.compute.default_backend, Backend::Wgpu);
        assert_eq!(options.compute.port, 3000);
        assert_eq!(options.cache.max_size, "20G");
        assert_eq!(options.workspace.project_name, "burn-server");
    }

    #[test]
    fn test_unknown_backend_rejected() {
        let err = ProvisionOptions::from_toml("[compute]\ndefault_backend = \"metal\"").unwrap_err();
        assert!(matches!(err, BurnboxError::Config(_)));
    }

    #[test]
    fn test_load_file_with_root_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("burnbox.toml");
        std::fs::write(&path, "[workspace]\nproject_name = \"my-server\"\n").unwrap();

        let options = ConfigSource {
            path: Some(path),
            explicit: true,
            root_override: Some(dir.path().join("ws")),
        }
        .load()
        .unwrap();
        assert_eq!(options.workspace.project_name, "my-server");
        assert_eq!(options.workspace.root, dir.path().join("ws"));
    }

    #[test]
    fn test_explicit_path_is_resolved_without_reading() {
        let source = ConfigSource::discover(Some(Path::new("/etc/custom.toml")));
        assert_eq!(source.path.as_deref(), Some(Path::new("/etc/custom.toml")));
        assert!(source.explicit);
        assert_eq!(source.readable_path(), Some(Path::new("/etc/custom.toml")));
    }

    #[test]
    fn test_missing_explicit_config_is_error() {
        let err = ConfigSource {
            path: Some(PathBuf::from("/nonexistent/burnbox.toml")),
            explicit: true,
            root_override: None,
        }
        .load()
        .unwrap_err();
        assert!(matches!(err, BurnboxError::Config(_)));
    }

    #[test]
    fn test_missing_config_from_environment_means_defaults() {
        let options = ConfigSource {
            path: Some(PathBuf::from("/nonexistent/burnbox.toml")),
            explicit: false,
            root_override: None,
        }
        .load()
        .unwrap();
        assert_eq!(options, ProvisionOptions::default());
    }

    #[test]
    fn test_serialized_options_load_back() {
        let mut options = ProvisionOptions::default();
        options.compute.autostart = true;
        options.compute.default_backend = Backend::Wgpu;
        options.system.log_dir = Some(PathBuf::from("/var/log/burnbox"));

        let text = options.to_toml().unwrap();
        assert!(text.contains("default_backend = \"wgpu\""));
        assert_eq!(ProvisionOptions::from_toml(&text).unwrap(), options);
    }

    #[test]
    fn test_sanitize_rejects_relative_root_and_bad_names() {
        let mut options = ProvisionOptions::default();
        options.workspace.root = PathBuf::from("workspace");
        assert!(options.sanitize().is_err());

        let mut options = ProvisionOptions::default();
        options.workspace.project_name = "bad name".into();
        assert!(options.sanitize().is_err());

        let mut options = ProvisionOptions::default();
        options.cache.max_size = "lots".into();
        assert!(options.sanitize().is_err());
    }
}
