//! Fixed names, ports and paths of the provisioned environment.
//!
//! Centralized location for every value that both the generated files and
//! the operations CLI must agree on.

/// Environment variables read by provisioned processes.
pub mod env {
    /// Listen port of the compute server.
    pub const SERVER_PORT: &str = "BURN_SERVER_PORT";

    /// Build-artifact cache directory.
    pub const CACHE_DIR: &str = "SCCACHE_DIR";

    /// Maximum size of the build-artifact cache.
    pub const CACHE_SIZE: &str = "SCCACHE_CACHE_SIZE";

    /// Routes every rustc invocation through the cache tool.
    pub const RUSTC_WRAPPER: &str = "RUSTC_WRAPPER";

    /// Set by the terminal multiplexer inside an active session.
    pub const MULTIPLEXER_SESSION: &str = "ZELLIJ";

    /// URL the example remote client connects to.
    pub const REMOTE_BACKEND_URL: &str = "REMOTE_BACKEND_URL";

    /// Path of the burnbox configuration file.
    pub const CONFIG_PATH: &str = "BURNBOX_CONFIG";

    /// Overrides the workspace root.
    pub const ROOT: &str = "BURNBOX_ROOT";
}

/// Network ports.
pub mod ports {
    /// Compute server default when `BURN_SERVER_PORT` is unset.
    pub const SERVER_DEFAULT: u16 = 3000;

    /// Notebook server, fixed.
    pub const NOTEBOOK: u16 = 8888;
}

/// Default filesystem layout inside the image.
pub mod paths {
    pub const WORKSPACE_ROOT: &str = "/workspace";
    pub const PROJECT_NAME: &str = "burn-server";
    pub const NOTEBOOKS_DIR: &str = "notebooks";
    pub const CACHE_DIR: &str = ".cache";
    pub const CACHE_TOOL_SUBDIR: &str = "sccache";
    pub const CLIENT_DIR: &str = "remote-client";
    pub const STATE_DIR: &str = ".burnbox";
    pub const START_SCRIPT: &str = "start-burn-server.sh";
    pub const README: &str = "README.md";
    pub const NOTEBOOK_FILE: &str = "burn-example.ipynb";

    pub const SUPERVISOR_CONF_DIR: &str = "/etc/supervisor/conf.d";
    pub const SUPERVISOR_LOG_DIR: &str = "/var/log/supervisor";
    pub const PROFILE_SCRIPT: &str = "/etc/profile.d/burnbox.sh";

    /// Config file written next to the Containerfile and copied into the image.
    pub const CONFIG_FILE: &str = "burnbox.toml";
    pub const IMAGE_CONFIG: &str = "/etc/burnbox.toml";
}

/// Service unit names and the disabling suffix.
pub mod services {
    pub const COMPUTE: &str = "burn-server";
    pub const NOTEBOOK: &str = "jupyter";

    /// Extension supervisord picks up from its include directory.
    pub const UNIT_EXTENSION: &str = "conf";

    /// Appended to a unit file name to keep it present but ignored.
    pub const DISABLED_SUFFIX: &str = "disabled";
}

/// Build-artifact cache defaults.
pub mod cache {
    pub const TOOL: &str = "sccache";
    pub const DEFAULT_MAX_SIZE: &str = "10G";
}

/// Compute backends, named after their cargo features.
pub mod backends {
    pub const CUDA: &str = "cuda";
    pub const WGPU: &str = "wgpu";
}
