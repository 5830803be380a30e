//! Compute-server start rules.
//!
//! The generated server resolves its listen port and backend at start-up;
//! these functions implement the same rules so they can be checked before a
//! GPU is ever involved (`burnbox compute check`).

use burnbox_shared::constants::{backends, env, ports};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

/// Compile-time selected execution target. Exactly one per build.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    /// NVIDIA GPUs through the CUDA driver.
    Cuda,
    /// Vulkan/Metal/DX12 GPUs through wgpu.
    Wgpu,
}

impl Backend {
    pub const ALL: [Backend; 2] = [Backend::Cuda, Backend::Wgpu];

    /// Cargo feature that enables this backend.
    pub fn feature(self) -> &'static str {
        match self {
            Backend::Cuda => backends::CUDA,
            Backend::Wgpu => backends::WGPU,
        }
    }

    /// Backend type exported by the tensor library.
    pub fn type_path(self) -> &'static str {
        match self {
            Backend::Cuda => "burn::backend::Cuda",
            Backend::Wgpu => "burn::backend::Wgpu",
        }
    }

    /// The other backend.
    pub fn alternative(self) -> Backend {
        match self {
            Backend::Cuda => Backend::Wgpu,
            Backend::Wgpu => Backend::Cuda,
        }
    }

    /// Pick the single backend enabled by `features`.
    ///
    /// Zero or both backend features enabled is a configuration error, never
    /// a silent choice.
    pub fn select<S: AsRef<str>>(features: &[S]) -> BurnboxResult<Backend> {
        let enabled: Vec<Backend> = Backend::ALL
            .into_iter()
            .filter(|b| features.iter().any(|f| f.as_ref() == b.feature()))
            .collect();

        match enabled.as_slice() {
            [backend] => Ok(*backend),
            [] => Err(BurnboxError::Config(format!(
                "no compute backend selected: enable exactly one of the `{}` or `{}` features",
                backends::CUDA,
                backends::WGPU
            ))),
            _ => Err(BurnboxError::Config(format!(
                "features `{}` and `{}` are mutually exclusive: enable exactly one backend",
                backends::CUDA,
                backends::WGPU
            ))),
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.feature())
    }
}

impl FromStr for Backend {
    type Err = BurnboxError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Backend::ALL
            .into_iter()
            .find(|b| b.feature() == s)
            .ok_or_else(|| BurnboxError::Config(format!("unknown backend: {}", s)))
    }
}

/// Resolve the listen port from the raw value of `BURN_SERVER_PORT`.
///
/// Absent means the default (3000); present but not a `u16` is fatal.
pub fn resolve_port(raw: Option<&str>) -> BurnboxResult<u16> {
    match raw {
        None => Ok(ports::SERVER_DEFAULT),
        Some(value) => value.parse::<u16>().map_err(|_| {
            BurnboxError::Config(format!(
                "{} must be a valid port number (0-65535), got: {:?}",
                env::SERVER_PORT,
                value
            ))
        }),
    }
}

/// Resolve the listen port from the current process environment.
pub fn port_from_env() -> BurnboxResult<u16> {
    match std::env::var(env::SERVER_PORT) {
        Ok(value) => resolve_port(Some(&value)),
        Err(std::env::VarError::NotPresent) => resolve_port(None),
        Err(std::env::VarError::NotUnicode(raw)) => Err(BurnboxError::Config(format!(
            "{} must be a valid port number (0-65535), got: {:?}",
            env::SERVER_PORT,
            raw
        ))),
    }
}

#[derive(Debug, Deserialize)]
struct ManifestDoc {
    package: Option<ManifestPackage>,
    #[serde(default)]
    features: toml::Table,
}

#[derive(Debug, Deserialize)]
struct ManifestPackage {
    name: String,
}

/// What a project manifest builds by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestCheck {
    pub package: String,
    pub default_features: Vec<String>,
    pub backend: Backend,
}

/// Check that a manifest's default features select exactly one backend and
/// that every backend feature is declared.
pub fn check_manifest(path: &Path) -> BurnboxResult<ManifestCheck> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        BurnboxError::NotFound(format!("manifest {}: {}", path.display(), e))
    })?;
    check_manifest_str(&text)
}

pub fn check_manifest_str(text: &str) -> BurnboxResult<ManifestCheck> {
    let doc: ManifestDoc = toml::from_str(text)
        .map_err(|e| BurnboxError::Config(format!("invalid manifest: {}", e)))?;

    let package = doc
        .package
        .map(|p| p.name)
        .ok_or_else(|| BurnboxError::Config("manifest has no [package] table".into()))?;

    for backend in Backend::ALL {
        if !doc.features.contains_key(backend.feature()) {
            return Err(BurnboxError::Config(format!(
                "manifest does not declare the `{}` feature",
                backend.feature()
            )));
        }
    }

    let default_features: Vec<String> = doc
        .features
        .get("default")
        .and_then(|v| v.as_array())
        .map(|items| {
            items
                .iter()
                .filter_map(|i| i.as_str().map(String::from))
                .collect()
        })
        .unwrap_or_default();

    let backend = Backend::select(&default_features)?;

    Ok(ManifestCheck {
        package,
        default_features,
        backend,
    })
}
