//! Shared build-artifact cache.
//!
//! One cache directory serves every compile in the image: the warm-up build,
//! notebook cells compiled by the kernel, and manual builds. Its location and
//! size limit reach those processes through two environment variables; the
//! cache tool does its own locking.

mod size;
mod stats;

pub use size::CacheSize;
pub use stats::CacheStats;

use crate::util::{CommandRunner, CommandSpec};
use burnbox_shared::constants::{cache, env};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Mode of the cache directory: every user and service writes to it.
const SHARED_DIR_MODE: u32 = 0o777;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub max_size: CacheSize,
}

/// Whether [`CacheConfig::prepare`] created the directory or found it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDirState {
    Created,
    Reused,
}

impl CacheConfig {
    pub fn new(dir: impl Into<PathBuf>, max_size: CacheSize) -> Self {
        Self {
            dir: dir.into(),
            max_size,
        }
    }

    /// `SCCACHE_DIR` and `SCCACHE_CACHE_SIZE`.
    pub fn env(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (env::CACHE_DIR.to_string(), self.dir.display().to_string()),
            (env::CACHE_SIZE.to_string(), self.max_size.to_string()),
        ])
    }

    /// Cache variables plus `RUSTC_WRAPPER`, for processes that compile.
    pub fn routing_env(&self) -> BTreeMap<String, String> {
        let mut vars = self.env();
        vars.insert(env::RUSTC_WRAPPER.to_string(), cache::TOOL.to_string());
        vars
    }

    /// Create the cache directory, or reuse it if it already exists, and make
    /// it writable by every user.
    ///
    /// An existing directory is never emptied or recreated.
    pub fn prepare(&self) -> BurnboxResult<CacheDirState> {
        let state = if self.dir.is_dir() {
            CacheDirState::Reused
        } else if self.dir.exists() {
            return Err(BurnboxError::Storage(format!(
                "Cache path exists but is not a directory: {}",
                self.dir.display()
            )));
        } else {
            fs::create_dir_all(&self.dir).map_err(|e| {
                BurnboxError::Storage(format!(
                    "Failed to create cache directory {}: {}",
                    self.dir.display(),
                    e
                ))
            })?;
            CacheDirState::Created
        };

        fs::set_permissions(&self.dir, fs::Permissions::from_mode(SHARED_DIR_MODE)).map_err(
            |e| {
                BurnboxError::Storage(format!(
                    "Failed to set permissions on {}: {}",
                    self.dir.display(),
                    e
                ))
            },
        )?;

        tracing::debug!(dir = %self.dir.display(), state = ?state, "Cache directory ready");
        Ok(state)
    }

    /// Bytes currently stored under the cache directory.
    pub fn disk_usage(&self) -> BurnboxResult<u64> {
        disk_usage(&self.dir)
    }
}

pub fn disk_usage(dir: &Path) -> BurnboxResult<u64> {
    let mut total = 0;
    for entry in WalkDir::new(dir) {
        let entry = entry.map_err(|e| {
            BurnboxError::Storage(format!("Failed to walk {}: {}", dir.display(), e))
        })?;
        if entry.file_type().is_file() {
            total += entry
                .metadata()
                .map_err(|e| BurnboxError::Storage(e.to_string()))?
                .len();
        }
    }
    Ok(total)
}

/// Ask the cache tool for its counters.
pub async fn query_stats(
    runner: &dyn CommandRunner,
    vars: &BTreeMap<String, String>,
) -> BurnboxResult<CacheStats> {
    let out = runner
        .run(
            &CommandSpec::new(cache::TOOL)
                .args(["--show-stats", "--stats-format=json"])
                .envs(vars)
                .capture(),
        )
        .await?;
    CacheStats::parse(&out.stdout)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::CommandOutput;
    use crate::util::testing::RecordingRunner;
    use tempfile::TempDir;

    fn config(dir: &Path) -> CacheConfig {
        CacheConfig::new(dir.join(".cache/sccache"), "10G".parse().unwrap())
    }

    #[test]
    fn test_env_vars() {
        let cfg = CacheConfig::new("/workspace/.cache/sccache", "10G".parse().unwrap());
        let vars = cfg.routing_env();
        assert_eq!(vars["SCCACHE_DIR"], "/workspace/.cache/sccache");
        assert_eq!(vars["SCCACHE_CACHE_SIZE"], "10G");
        assert_eq!(vars["RUSTC_WRAPPER"], "sccache");
        assert!(!cfg.env().contains_key("RUSTC_WRAPPER"));
    }

    #[test]
    fn test_prepare_creates_then_reuses_without_clearing() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());

        assert_eq!(cfg.prepare().unwrap(), CacheDirState::Created);
        fs::write(cfg.dir.join("artifact"), vec![0u8; 128]).unwrap();

        assert_eq!(cfg.prepare().unwrap(), CacheDirState::Reused);
        assert!(cfg.dir.join("artifact").exists());
        assert_eq!(cfg.disk_usage().unwrap(), 128);

        let mode = fs::metadata(&cfg.dir).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o777);
    }

    #[test]
    fn test_prepare_rejects_file_in_the_way() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(cfg.dir.parent().unwrap()).unwrap();
        fs::write(&cfg.dir, "not a dir").unwrap();
        assert!(matches!(cfg.prepare(), Err(BurnboxError::Storage(_))));
    }

    #[tokio::test]
    async fn test_query_stats_passes_cache_env() {
        let runner = RecordingRunner::default();
        runner.respond(
            "sccache",
            CommandOutput::success(
                r#"{"stats":{"compile_requests":3,"cache_hits":{"counts":{"Rust":2}},"cache_misses":{"counts":{"Rust":1}}}}"#,
            ),
        );
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());

        let stats = query_stats(&runner, &cfg.env()).await.unwrap();
        assert_eq!(stats.cache_hits, 2);

        let calls = runner.calls();
        assert_eq!(calls[0].args, vec!["--show-stats", "--stats-format=json"]);
        assert_eq!(calls[0].env["SCCACHE_DIR"], cfg.dir.display().to_string());
    }
}
