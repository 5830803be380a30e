//! Record of a successful provisioning run.

use super::ProvisionMode;
use crate::cache::{CacheDirState, CacheStats};
use crate::pipeline::PipelineMetrics;
use crate::util::write_file;
use burnbox_shared::errors::BurnboxResult;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    pub run_id: String,
    pub mode: ProvisionMode,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub metrics: PipelineMetrics,
    pub files_written: usize,
    /// Generated files left alone because the user edited them.
    pub files_preserved: Vec<PathBuf>,
    /// Service name to `enabled` / `disabled`.
    pub services: BTreeMap<String, String>,
    /// Whether the cache directory was created or an existing one reused.
    pub cache_dir: Option<CacheDirState>,
    /// Cache activity during the warm-up build.
    pub warmup_cache: Option<CacheStats>,
}

impl ProvisionReport {
    pub fn write(&self, path: &Path) -> BurnboxResult<()> {
        write_file(path, &serde_json::to_string_pretty(self)?)
    }

    /// One line per task, slowest stages visible at a glance.
    pub fn log_summary(&self) {
        for stage in &self.metrics.stages {
            for task in &stage.tasks {
                tracing::info!(
                    stage = %stage.name,
                    task = %task.name,
                    duration_ms = task.duration_ms,
                    "Task timing"
                );
            }
        }
        tracing::info!(
            run_id = %self.run_id,
            mode = %self.mode,
            total_ms = self.metrics.total_duration_ms,
            files_written = self.files_written,
            files_preserved = self.files_preserved.len(),
            "Provisioning complete"
        );
    }
}
