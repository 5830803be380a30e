//! Image provisioning orchestration.
//!
//! ## Architecture
//!
//! Provisioning is table-driven with one execution plan per mode:
//!
//! ```text
//! Full (image build):
//!   1. base        system_packages, notebook_server
//!   2. toolchain   rust_toolchain, cargo_binstall, cache_tool,
//!                  cache_routing, multiplexer, notebook_kernel
//!   3. workspace   materialize, warmup_build
//!   4. services    service_units
//!   5. session     session_hook
//!
//! WorkspaceOnly (render into an arbitrary root):
//!   3. workspace   materialize, warmup_build
//!   4. services    service_units
//!   5. session     session_hook
//! ```
//!
//! Every stage is sequential and the first failure aborts the run. The
//! report is written only when every task succeeded.

mod report;
mod tasks;
mod types;

pub use report::ProvisionReport;
pub use tasks::ProvisionCtx;
pub use types::{ProvisionContext, WarmupOutput};

use crate::options::ProvisionOptions;
use crate::pipeline::{BoxedTask, ExecutionPlan, PipelineBuilder, PipelineExecutor, Stage};
use crate::util::CommandRunner;
use burnbox_shared::errors::BurnboxResult;
use chrono::Utc;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use ulid::Ulid;

use tasks::{
    BinstallTask, CacheRoutingTask, CacheToolTask, KernelTask, MaterializeTask, MultiplexerTask,
    NotebookServerTask, RustToolchainTask, ServiceUnitsTask, SessionHookTask, SystemPackagesTask,
    WarmupTask,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ProvisionMode {
    /// Everything, as run during image construction.
    Full,
    /// Workspace, units and login hook only; no installs.
    WorkspaceOnly,
}

impl fmt::Display for ProvisionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ProvisionMode::Full => "full",
            ProvisionMode::WorkspaceOnly => "workspace_only",
        })
    }
}

// ============================================================================
// EXECUTION PLAN
// ============================================================================

/// Get execution plan for `mode`.
pub fn get_execution_plan(
    mode: ProvisionMode,
    options: &ProvisionOptions,
) -> ExecutionPlan<ProvisionCtx> {
    let mut workspace: Vec<BoxedTask<ProvisionCtx>> = vec![Box::new(MaterializeTask)];
    if options.workspace.warmup {
        workspace.push(Box::new(WarmupTask));
    }

    let mut stages: Vec<Stage<BoxedTask<ProvisionCtx>>> = Vec::new();
    if mode == ProvisionMode::Full {
        stages.push(Stage::new(
            "base",
            vec![Box::new(SystemPackagesTask), Box::new(NotebookServerTask)],
        ));
        // Routing must follow the cache tool install; the kernel comes last so
        // its own build is already cached.
        stages.push(Stage::new(
            "toolchain",
            vec![
                Box::new(RustToolchainTask),
                Box::new(BinstallTask),
                Box::new(CacheToolTask),
                Box::new(CacheRoutingTask),
                Box::new(MultiplexerTask),
                Box::new(KernelTask),
            ],
        ));
    }
    stages.push(Stage::new("workspace", workspace));
    stages.push(Stage::new("services", vec![Box::new(ServiceUnitsTask)]));
    stages.push(Stage::new("session", vec![Box::new(SessionHookTask)]));

    ExecutionPlan::new(stages.into_iter().filter(|s| !s.is_empty()).collect())
}

/// Runs a provisioning plan.
///
/// # Example
///
/// ```ignore
/// let report = Provisioner::new(options, ProvisionMode::Full, Arc::new(SystemRunner))?
///     .run()
///     .await?;
/// ```
pub struct Provisioner {
    options: ProvisionOptions,
    mode: ProvisionMode,
    runner: Arc<dyn CommandRunner>,
}

impl Provisioner {
    pub fn new(
        options: ProvisionOptions,
        mode: ProvisionMode,
        runner: Arc<dyn CommandRunner>,
    ) -> BurnboxResult<Self> {
        options.sanitize()?;
        Ok(Self {
            options,
            mode,
            runner,
        })
    }

    pub fn plan(&self) -> ExecutionPlan<ProvisionCtx> {
        get_execution_plan(self.mode, &self.options)
    }

    /// Execute every stage, then write the report.
    pub async fn run(self) -> BurnboxResult<ProvisionReport> {
        let run_id = Ulid::new().to_string();
        let started_at = Utc::now();
        tracing::info!(run_id = %run_id, mode = %self.mode, "Provisioning started");

        let plan = self.plan();
        let Provisioner {
            options,
            mode,
            runner,
        } = self;

        let ctx = Arc::new(Mutex::new(ProvisionContext::new(options, runner)?));
        let metrics = PipelineExecutor::execute(PipelineBuilder::from_plan(plan), Arc::clone(&ctx))
            .await
            .inspect_err(|e| tracing::error!(run_id = %run_id, error = %e, "Provisioning failed"))?;

        let ctx = ctx.lock().await;
        let (files_written, files_preserved) = match &ctx.materialized {
            Some(outcome) => (outcome.written.len(), outcome.preserved.clone()),
            None => (0, Vec::new()),
        };
        let report = ProvisionReport {
            run_id,
            mode,
            started_at,
            finished_at: Utc::now(),
            metrics,
            files_written,
            files_preserved,
            services: ctx
                .services
                .iter()
                .map(|(name, state)| (name.clone(), state.to_string()))
                .collect(),
            cache_dir: ctx.cache_dir_state,
            warmup_cache: ctx.warmup.as_ref().and_then(WarmupOutput::delta),
        };

        report.write(&ctx.workspace.report_path())?;
        report.log_summary();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::CacheDirState;
    use crate::layout::WorkspaceLayout;
    use crate::services::{ServiceRegistry, ServiceState};
    use crate::util::CommandOutput;
    use crate::util::testing::RecordingRunner;
    use std::path::Path;
    use tempfile::TempDir;

    const STATS_BEFORE: &str = r#"{"stats": {"compile_requests": 0,
        "cache_hits": {"counts": {}}, "cache_misses": {"counts": {}}},
        "cache_size": 0, "max_cache_size": 10737418240}"#;
    const STATS_AFTER: &str = r#"{"stats": {"compile_requests": 40,
        "cache_hits": {"counts": {"Rust": 2}}, "cache_misses": {"counts": {"Rust": 38}}},
        "cache_size": 52428800, "max_cache_size": 10737418240}"#;

    fn options(root: &Path) -> ProvisionOptions {
        let mut options = ProvisionOptions::default();
        options.workspace.root = root.join("workspace");
        options.system.home_dir = Some(root.join("home"));
        options.system.supervisor_conf_dir = root.join("conf.d");
        options.system.supervisor_log_dir = root.join("log");
        options.system.profile_script = root.join("profile.d/burnbox.sh");
        options
    }

    fn programs(runner: &RecordingRunner) -> Vec<String> {
        runner.calls().into_iter().map(|c| c.program).collect()
    }

    #[test]
    fn test_full_plan_order() {
        let plan = get_execution_plan(ProvisionMode::Full, &ProvisionOptions::default());
        let described = plan.describe();
        let stages: Vec<&str> = described.iter().map(|(name, _)| *name).collect();
        assert_eq!(stages, ["base", "toolchain", "workspace", "services", "session"]);
        assert_eq!(
            described[1].1,
            [
                "rust_toolchain",
                "cargo_binstall",
                "cache_tool",
                "cache_routing",
                "multiplexer",
                "notebook_kernel"
            ]
        );
        assert_eq!(described[2].1, ["materialize", "warmup_build"]);
    }

    #[test]
    fn test_workspace_only_plan_skips_installs_and_optional_warmup() {
        let mut options = ProvisionOptions::default();
        options.workspace.warmup = false;
        let plan = get_execution_plan(ProvisionMode::WorkspaceOnly, &options);
        let described = plan.describe();
        let stages: Vec<&str> = described.iter().map(|(name, _)| *name).collect();
        assert_eq!(stages, ["workspace", "services", "session"]);
        assert_eq!(described[0].1, ["materialize"]);
    }

    #[tokio::test]
    async fn test_full_provision_runs_commands_in_order() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        runner.respond("sccache", CommandOutput::success(STATS_BEFORE));
        runner.respond("sccache", CommandOutput::success(STATS_AFTER));

        let provisioner =
            Provisioner::new(options(tmp.path()), ProvisionMode::Full, runner.clone()).unwrap();
        let report = provisioner.run().await.unwrap();

        let commands = runner.commands();
        assert_eq!(commands[0], "apt-get update");
        assert!(commands[1].starts_with("apt-get install -y --no-install-recommends build-essential"));
        assert_eq!(commands[2], "python3 -m pip install --no-cache-dir jupyterlab");
        assert!(commands[3].contains("https://sh.rustup.rs"));
        assert!(commands[3].contains("--default-toolchain stable --profile default"));
        assert_eq!(
            commands[4],
            "rustup component add rust-src clippy rustfmt rust-analyzer"
        );
        assert!(commands[5].contains("cargo-binstall"));
        assert_eq!(
            &commands[6..10],
            [
                "cargo binstall -y sccache",
                "cargo binstall -y zellij",
                "cargo binstall -y evcxr_jupyter",
                "evcxr_jupyter --install"
            ]
        );
        assert_eq!(
            &programs(&runner)[10..],
            ["sccache", "cargo", "sccache"]
        );

        // Only commands after routing see the wrapper.
        let calls = runner.calls();
        assert!(!calls[6].env.contains_key("RUSTC_WRAPPER"));
        let build = &calls[11];
        assert_eq!(build.args, ["build", "--release"]);
        assert_eq!(build.env["RUSTC_WRAPPER"], "sccache");
        assert!(build.cwd.as_ref().unwrap().ends_with("workspace/burn-server"));

        let delta = report.warmup_cache.unwrap();
        assert_eq!(delta.compile_requests, 40);
        assert_eq!(delta.cache_misses, 38);
        assert_eq!(report.services["burn-server"], "disabled");
        assert_eq!(report.services["jupyter"], "enabled");

        let root = tmp.path();
        assert!(root.join("conf.d/burn-server.conf.disabled").exists());
        assert!(root.join("conf.d/jupyter.conf").exists());
        assert!(root.join("workspace/.cache/sccache").is_dir());
        let profile = std::fs::read_to_string(root.join("profile.d/burnbox.sh")).unwrap();
        assert!(profile.contains("export RUSTC_WRAPPER=\"sccache\""));
        let bashrc = std::fs::read_to_string(root.join("home/.bashrc")).unwrap();
        assert!(bashrc.contains("zellij attach --create main"));

        let layout = WorkspaceLayout::new(root.join("workspace"), "burn-server");
        let written: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(layout.report_path()).unwrap()).unwrap();
        assert_eq!(written["mode"], "full");
        assert_eq!(written["run_id"].as_str().unwrap().len(), 26);
    }

    #[tokio::test]
    async fn test_failed_command_aborts_without_report() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::failing_on("rustup"));

        let provisioner =
            Provisioner::new(options(tmp.path()), ProvisionMode::Full, runner.clone()).unwrap();
        assert!(provisioner.run().await.is_err());

        assert_eq!(programs(&runner).last().map(String::as_str), Some("rustup"));
        assert!(!programs(&runner).contains(&"cargo".to_string()));
        let layout = WorkspaceLayout::new(tmp.path().join("workspace"), "burn-server");
        assert!(!layout.report_path().exists());
    }

    #[tokio::test]
    async fn test_workspace_only_without_warmup_runs_no_commands() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let mut options = options(tmp.path());
        options.workspace.warmup = false;

        let report = Provisioner::new(options, ProvisionMode::WorkspaceOnly, runner.clone())
            .unwrap()
            .run()
            .await
            .unwrap();

        assert!(runner.commands().is_empty());
        assert_eq!(report.files_written, 9);
        assert!(report.warmup_cache.is_none());
        let ws = tmp.path().join("workspace");
        assert!(ws.join("burn-server/src/lib.rs").exists());
        assert!(ws.join("notebooks/burn-example.ipynb").exists());
        assert!(ws.join("remote-client/src/main.rs").exists());
        assert!(tmp.path().join("home/.config/zellij/config.kdl").exists());
        assert!(tmp.path().join("home/.no_auto_tmux").exists());
    }

    #[tokio::test]
    async fn test_reprovision_preserves_user_edits_and_reuses_cache() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let mut options = options(tmp.path());
        options.workspace.warmup = false;

        Provisioner::new(options.clone(), ProvisionMode::WorkspaceOnly, runner.clone())
            .unwrap()
            .run()
            .await
            .unwrap();

        let lib = tmp.path().join("workspace/burn-server/src/lib.rs");
        std::fs::write(&lib, "// mine\n").unwrap();
        let cached = tmp.path().join("workspace/.cache/sccache/entry");
        std::fs::write(&cached, "artifact").unwrap();

        let report = Provisioner::new(options, ProvisionMode::WorkspaceOnly, runner)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(report.files_written, 0);
        assert_eq!(report.cache_dir, Some(CacheDirState::Reused));
        assert_eq!(report.files_preserved, vec![lib.clone()]);
        assert_eq!(std::fs::read_to_string(&lib).unwrap(), "// mine\n");
        assert_eq!(std::fs::read_to_string(&cached).unwrap(), "artifact");
    }

    #[tokio::test]
    async fn test_reprovision_keeps_service_state_set_by_user() {
        let tmp = TempDir::new().unwrap();
        let runner = Arc::new(RecordingRunner::default());
        let mut options = options(tmp.path());
        options.workspace.warmup = false;

        let first = Provisioner::new(options.clone(), ProvisionMode::WorkspaceOnly, runner.clone())
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_eq!(first.services["burn-server"], "disabled");
        assert_eq!(first.services["jupyter"], "enabled");

        let registry = ServiceRegistry::new(&options.system.supervisor_conf_dir);
        registry.enable("burn-server").unwrap();
        registry.disable("jupyter").unwrap();

        let second = Provisioner::new(options, ProvisionMode::WorkspaceOnly, runner)
            .unwrap()
            .run()
            .await
            .unwrap();

        assert_eq!(registry.state("burn-server").unwrap(), ServiceState::Enabled);
        assert_eq!(registry.state("jupyter").unwrap(), ServiceState::Disabled);
        assert_eq!(second.services["burn-server"], "enabled");
        assert_eq!(second.services["jupyter"], "disabled");
    }

    #[test]
    fn test_invalid_options_rejected_before_running() {
        let mut options = ProvisionOptions::default();
        options.workspace.root = "relative".into();
        assert!(
            Provisioner::new(options, ProvisionMode::Full, Arc::new(RecordingRunner::default()))
                .is_err()
        );
    }
}
