//! Type definitions for the provisioning pipeline.

use crate::cache::{CacheConfig, CacheDirState, CacheStats};
use crate::layout::{SystemLayout, WorkspaceLayout};
use crate::materialize::MaterializeOutcome;
use crate::options::ProvisionOptions;
use crate::services::ServiceState;
use crate::session::HookOutcome;
use crate::util::{CommandRunner, CommandSpec};
use burnbox_shared::constants::cache;
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Counters around the warm-up build.
#[derive(Debug, Clone, Copy, Default)]
pub struct WarmupOutput {
    pub before: Option<CacheStats>,
    pub after: Option<CacheStats>,
}

impl WarmupOutput {
    /// Cache activity caused by the warm-up, when both snapshots exist.
    pub fn delta(&self) -> Option<CacheStats> {
        match (&self.before, &self.after) {
            (Some(before), Some(after)) => Some(after.since(before)),
            _ => None,
        }
    }
}

/// State shared by every provisioning task.
///
/// Tasks read what earlier tasks left behind (installed tools, environment)
/// and record their own outputs for the report.
pub struct ProvisionContext {
    pub options: ProvisionOptions,
    pub workspace: WorkspaceLayout,
    pub system: SystemLayout,
    pub cache: CacheConfig,
    pub runner: Arc<dyn CommandRunner>,

    /// Environment applied to every command issued after it was recorded.
    pub env: BTreeMap<String, String>,

    pub cache_tool_installed: bool,
    pub cache_routed: bool,
    pub cache_dir_state: Option<CacheDirState>,
    pub materialized: Option<MaterializeOutcome>,
    pub warmup: Option<WarmupOutput>,
    pub services: Vec<(String, ServiceState)>,
    pub hook: Option<HookOutcome>,
}

impl ProvisionContext {
    pub fn new(options: ProvisionOptions, runner: Arc<dyn CommandRunner>) -> BurnboxResult<Self> {
        let workspace = WorkspaceLayout::from_options(&options);
        let system = SystemLayout::from_options(&options);
        let cache = CacheConfig::new(workspace.cache_dir(), options.max_cache_size()?);

        // Tools installed by rustup and binstall land in ~/.cargo/bin, which
        // the calling process usually does not have on PATH yet.
        let cargo_bin = system.home_dir.join(".cargo/bin");
        let path = match std::env::var_os("PATH") {
            Some(existing) => {
                let mut dirs = vec![cargo_bin];
                dirs.extend(std::env::split_paths(&existing));
                std::env::join_paths(dirs)
                    .map_err(|e| BurnboxError::Config(format!("Invalid PATH: {}", e)))?
                    .to_string_lossy()
                    .into_owned()
            }
            None => cargo_bin.display().to_string(),
        };
        let env = BTreeMap::from([("PATH".to_string(), path)]);

        Ok(Self {
            options,
            workspace,
            system,
            cache,
            runner,
            env,
            cache_tool_installed: false,
            cache_routed: false,
            cache_dir_state: None,
            materialized: None,
            warmup: None,
            services: Vec::new(),
            hook: None,
        })
    }

    /// A command carrying the accumulated environment.
    pub fn command(&self, program: &str) -> CommandSpec {
        CommandSpec::new(program).envs(&self.env)
    }

    /// Shell pipeline carrying the accumulated environment.
    pub fn shell(&self, script: &str) -> CommandSpec {
        CommandSpec::shell(script).envs(&self.env)
    }

    /// Route every later compile through the cache tool.
    ///
    /// Fails if the cache tool has not been installed by an earlier task: a
    /// wrapper pointing at a missing binary breaks every build.
    pub fn route_through_cache(&mut self) -> BurnboxResult<()> {
        if !self.cache_tool_installed {
            return Err(BurnboxError::InvalidState(format!(
                "cannot route compiles through {} before it is installed",
                cache::TOOL
            )));
        }
        self.env.extend(self.cache.routing_env());
        self.cache_routed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::RecordingRunner;
    use burnbox_shared::constants::env;

    fn context() -> ProvisionContext {
        ProvisionContext::new(
            ProvisionOptions::default(),
            Arc::new(RecordingRunner::default()),
        )
        .unwrap()
    }

    #[test]
    fn test_routing_requires_installed_cache_tool() {
        let mut ctx = context();
        let err = ctx.route_through_cache().unwrap_err();
        assert!(matches!(err, BurnboxError::InvalidState(_)));
        assert!(!ctx.env.contains_key(env::RUSTC_WRAPPER));

        ctx.cache_tool_installed = true;
        ctx.route_through_cache().unwrap();
        assert_eq!(ctx.env[env::RUSTC_WRAPPER], "sccache");
        assert_eq!(ctx.env[env::CACHE_DIR], "/workspace/.cache/sccache");
    }

    #[test]
    fn test_commands_carry_cargo_bin_on_path() {
        let ctx = context();
        let spec = ctx.command("cargo");
        assert!(spec.env["PATH"].contains(".cargo/bin"));
    }

    #[test]
    fn test_warmup_delta_needs_both_snapshots() {
        let stats = CacheStats {
            compile_requests: 5,
            ..Default::default()
        };
        let partial = WarmupOutput {
            before: None,
            after: Some(stats),
        };
        assert!(partial.delta().is_none());

        let full = WarmupOutput {
            before: Some(CacheStats::default()),
            after: Some(stats),
        };
        assert_eq!(full.delta().unwrap().compile_requests, 5);
    }
}
