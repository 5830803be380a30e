//! Tasks: Rust toolchain, prebuilt tools, cache routing, notebook kernel.
//!
//! Order matters: binstall needs cargo, the cache tool needs binstall, and
//! routing needs the cache tool.

use super::{ProvisionCtx, binstall, log_task_error, run_all, task_start};
use crate::pipeline::PipelineTask;
use crate::templates::render_profile;
use crate::util::write_file;
use async_trait::async_trait;
use burnbox_shared::constants::cache;
use burnbox_shared::errors::BurnboxResult;

const RUSTUP_INSTALLER: &str = "https://sh.rustup.rs";
const BINSTALL_INSTALLER: &str =
    "https://raw.githubusercontent.com/cargo-bins/cargo-binstall/main/install-from-binstall-release.sh";

pub const MULTIPLEXER_CRATE: &str = "zellij";
pub const KERNEL_CRATE: &str = "evcxr_jupyter";

pub struct RustToolchainTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for RustToolchainTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, specs) = {
            let ctx = ctx.lock().await;
            let toolchain = &ctx.options.toolchain;
            let mut specs = vec![ctx.shell(&format!(
                "curl --proto '=https' --tlsv1.2 -sSf {} | sh -s -- -y --default-toolchain {} --profile {}",
                RUSTUP_INSTALLER, toolchain.channel, toolchain.profile
            ))];
            if !toolchain.components.is_empty() {
                specs.push(
                    ctx.command("rustup")
                        .args(["component", "add"])
                        .args(toolchain.components.iter().cloned()),
                );
            }
            (ctx.runner.clone(), specs)
        };

        run_all(&runner, specs)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))
    }

    fn name(&self) -> &str {
        "rust_toolchain"
    }
}

pub struct BinstallTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for BinstallTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, spec) = {
            let ctx = ctx.lock().await;
            let spec = ctx.shell(&format!(
                "curl -L --proto '=https' --tlsv1.2 -sSf {} | bash",
                BINSTALL_INSTALLER
            ));
            (ctx.runner.clone(), spec)
        };

        runner
            .run(&spec)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "cargo_binstall"
    }
}

/// Installs the prebuilt cache tool and prepares its shared directory.
pub struct CacheToolTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for CacheToolTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, spec, cache_config) = {
            let ctx = ctx.lock().await;
            (ctx.runner.clone(), binstall(&ctx, cache::TOOL), ctx.cache.clone())
        };

        runner
            .run(&spec)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))?;
        let state = cache_config
            .prepare()
            .inspect_err(|e| log_task_error(&root, task_name, e))?;

        let mut ctx = ctx.lock().await;
        ctx.cache_tool_installed = true;
        ctx.cache_dir_state = Some(state);
        Ok(())
    }

    fn name(&self) -> &str {
        "cache_tool"
    }
}

/// Sets `RUSTC_WRAPPER` for later commands and persists it for login shells.
pub struct CacheRoutingTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for CacheRoutingTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        ctx.route_through_cache()
            .inspect_err(|e| log_task_error(&root, task_name, e))?;

        let profile = render_profile(&ctx.cache.routing_env());
        write_file(&ctx.system.profile_script, &profile)
            .inspect_err(|e| log_task_error(&root, task_name, e))?;

        tracing::info!(
            profile = %ctx.system.profile_script.display(),
            "Compiles now routed through {}",
            cache::TOOL
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "cache_routing"
    }
}

pub struct MultiplexerTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for MultiplexerTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, spec) = {
            let ctx = ctx.lock().await;
            (ctx.runner.clone(), binstall(&ctx, MULTIPLEXER_CRATE))
        };

        runner
            .run(&spec)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "multiplexer"
    }
}

/// Installs the notebook kernel and registers it with the notebook server.
pub struct KernelTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for KernelTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, specs) = {
            let ctx = ctx.lock().await;
            let specs = vec![
                binstall(&ctx, KERNEL_CRATE),
                ctx.command(KERNEL_CRATE).arg("--install"),
            ];
            (ctx.runner.clone(), specs)
        };

        run_all(&runner, specs)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))
    }

    fn name(&self) -> &str {
        "notebook_kernel"
    }
}
