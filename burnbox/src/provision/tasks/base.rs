//! Task: OS packages and the notebook server.

use super::{ProvisionCtx, log_task_error, run_all, task_start};
use crate::pipeline::PipelineTask;
use async_trait::async_trait;
use burnbox_shared::errors::BurnboxResult;

pub struct SystemPackagesTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for SystemPackagesTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, specs) = {
            let ctx = ctx.lock().await;
            let packages = &ctx.options.toolchain.system_packages;
            if packages.is_empty() {
                tracing::debug!("No system packages configured");
                return Ok(());
            }
            let specs = vec![
                ctx.command("apt-get")
                    .arg("update")
                    .env("DEBIAN_FRONTEND", "noninteractive"),
                ctx.command("apt-get")
                    .args(["install", "-y", "--no-install-recommends"])
                    .args(packages.iter().cloned())
                    .env("DEBIAN_FRONTEND", "noninteractive"),
            ];
            (ctx.runner.clone(), specs)
        };

        run_all(&runner, specs)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))
    }

    fn name(&self) -> &str {
        "system_packages"
    }
}

pub struct NotebookServerTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for NotebookServerTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, spec) = {
            let ctx = ctx.lock().await;
            let packages = &ctx.options.toolchain.python_packages;
            if packages.is_empty() {
                return Ok(());
            }
            let spec = ctx
                .command("python3")
                .args(["-m", "pip", "install", "--no-cache-dir"])
                .args(packages.iter().cloned());
            (ctx.runner.clone(), spec)
        };

        runner
            .run(&spec)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))?;
        Ok(())
    }

    fn name(&self) -> &str {
        "notebook_server"
    }
}
