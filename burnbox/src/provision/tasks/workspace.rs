//! Tasks: write the workspace, then warm the build cache.

use super::{ProvisionCtx, log_task_error, task_start};
use crate::cache::{CacheDirState, query_stats};
use crate::materialize::{MaterializeOutcome, materialize};
use crate::pipeline::PipelineTask;
use crate::provision::types::{ProvisionContext, WarmupOutput};
use crate::templates::{TemplateContext, render_workspace};
use async_trait::async_trait;
use burnbox_shared::constants::cache;
use burnbox_shared::errors::BurnboxResult;

pub struct MaterializeTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for MaterializeTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let (dir_state, outcome) =
            write_workspace(&ctx).inspect_err(|e| log_task_error(&root, task_name, e))?;

        tracing::info!(
            written = outcome.written.len(),
            unchanged = outcome.unchanged.len(),
            preserved = outcome.preserved.len(),
            "Workspace materialized"
        );
        if ctx.cache_dir_state.is_none() {
            ctx.cache_dir_state = Some(dir_state);
        }
        ctx.materialized = Some(outcome);
        Ok(())
    }

    fn name(&self) -> &str {
        "materialize"
    }
}

/// Create the layout, then render and write every generated file.
fn write_workspace(ctx: &ProvisionContext) -> BurnboxResult<(CacheDirState, MaterializeOutcome)> {
    ctx.workspace.prepare()?;
    let dir_state = ctx.cache.prepare()?;
    let templates = TemplateContext::from_options(&ctx.options)?;
    let files = render_workspace(&templates)?;
    let outcome = materialize(
        &files,
        &ctx.workspace.ledger_path(),
        ctx.options.workspace.force,
    )?;
    Ok((dir_state, outcome))
}

/// One release build of the generated project so the first real build (and
/// the compute service's first start) hits a warm cache.
pub struct WarmupTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for WarmupTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let (runner, build, cache_env) = {
            let ctx = ctx.lock().await;
            let mut build = ctx
                .command("cargo")
                .args(["build", "--release"])
                .current_dir(ctx.workspace.project_dir());
            let routed = if ctx.cache_routed {
                true
            } else if ctx.runner.has_program(cache::TOOL) {
                build = build.envs(&ctx.cache.routing_env());
                true
            } else {
                tracing::warn!("{} not found; warm-up build runs uncached", cache::TOOL);
                false
            };
            let cache_env = routed.then(|| ctx.cache.env());
            (ctx.runner.clone(), build, cache_env)
        };

        let mut output = WarmupOutput::default();
        if let Some(vars) = &cache_env {
            output.before = query_stats(runner.as_ref(), vars)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Could not read cache stats"))
                .ok();
        }

        runner
            .run(&build)
            .await
            .inspect_err(|e| log_task_error(&root, task_name, e))?;

        if let Some(vars) = &cache_env {
            output.after = query_stats(runner.as_ref(), vars)
                .await
                .inspect_err(|e| tracing::warn!(error = %e, "Could not read cache stats"))
                .ok();
        }

        if let Some(delta) = output.delta() {
            tracing::info!(
                compile_requests = delta.compile_requests,
                hits = delta.cache_hits,
                misses = delta.cache_misses,
                hit_rate = ?delta.hit_rate(),
                "Warm-up build populated the cache"
            );
        }

        ctx.lock().await.warmup = Some(output);
        Ok(())
    }

    fn name(&self) -> &str {
        "warmup_build"
    }
}
