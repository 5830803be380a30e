//! Provisioning tasks.
//!
//! Each task pulls what it needs out of the shared context, releases the
//! lock while external commands run, and writes its output back.

mod base;
mod services;
mod session;
mod toolchain;
mod workspace;

pub use base::{NotebookServerTask, SystemPackagesTask};
pub use services::ServiceUnitsTask;
pub use session::SessionHookTask;
pub use toolchain::{
    BinstallTask, CacheRoutingTask, CacheToolTask, KernelTask, MultiplexerTask, RustToolchainTask,
};
pub use workspace::{MaterializeTask, WarmupTask};

use super::types::ProvisionContext;
use crate::util::{CommandRunner, CommandSpec};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type ProvisionCtx = Arc<Mutex<ProvisionContext>>;

/// Log the task start and return the workspace root for log context.
pub(crate) async fn task_start(ctx: &ProvisionCtx, task_name: &str) -> String {
    let root = ctx.lock().await.workspace.root().display().to_string();
    tracing::info!(task = task_name, root = %root, "Task started");
    root
}

pub(crate) fn log_task_error(root: &str, task_name: &str, error: &BurnboxError) {
    tracing::error!(task = task_name, root = %root, error = %error, "Task failed");
}

/// Run `specs` in order, stopping at the first failure.
pub(crate) async fn run_all(
    runner: &Arc<dyn CommandRunner>,
    specs: Vec<CommandSpec>,
) -> BurnboxResult<()> {
    for spec in specs {
        runner.run(&spec).await?;
    }
    Ok(())
}

/// `cargo binstall -y <crate>`.
pub(crate) fn binstall(ctx: &ProvisionContext, krate: &str) -> CommandSpec {
    ctx.command("cargo").args(["binstall", "-y", krate])
}
