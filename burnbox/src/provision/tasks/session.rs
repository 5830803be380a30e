//! Task: login-shell multiplexer hook.

use super::{ProvisionCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use crate::session::install_login_hook;
use async_trait::async_trait;
use burnbox_shared::errors::BurnboxResult;

pub struct SessionHookTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for SessionHookTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let outcome =
            install_login_hook(&ctx.system).inspect_err(|e| log_task_error(&root, task_name, e))?;
        ctx.hook = Some(outcome);
        Ok(())
    }

    fn name(&self) -> &str {
        "session_hook"
    }
}
