//! Task: declare supervisor units.
//!
//! Units are only written here. supervisord picks them up when the container
//! starts; nothing is reloaded during the image build. An existing unit keeps
//! its enabled or disabled name, so a later provision run does not undo
//! `burnbox service enable`.

use super::{ProvisionCtx, log_task_error, task_start};
use crate::pipeline::PipelineTask;
use crate::provision::types::ProvisionContext;
use crate::services::{ServiceRegistry, ServiceState, declared_units};
use async_trait::async_trait;
use burnbox_shared::errors::{BurnboxError, BurnboxResult};

pub struct ServiceUnitsTask;

#[async_trait]
impl PipelineTask<ProvisionCtx> for ServiceUnitsTask {
    async fn run(self: Box<Self>, ctx: ProvisionCtx) -> BurnboxResult<()> {
        let task_name = self.name();
        let root = task_start(&ctx, task_name).await;

        let mut ctx = ctx.lock().await;
        let states = install_units(&ctx).inspect_err(|e| log_task_error(&root, task_name, e))?;
        ctx.services = states;
        Ok(())
    }

    fn name(&self) -> &str {
        "service_units"
    }
}

fn install_units(ctx: &ProvisionContext) -> BurnboxResult<Vec<(String, ServiceState)>> {
    let log_dir = &ctx.system.supervisor_log_dir;
    std::fs::create_dir_all(log_dir).map_err(|e| {
        BurnboxError::Storage(format!(
            "Failed to create log directory {}: {}",
            log_dir.display(),
            e
        ))
    })?;

    let registry = ServiceRegistry::new(&ctx.system.supervisor_conf_dir);
    let mut states = Vec::new();
    for declared in declared_units(&ctx.options, &ctx.workspace, &ctx.system, &ctx.cache) {
        let state = registry.install(&declared.unit, declared.enabled)?;
        states.push((declared.unit.name.clone(), state));
    }
    Ok(states)
}
