//! Long-running services under supervisord.
//!
//! Provides:
//! - `ServiceUnit` - one program descriptor, rendered as INI
//! - `ServiceRegistry` - unit files on disk, enabled/disabled by file name
//! - `Supervisor` - status / restart / reload through supervisorctl
//! - `declared_units` - the compute and notebook units for an environment

mod registry;
mod supervisor;
mod unit;

pub use registry::{ServiceRegistry, ServiceState};
pub use supervisor::{Supervisor, tail_log};
pub use unit::ServiceUnit;

use crate::cache::CacheConfig;
use crate::layout::{SystemLayout, WorkspaceLayout};
use crate::options::ProvisionOptions;
use crate::util::CommandRunner;
use burnbox_shared::constants::{env, ports, services};
use burnbox_shared::errors::BurnboxResult;
use std::sync::Arc;

/// A unit together with the state it ships in.
#[derive(Debug, Clone)]
pub struct DeclaredUnit {
    pub unit: ServiceUnit,
    pub enabled: bool,
}

/// Compute server and notebook server units.
///
/// Both carry the cache routing variables so every compile they trigger
/// (server rebuilds, notebook cells) shares one cache.
pub fn declared_units(
    options: &ProvisionOptions,
    workspace: &WorkspaceLayout,
    system: &SystemLayout,
    cache: &CacheConfig,
) -> Vec<DeclaredUnit> {
    let mut compute_env = cache.routing_env();
    compute_env.insert(env::SERVER_PORT.to_string(), options.compute.port.to_string());

    let compute = ServiceUnit {
        name: services::COMPUTE.to_string(),
        command: "cargo run --release".to_string(),
        directory: workspace.project_dir(),
        autostart: true,
        autorestart: options.compute.autorestart,
        stdout_logfile: system.stdout_log(services::COMPUTE),
        stderr_logfile: system.stderr_log(services::COMPUTE),
        environment: compute_env,
    };

    let notebook = ServiceUnit {
        name: services::NOTEBOOK.to_string(),
        command: format!(
            "jupyter lab --ip=0.0.0.0 --port={} --no-browser --allow-root \
             --ServerApp.token='' --ServerApp.password=''",
            ports::NOTEBOOK
        ),
        directory: workspace.notebooks_dir(),
        autostart: true,
        autorestart: options.notebook.autorestart,
        stdout_logfile: system.stdout_log(services::NOTEBOOK),
        stderr_logfile: system.stderr_log(services::NOTEBOOK),
        environment: cache.routing_env(),
    };

    vec![
        DeclaredUnit {
            unit: compute,
            enabled: options.compute.autostart,
        },
        DeclaredUnit {
            unit: notebook,
            enabled: options.notebook.autostart,
        },
    ]
}

/// Enable/disable with an immediate supervisor reload.
pub struct ServiceManager {
    pub registry: ServiceRegistry,
    pub supervisor: Supervisor,
}

impl ServiceManager {
    pub fn new(registry: ServiceRegistry, runner: Arc<dyn CommandRunner>) -> Self {
        Self {
            registry,
            supervisor: Supervisor::new(runner),
        }
    }

    /// Rename the unit into its enabled form and reload the supervisor.
    pub async fn enable(&self, name: &str) -> BurnboxResult<bool> {
        let changed = self.registry.enable(name)?;
        if changed {
            self.supervisor.reload().await?;
        }
        Ok(changed)
    }

    /// Rename the unit into its disabled form and reload the supervisor,
    /// which stops and forgets the program.
    pub async fn disable(&self, name: &str) -> BurnboxResult<bool> {
        let changed = self.registry.disable(name)?;
        if changed {
            self.supervisor.reload().await?;
        }
        Ok(changed)
    }
}
