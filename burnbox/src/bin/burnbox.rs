//! The `burnbox` command.

use anyhow::{Context, Result};
use burnbox::cache::{CacheConfig, query_stats};
use burnbox::compute::{check_manifest, port_from_env};
use burnbox::logging::init_logging;
use burnbox::services::{ServiceManager, ServiceRegistry, declared_units, tail_log};
use burnbox::session::{AttachDecision, SessionProbe, install_login_hook};
use burnbox::templates::{TemplateContext, render_containerfile};
use burnbox::util::{CommandRunner, DryRunRunner, SystemRunner, write_file};
use burnbox::{
    ConfigSource, ProvisionMode, ProvisionOptions, Provisioner, SystemLayout, WorkspaceLayout,
};
use burnbox_shared::constants::paths;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(
    name = "burnbox",
    about = "Provision and operate a GPU tensor-compute development image",
    version
)]
struct Cli {
    /// Path to burnbox.toml (defaults to $BURNBOX_CONFIG, then built-in defaults)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the provisioning pipeline
    Provision {
        /// Log external commands instead of running them
        #[arg(long)]
        dry_run: bool,

        /// Skip the cache-warming release build
        #[arg(long)]
        skip_warmup: bool,

        /// Only write the workspace, service units and login hook
        #[arg(long)]
        workspace_only: bool,

        /// Overwrite generated files even if they were edited
        #[arg(long)]
        force: bool,
    },

    /// Print the stages and tasks a provision run would execute
    Plan {
        #[arg(long)]
        workspace_only: bool,
    },

    /// Render the Containerfile that provisions the image
    Containerfile {
        /// Write to a file, with the rendered burnbox.toml beside it, instead
        /// of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Manage the supervisor units
    Service {
        #[command(subcommand)]
        command: ServiceCommands,
    },

    /// Inspect the shared build cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Compute server preflight
    Compute {
        #[command(subcommand)]
        command: ComputeCommands,
    },

    /// Multiplexer session integration
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
enum ServiceCommands {
    /// Show declared units and whether they are enabled
    List,
    /// supervisorctl status
    Status { name: Option<String> },
    /// Enable a unit and reload the supervisor
    Enable { name: String },
    /// Disable a unit and reload the supervisor
    Disable { name: String },
    /// Restart a running unit
    Restart { name: String },
    /// Re-read unit files and apply changes
    Reload,
    /// Tail a service's log
    Logs {
        name: String,
        /// Show the stderr log instead of stdout
        #[arg(long)]
        stderr: bool,
        #[arg(short = 'n', long, default_value_t = 50)]
        lines: usize,
    },
}

#[derive(Subcommand)]
enum CacheCommands {
    /// Compile requests, hits and misses
    Stats,
    /// Bytes stored against the configured maximum
    Usage,
}

#[derive(Subcommand)]
enum ComputeCommands {
    /// Resolve the port and the default backend the way the server will
    Check {
        /// Manifest to inspect (defaults to the generated project)
        #[arg(long)]
        manifest: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum SessionCommands {
    /// Exit 0 if this login should attach to the multiplexer
    Probe,
    /// Install the login hook into ~/.bashrc
    Install,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let source = ConfigSource::discover(cli.config.as_deref());
    let mut options = source.load().context("failed to load configuration")?;
    init_logging(options.system.log_dir.as_deref())?;
    source.log();

    match cli.command {
        Commands::Provision {
            dry_run,
            skip_warmup,
            workspace_only,
            force,
        } => {
            options.workspace.warmup &= !skip_warmup;
            options.workspace.force |= force;
            let runner: Arc<dyn CommandRunner> = if dry_run {
                Arc::new(DryRunRunner)
            } else {
                Arc::new(SystemRunner)
            };
            let report = Provisioner::new(options, mode(workspace_only), runner)?
                .run()
                .await?;
            for path in &report.files_preserved {
                println!("kept local edits: {}", path.display());
            }
        }

        Commands::Plan { workspace_only } => {
            let plan = Provisioner::new(options, mode(workspace_only), Arc::new(DryRunRunner))?
                .plan();
            for (index, (stage, tasks)) in plan.describe().into_iter().enumerate() {
                println!("{}. {:<10} {}", index + 1, stage, tasks.join(", "));
            }
        }

        Commands::Containerfile { output } => {
            let templates = TemplateContext::from_options(&options)?;
            match output {
                Some(path) => {
                    let config = path.with_file_name(paths::CONFIG_FILE);
                    write_file(&path, &render_containerfile(&templates, true)?)?;
                    write_file(&config, &options.to_toml()?)?;
                    println!("wrote {} and {}", path.display(), config.display());
                }
                None => {
                    if options != ProvisionOptions::default() {
                        tracing::warn!(
                            "Options differ from defaults but are not baked into the image; \
                             use --output to write {} as well",
                            paths::CONFIG_FILE
                        );
                    }
                    print!("{}", render_containerfile(&templates, false)?);
                }
            }
        }

        Commands::Service { command } => service(&options, command).await?,
        Commands::Cache { command } => cache(&options, command).await?,

        Commands::Compute {
            command: ComputeCommands::Check { manifest },
        } => {
            let manifest = manifest
                .unwrap_or_else(|| WorkspaceLayout::from_options(&options).project_manifest());
            let port = port_from_env()?;
            let check = check_manifest(&manifest)
                .with_context(|| format!("checking {}", manifest.display()))?;
            println!("package:  {}", check.package);
            println!("backend:  {}", check.backend);
            println!("features: {}", check.default_features.join(", "));
            println!("port:     {}", port);
        }

        Commands::Session { command } => match command {
            SessionCommands::Probe => {
                let decision = SessionProbe::detect().decide();
                println!("{:?}", decision);
                if decision != AttachDecision::Attach {
                    std::process::exit(1);
                }
            }
            SessionCommands::Install => {
                let outcome = install_login_hook(&SystemLayout::from_options(&options))?;
                println!(
                    "login hook {}",
                    if outcome.hook_changed { "installed" } else { "already present" }
                );
            }
        },
    }

    Ok(())
}

fn mode(workspace_only: bool) -> ProvisionMode {
    if workspace_only {
        ProvisionMode::WorkspaceOnly
    } else {
        ProvisionMode::Full
    }
}

async fn service(options: &ProvisionOptions, command: ServiceCommands) -> Result<()> {
    let system = SystemLayout::from_options(options);
    let manager = ServiceManager::new(
        ServiceRegistry::new(&system.supervisor_conf_dir),
        Arc::new(SystemRunner),
    );

    match command {
        ServiceCommands::List => {
            let workspace = WorkspaceLayout::from_options(options);
            let cache = CacheConfig::new(workspace.cache_dir(), options.max_cache_size()?);
            for declared in declared_units(options, &workspace, &system, &cache) {
                let state = manager.registry.state(&declared.unit.name)?;
                println!("{:<12} {}", declared.unit.name, state);
            }
        }
        ServiceCommands::Status { name } => {
            print!("{}", manager.supervisor.status(name.as_deref()).await?);
        }
        ServiceCommands::Enable { name } => {
            let changed = manager.enable(&name).await?;
            println!("{} {}", name, if changed { "enabled" } else { "already enabled" });
        }
        ServiceCommands::Disable { name } => {
            let changed = manager.disable(&name).await?;
            println!("{} {}", name, if changed { "disabled" } else { "already disabled" });
        }
        ServiceCommands::Restart { name } => {
            print!("{}", manager.supervisor.restart(&name).await?);
        }
        ServiceCommands::Reload => manager.supervisor.reload().await?,
        ServiceCommands::Logs {
            name,
            stderr,
            lines,
        } => {
            let path = if stderr {
                system.stderr_log(&name)
            } else {
                system.stdout_log(&name)
            };
            println!("{}", tail_log(&path, lines)?);
        }
    }
    Ok(())
}

async fn cache(options: &ProvisionOptions, command: CacheCommands) -> Result<()> {
    let workspace = WorkspaceLayout::from_options(options);
    let config = CacheConfig::new(workspace.cache_dir(), options.max_cache_size()?);

    match command {
        CacheCommands::Stats => {
            let stats = query_stats(&SystemRunner, &config.env()).await?;
            println!("compile requests: {}", stats.compile_requests);
            println!("cache hits:       {}", stats.cache_hits);
            println!("cache misses:     {}", stats.cache_misses);
            if let Some(rate) = stats.hit_rate() {
                println!("hit rate:         {:.1}%", rate * 100.0);
            }
        }
        CacheCommands::Usage => {
            let used = config.disk_usage()?;
            let max = config.max_size.bytes();
            println!(
                "{}: {} / {} bytes ({:.1}%)",
                config.dir.display(),
                used,
                max,
                used as f64 * 100.0 / max.max(1) as f64
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_every_service_subcommand_has_help() {
        let cli = Cli::command();
        let service = cli.find_subcommand("service").unwrap();
        for sub in service.get_subcommands() {
            assert!(sub.get_about().is_some(), "{}", sub.get_name());
        }
    }
}
