//! Generated workspace files.
//!
//! Templates are plain text with `@@name@@` placeholders; [`fill`] refuses to
//! return a file with an unresolved placeholder.

mod client;
mod containerfile;
mod notebook;
mod project;
mod readme;
mod script;
mod session;

pub use containerfile::render_containerfile;
pub use session::{ATTACH_MARKER, render_attach_hook, render_multiplexer_config, render_profile};

use crate::cache::CacheSize;
use crate::compute::Backend;
use crate::layout::{SystemLayout, WorkspaceLayout};
use crate::options::ProvisionOptions;
use burnbox_shared::constants::{env, ports, services};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::path::PathBuf;

/// Tensor library release the generated crates depend on.
pub const BURN_VERSION: &str = "0.17";

/// One file to write, relative paths already resolved against the layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedFile {
    pub path: PathBuf,
    pub contents: String,
    pub executable: bool,
}

impl GeneratedFile {
    fn new(path: PathBuf, contents: String) -> Self {
        Self {
            path,
            contents,
            executable: false,
        }
    }

    fn executable(path: PathBuf, contents: String) -> Self {
        Self {
            path,
            contents,
            executable: true,
        }
    }
}

/// Values substituted into every template.
#[derive(Debug, Clone)]
pub struct TemplateContext {
    pub workspace: WorkspaceLayout,
    pub system: SystemLayout,
    pub default_backend: Backend,
    pub default_port: u16,
    pub cache_size: CacheSize,
    pub base_image: String,
}

impl TemplateContext {
    pub fn from_options(options: &ProvisionOptions) -> BurnboxResult<Self> {
        Ok(Self {
            workspace: WorkspaceLayout::from_options(options),
            system: SystemLayout::from_options(options),
            default_backend: options.compute.default_backend,
            default_port: options.compute.port,
            cache_size: options.max_cache_size()?,
            base_image: options.base_image.clone(),
        })
    }

    /// Library name cargo derives from the package name.
    pub fn crate_ident(&self) -> String {
        self.workspace.project_name().replace('-', "_")
    }

    /// Placeholders common to all templates.
    fn vars(&self) -> Vec<(&'static str, String)> {
        let ws = &self.workspace;
        vec![
            ("project_name", ws.project_name().to_string()),
            ("crate_ident", self.crate_ident()),
            ("root", ws.root().display().to_string()),
            ("project_dir", ws.project_dir().display().to_string()),
            ("notebooks_dir", ws.notebooks_dir().display().to_string()),
            ("client_dir", ws.client_dir().display().to_string()),
            ("cache_dir", ws.cache_dir().display().to_string()),
            ("cache_size", self.cache_size.to_string()),
            ("default_backend", self.default_backend.feature().to_string()),
            ("alt_backend", self.default_backend.alternative().feature().to_string()),
            ("backend_type", self.default_backend.type_path().to_string()),
            ("default_port", self.default_port.to_string()),
            ("notebook_port", ports::NOTEBOOK.to_string()),
            ("port_var", env::SERVER_PORT.to_string()),
            ("cache_dir_var", env::CACHE_DIR.to_string()),
            ("cache_size_var", env::CACHE_SIZE.to_string()),
            ("wrapper_var", env::RUSTC_WRAPPER.to_string()),
            ("remote_url_var", env::REMOTE_BACKEND_URL.to_string()),
            ("compute_service", services::COMPUTE.to_string()),
            ("notebook_service", services::NOTEBOOK.to_string()),
            ("conf_dir", self.system.supervisor_conf_dir.display().to_string()),
            ("log_dir", self.system.supervisor_log_dir.display().to_string()),
            ("burn_version", BURN_VERSION.to_string()),
            ("base_image", self.base_image.clone()),
        ]
    }
}

/// Substitute `@@name@@` placeholders in one pass over the template.
///
/// Every placeholder must name a known variable. Substituted values are
/// copied verbatim, so a value may itself contain `@@`.
pub fn fill(template: &str, vars: &[(&str, String)]) -> BurnboxResult<String> {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;
    while let Some(start) = rest.find("@@") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let found = after.find("@@").and_then(|end| {
            let key = &after[..end];
            vars.iter()
                .find(|(name, _)| *name == key)
                .map(|(_, value)| (end, value))
        });
        let Some((end, value)) = found else {
            let snippet: String = rest[start..].chars().take(40).collect();
            return Err(BurnboxError::Template(format!(
                "unresolved placeholder near {:?}",
                snippet
            )));
        };
        out.push_str(value);
        rest = &after[end + 2..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Every file written into the workspace (and the user's multiplexer config),
/// in write order.
pub fn render_workspace(ctx: &TemplateContext) -> BurnboxResult<Vec<GeneratedFile>> {
    let vars = ctx.vars();
    let ws = &ctx.workspace;

    Ok(vec![
        GeneratedFile::new(ws.project_manifest(), fill(project::MANIFEST, &vars)?),
        GeneratedFile::new(ws.project_src_dir().join("main.rs"), fill(project::MAIN_RS, &vars)?),
        GeneratedFile::new(ws.project_src_dir().join("lib.rs"), fill(project::LIB_RS, &vars)?),
        GeneratedFile::new(
            ws.client_dir().join("Cargo.toml"),
            fill(client::MANIFEST, &vars)?,
        ),
        GeneratedFile::new(
            ws.client_dir().join("src/main.rs"),
            fill(client::MAIN_RS, &vars)?,
        ),
        GeneratedFile::new(
            ws.notebooks_dir()
                .join(burnbox_shared::constants::paths::NOTEBOOK_FILE),
            notebook::render(ctx)?,
        ),
        GeneratedFile::executable(ws.start_script(), fill(script::START_SCRIPT, &vars)?),
        GeneratedFile::new(ws.readme(), fill(readme::README, &vars)?),
        GeneratedFile::new(
            ctx.system.multiplexer_config(),
            render_multiplexer_config(ctx)?,
        ),
    ])
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::path::Path;

    pub(crate) fn test_context(root: &Path) -> TemplateContext {
        let mut options = ProvisionOptions::default();
        options.workspace.root = root.join("workspace");
        options.system.home_dir = Some(root.join("home"));
        options.system.supervisor_conf_dir = root.join("conf.d");
        options.system.supervisor_log_dir = root.join("log");
        TemplateContext::from_options(&options).unwrap()
    }

    #[test]
    fn test_fill_replaces_all_placeholders() {
        let out = fill("a=@@a@@ b=@@b@@ a=@@a@@", &[("a", "1".into()), ("b", "2".into())]).unwrap();
        assert_eq!(out, "a=1 b=2 a=1");
    }

    #[test]
    fn test_fill_copies_values_containing_markers() {
        let vars = [("a", "x@@y@@".to_string()), ("y", "never".to_string())];
        assert_eq!(fill("[@@a@@]", &vars).unwrap(), "[x@@y@@]");
    }

    #[test]
    fn test_fill_rejects_unknown_placeholder() {
        let err = fill("x=@@missing@@", &[]).unwrap_err();
        assert!(matches!(err, BurnboxError::Template(_)));
    }

    #[test]
    fn test_render_workspace_resolves_everything() {
        let ctx = test_context(Path::new("/tmp/t"));
        let files = render_workspace(&ctx).unwrap();
        assert_eq!(files.len(), 9);
        for file in &files {
            assert!(!file.contents.contains("@@"), "{}", file.path.display());
        }
        let script = files.iter().find(|f| f.executable).unwrap();
        assert!(script.path.ends_with("start-burn-server.sh"));
    }

    #[test]
    fn test_crate_ident() {
        let ctx = test_context(Path::new("/tmp/t"));
        assert_eq!(ctx.crate_ident(), "burn_server");
    }
}
