//! Login-time files: multiplexer config, auto-attach hook, profile script.

use super::{TemplateContext, fill};
use burnbox_shared::constants::env;
use burnbox_shared::errors::BurnboxResult;
use std::collections::BTreeMap;

/// Marker around the auto-attach block in `~/.bashrc`.
pub const ATTACH_MARKER: &str = "burnbox multiplexer attach";

/// Session name every interactive login attaches to.
pub const SESSION_NAME: &str = "main";

const MULTIPLEXER_CONFIG: &str = r#"// Managed by burnbox.
default_shell "bash"
default_cwd "@@root@@"
default_layout "compact"
pane_frames false
simplified_ui true
copy_on_select true
mouse_mode true
scroll_buffer_size 50000
"#;

/// Attach only for interactive shells, outside a session, with the binary
/// present. Scripted or remote single-command shells never reach the attach.
const ATTACH_HOOK: &str = r#"if [ -z "${@@session_var@@:-}" ] && command -v zellij >/dev/null 2>&1; then
    case "$-" in
        *i*) zellij attach --create @@session_name@@ ;;
    esac
fi"#;

pub fn render_multiplexer_config(ctx: &TemplateContext) -> BurnboxResult<String> {
    fill(MULTIPLEXER_CONFIG, &ctx.vars())
}

pub fn render_attach_hook() -> BurnboxResult<String> {
    fill(
        ATTACH_HOOK,
        &[
            ("session_var", env::MULTIPLEXER_SESSION.to_string()),
            ("session_name", SESSION_NAME.to_string()),
        ],
    )
}

/// `export` lines for every login shell.
pub fn render_profile(vars: &BTreeMap<String, String>) -> String {
    let mut out = String::from("# Managed by burnbox.\nexport PATH=\"$HOME/.cargo/bin:$PATH\"\n");
    for (key, value) in vars {
        out.push_str(&format!("export {}=\"{}\"\n", key, value));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::process::Command;
    use tempfile::TempDir;

    /// Run the hook in `sh` with a fake `zellij` that records its arguments.
    fn run_hook(interactive: bool, in_session: bool) -> Option<String> {
        let tmp = TempDir::new().unwrap();
        let bin = tmp.path().join("bin");
        let seen = tmp.path().join("attached");
        crate::util::write_executable(
            &bin.join("zellij"),
            &format!("#!/bin/sh\necho \"$*\" >> '{}'\n", seen.display()),
        )
        .unwrap();

        let hook = tmp.path().join("hook.sh");
        std::fs::write(&hook, render_attach_hook().unwrap()).unwrap();

        let path = format!("{}:{}", bin.display(), std::env::var("PATH").unwrap_or_default());
        let mut cmd = Command::new("sh");
        if interactive {
            cmd.arg("-i");
        }
        cmd.arg(&hook).env("PATH", path).env_remove("ZELLIJ");
        if in_session {
            cmd.env("ZELLIJ", "0");
        }
        cmd.stdin(std::process::Stdio::null());
        let status = cmd.status().unwrap();
        assert!(status.success());

        std::fs::read_to_string(seen).ok()
    }

    #[test]
    fn test_non_interactive_shell_never_attaches() {
        assert_eq!(run_hook(false, false), None);
    }

    #[test]
    fn test_interactive_shell_attaches_once() {
        let attached = run_hook(true, false).unwrap();
        assert_eq!(attached.lines().collect::<Vec<_>>(), vec!["attach --create main"]);
    }

    #[test]
    fn test_existing_session_is_not_nested() {
        assert_eq!(run_hook(true, true), None);
    }

    #[test]
    fn test_profile_exports_sorted_vars() {
        let vars = BTreeMap::from([
            ("SCCACHE_DIR".to_string(), "/c".to_string()),
            ("RUSTC_WRAPPER".to_string(), "sccache".to_string()),
        ]);
        let profile = render_profile(&vars);
        assert!(profile.ends_with(
            "export RUSTC_WRAPPER=\"sccache\"\nexport SCCACHE_DIR=\"/c\"\n"
        ));
    }
}
