//! Interactive-login multiplexer attach.
//!
//! The shell hook in `~/.bashrc` and `burnbox session probe` make the same
//! decision: attach only when no session is active, the multiplexer binary is
//! installed, and the shell is interactive.

use crate::layout::SystemLayout;
use crate::templates::{ATTACH_MARKER, render_attach_hook};
use crate::util::{append_block, find_in_path, stdin_is_tty, write_file};
use burnbox_shared::constants::env;
use burnbox_shared::errors::BurnboxResult;

pub const MULTIPLEXER: &str = "zellij";

/// Observed login conditions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionProbe {
    pub in_session: bool,
    pub multiplexer_installed: bool,
    pub interactive: bool,
}

/// Why a login did or did not attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachDecision {
    Attach,
    AlreadyInSession,
    MultiplexerMissing,
    NonInteractive,
}

impl SessionProbe {
    /// Probe the current process.
    pub fn detect() -> Self {
        Self {
            in_session: std::env::var_os(env::MULTIPLEXER_SESSION).is_some(),
            multiplexer_installed: find_in_path(MULTIPLEXER).is_some(),
            interactive: stdin_is_tty(),
        }
    }

    pub fn decide(&self) -> AttachDecision {
        if !self.interactive {
            AttachDecision::NonInteractive
        } else if self.in_session {
            AttachDecision::AlreadyInSession
        } else if !self.multiplexer_installed {
            AttachDecision::MultiplexerMissing
        } else {
            AttachDecision::Attach
        }
    }
}

/// What [`install_login_hook`] changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HookOutcome {
    pub hook_changed: bool,
}

/// Disable the base image's tmux auto-attach and install ours.
///
/// Repeated runs leave a single hook block in `~/.bashrc`.
pub fn install_login_hook(system: &SystemLayout) -> BurnboxResult<HookOutcome> {
    let marker = system.no_auto_tmux();
    if !marker.exists() {
        write_file(&marker, "")?;
        tracing::debug!(path = %marker.display(), "Disabled base image tmux auto-attach");
    }

    let hook = render_attach_hook()?;
    let hook_changed = append_block(&system.bashrc(), ATTACH_MARKER, &hook)?;
    tracing::info!(
        bashrc = %system.bashrc().display(),
        changed = hook_changed,
        "Multiplexer attach hook installed"
    );

    Ok(HookOutcome { hook_changed })
}
