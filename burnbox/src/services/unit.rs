//! Supervisor program descriptor.

use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::collections::BTreeMap;
use std::fmt::Write;
use std::path::PathBuf;

/// One `[program:<name>]` section for supervisord.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUnit {
    pub name: String,
    pub command: String,
    pub directory: PathBuf,
    pub autostart: bool,
    pub autorestart: bool,
    pub stdout_logfile: PathBuf,
    pub stderr_logfile: PathBuf,
    pub environment: BTreeMap<String, String>,
}

impl ServiceUnit {
    /// Render as supervisord INI.
    pub fn render(&self) -> BurnboxResult<String> {
        if self.name.is_empty() || self.name.contains(|c: char| c.is_whitespace() || c == ':') {
            return Err(BurnboxError::Service(format!(
                "invalid service name: {:?}",
                self.name
            )));
        }

        let mut out = String::new();
        let _ = writeln!(out, "[program:{}]", self.name);
        let _ = writeln!(out, "command={}", self.command);
        let _ = writeln!(out, "directory={}", self.directory.display());
        let _ = writeln!(out, "autostart={}", self.autostart);
        let _ = writeln!(out, "autorestart={}", self.autorestart);
        let _ = writeln!(out, "stdout_logfile={}", self.stdout_logfile.display());
        let _ = writeln!(out, "stderr_logfile={}", self.stderr_logfile.display());
        if !self.environment.is_empty() {
            let pairs: Vec<String> = self
                .environment
                .iter()
                .map(|(k, v)| format!("{}=\"{}\"", k, escape_env_value(v)))
                .collect();
            let _ = writeln!(out, "environment={}", pairs.join(","));
        }
        Ok(out)
    }
}

/// Quote-escape a value for `environment=`. supervisord expands `%(name)s`
/// there, so a literal `%` is written as `%%`.
fn escape_env_value(value: &str) -> String {
    value.replace('%', "%%").replace('"', "\\\"")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> ServiceUnit {
        ServiceUnit {
            name: "burn-server".into(),
            command: "cargo run --release".into(),
            directory: PathBuf::from("/workspace/burn-server"),
            autostart: false,
            autorestart: true,
            stdout_logfile: PathBuf::from("/var/log/supervisor/burn-server.out.log"),
            stderr_logfile: PathBuf::from("/var/log/supervisor/burn-server.err.log"),
            environment: BTreeMap::from([
                ("BURN_SERVER_PORT".to_string(), "3000".to_string()),
                ("RUSTC_WRAPPER".to_string(), "sccache".to_string()),
            ]),
        }
    }

    #[test]
    fn test_render_ini() {
        let text = unit().render().unwrap();
        assert_eq!(
            text,
            "[program:burn-server]\n\
             command=cargo run --release\n\
             directory=/workspace/burn-server\n\
             autostart=false\n\
             autorestart=true\n\
             stdout_logfile=/var/log/supervisor/burn-server.out.log\n\
             stderr_logfile=/var/log/supervisor/burn-server.err.log\n\
             environment=BURN_SERVER_PORT=\"3000\",RUSTC_WRAPPER=\"sccache\"\n"
        );
    }

    #[test]
    fn test_render_escapes_percent_in_environment() {
        let mut u = unit();
        u.environment = BTreeMap::from([(
            "SCCACHE_DIR".to_string(),
            "/workspace/100%/cache".to_string(),
        )]);
        let text = u.render().unwrap();
        assert!(text.ends_with("environment=SCCACHE_DIR=\"/workspace/100%%/cache\"\n"));
    }

    #[test]
    fn test_render_rejects_bad_name() {
        let mut u = unit();
        u.name = "burn server".into();
        assert!(matches!(u.render(), Err(BurnboxError::Service(_))));
    }
}
