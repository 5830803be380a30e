//! supervisorctl operations and log tailing.

use crate::util::{CommandRunner, CommandSpec};
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::path::Path;
use std::sync::Arc;

const SUPERVISORCTL: &str = "supervisorctl";

pub struct Supervisor {
    runner: Arc<dyn CommandRunner>,
}

impl Supervisor {
    pub fn new(runner: Arc<dyn CommandRunner>) -> Self {
        Self { runner }
    }

    async fn ctl(&self, spec: CommandSpec) -> BurnboxResult<String> {
        Ok(self.runner.run(&spec.capture()).await?.stdout)
    }

    /// `supervisorctl status [name]`.
    ///
    /// supervisorctl exits 3 when a program is not running; that is still a
    /// status answer.
    pub async fn status(&self, name: Option<&str>) -> BurnboxResult<String> {
        let spec = CommandSpec::new(SUPERVISORCTL)
            .arg("status")
            .args(name)
            .ok_code(3);
        self.ctl(spec).await
    }

    pub async fn restart(&self, name: &str) -> BurnboxResult<String> {
        self.ctl(CommandSpec::new(SUPERVISORCTL).args(["restart", name]))
            .await
    }

    /// Re-read unit files and apply added/removed programs.
    pub async fn reload(&self) -> BurnboxResult<()> {
        self.ctl(CommandSpec::new(SUPERVISORCTL).arg("reread"))
            .await?;
        self.ctl(CommandSpec::new(SUPERVISORCTL).arg("update"))
            .await?;
        tracing::info!("Supervisor configuration reloaded");
        Ok(())
    }
}

/// Last `lines` lines of a log file.
pub fn tail_log(path: &Path, lines: usize) -> BurnboxResult<String> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| BurnboxError::NotFound(format!("log file {}: {}", path.display(), e)))?;
    let all: Vec<&str> = text.lines().collect();
    let start = all.len().saturating_sub(lines);
    Ok(all[start..].join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::testing::RecordingRunner;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_reload_rereads_then_updates() {
        let runner = Arc::new(RecordingRunner::default());
        let supervisor = Supervisor::new(runner.clone());
        supervisor.reload().await.unwrap();
        assert_eq!(
            runner.commands(),
            vec!["supervisorctl reread", "supervisorctl update"]
        );
    }

    #[tokio::test]
    async fn test_status_and_restart_target_service() {
        let runner = Arc::new(RecordingRunner::default());
        let supervisor = Supervisor::new(runner.clone());
        supervisor.status(Some("jupyter")).await.unwrap();
        supervisor.status(None).await.unwrap();
        supervisor.restart("burn-server").await.unwrap();
        assert_eq!(
            runner.commands(),
            vec![
                "supervisorctl status jupyter",
                "supervisorctl status",
                "supervisorctl restart burn-server"
            ]
        );
    }

    #[tokio::test]
    async fn test_reload_failure_propagates() {
        let runner = Arc::new(RecordingRunner::failing_on("supervisorctl"));
        let supervisor = Supervisor::new(runner);
        assert!(supervisor.reload().await.is_err());
    }

    #[test]
    fn test_tail_log() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("x.log");
        std::fs::write(&path, "1\n2\n3\n4\n").unwrap();
        assert_eq!(tail_log(&path, 2).unwrap(), "3\n4");
        assert_eq!(tail_log(&path, 10).unwrap(), "1\n2\n3\n4");
        assert!(tail_log(&tmp.path().join("missing.log"), 1).is_err());
    }
}
