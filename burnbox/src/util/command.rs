//! External command execution.
//!
//! Every package manager, toolchain and supervisor invocation goes through a
//! [`CommandRunner`], so provisioning can run for real, as a dry run, or
//! against a recording runner in tests.

use async_trait::async_trait;
use burnbox_shared::errors::{BurnboxError, BurnboxResult};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};

/// Lines of output kept for the error message of a failed command.
const ERROR_TAIL_LINES: usize = 20;

/// A fully described command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
    /// Non-zero exit codes that still count as success.
    pub extra_ok_codes: Vec<i32>,
    /// Collect stdout/stderr into [`CommandOutput`] instead of streaming
    /// them line by line into the log.
    pub capture: bool,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            env: BTreeMap::new(),
            cwd: None,
            extra_ok_codes: Vec::new(),
            capture: false,
        }
    }

    /// Run `script` through `sh -c`, for pipelines such as `curl | sh`.
    pub fn shell(script: impl Into<String>) -> Self {
        Self::new("sh").arg("-c").arg(script)
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn envs(mut self, vars: &BTreeMap<String, String>) -> Self {
        self.env
            .extend(vars.iter().map(|(k, v)| (k.clone(), v.clone())));
        self
    }

    pub fn current_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.cwd = Some(dir.as_ref().to_path_buf());
        self
    }

    pub fn ok_code(mut self, code: i32) -> Self {
        self.extra_ok_codes.push(code);
        self
    }

    /// For commands whose stdout is parsed.
    pub fn capture(mut self) -> Self {
        self.capture = true;
        self
    }

    /// Whether a process exiting with `code` succeeded.
    pub fn accepts(&self, code: Option<i32>) -> bool {
        matches!(code, Some(c) if c == 0 || self.extra_ok_codes.contains(&c))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            if arg.contains(char::is_whitespace) {
                write!(f, " '{}'", arg)?;
            } else {
                write!(f, " {}", arg)?;
            }
        }
        Ok(())
    }
}

/// Result of a finished command. `stdout` and `stderr` are empty unless the
/// spec asked for capture.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }
}

/// Runs external commands.
///
/// Implementations return `Err(BurnboxError::Command)` when the process exits
/// non-zero, so callers can propagate with `?` and treat every failure as
/// fatal.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, spec: &CommandSpec) -> BurnboxResult<CommandOutput>;

    /// Whether `program` can be found on `PATH`.
    fn has_program(&self, program: &str) -> bool {
        find_in_path(program).is_some()
    }
}

/// Executes commands on the host with `tokio::process`.
#[derive(Debug, Default, Clone)]
pub struct SystemRunner;

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, spec: &CommandSpec) -> BurnboxResult<CommandOutput> {
        tracing::debug!(command = %spec, cwd = ?spec.cwd, capture = spec.capture, "Running command");

        let mut cmd = tokio::process::Command::new(&spec.program);
        cmd.args(&spec.args)
            .envs(&spec.env)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &spec.cwd {
            cmd.current_dir(cwd);
        }

        let spawn_error = |e: std::io::Error| {
            let err_msg = format!("failed to spawn: {}", e);
            tracing::error!(command = %spec, "{}", err_msg);
            BurnboxError::command(&spec.program, None, err_msg)
        };

        let (result, tail) = if spec.capture {
            let output = cmd.output().await.map_err(spawn_error)?;
            let result = CommandOutput {
                code: output.status.code(),
                stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            };
            let tail = last_lines(&result.stderr, ERROR_TAIL_LINES);
            (result, tail)
        } else {
            let mut child = cmd.spawn().map_err(spawn_error)?;
            let stdout = child.stdout.take();
            let stderr = child.stderr.take();
            let (status, stdout_tail, stderr_tail) = tokio::join!(
                child.wait(),
                forward_lines(stdout, &spec.program, "stdout"),
                forward_lines(stderr, &spec.program, "stderr"),
            );
            let status = status.map_err(|e| {
                BurnboxError::command(&spec.program, None, format!("failed to wait: {}", e))
            })?;
            // Some tools (apt among them) report errors on stdout.
            let tail = if stderr_tail.is_empty() { stdout_tail } else { stderr_tail };
            let result = CommandOutput {
                code: status.code(),
                ..Default::default()
            };
            (result, Vec::from(tail).join("\n"))
        };

        if !spec.accepts(result.code) {
            tracing::error!(command = %spec, code = ?result.code, output = %tail, "Command failed");
            return Err(BurnboxError::command(&spec.program, result.code, tail));
        }

        Ok(result)
    }
}

/// Log each line of a child's output stream as it arrives, keeping the last
/// few for error reporting. Reads until EOF so the child never blocks on a
/// full pipe.
async fn forward_lines<R>(reader: Option<R>, program: &str, stream: &str) -> VecDeque<String>
where
    R: AsyncRead + Unpin,
{
    let mut tail = VecDeque::with_capacity(ERROR_TAIL_LINES);
    let Some(reader) = reader else {
        return tail;
    };

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                tracing::info!(program, stream, "{}", line);
                if tail.len() == ERROR_TAIL_LINES {
                    tail.pop_front();
                }
                tail.push_back(line);
            }
            Err(e) => {
                tracing::warn!(program, stream, error = %e, "Stopped reading command output");
                break;
            }
        }
    }
    tail
}

/// Logs every command and reports success without executing anything.
#[derive(Debug, Default, Clone)]
pub struct DryRunRunner;

#[async_trait]
impl CommandRunner for DryRunRunner {
    async fn run(&self, spec: &CommandSpec) -> BurnboxResult<CommandOutput> {
        tracing::info!(command = %spec, cwd = ?spec.cwd, "[dry-run] would run");
        Ok(CommandOutput::success(""))
    }

    fn has_program(&self, _program: &str) -> bool {
        true
    }
}

/// Locate an executable on `PATH`.
pub fn find_in_path(program: &str) -> Option<PathBuf> {
    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(program))
        .find(|candidate| is_executable(candidate))
}

fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;

    path.metadata()
        .map(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].join("\n")
}
