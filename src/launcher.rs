//! Command launching
//!
//! Builds the `go test -json` invocation and starts it with both output
//! streams piped.

use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use crate::config::CommandConfig;
use crate::runner::RunError;

/// A fully resolved command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
    pub current_dir: Option<PathBuf>,
}

impl CommandSpec {
    pub fn new(program: &str, args: &[&str]) -> Self {
        Self {
            program: program.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            current_dir: None,
        }
    }

    /// `<program> <base args> <user args>`, falling back to the default
    /// targets when the user passed nothing
    pub fn from_config(config: &CommandConfig, user_args: &[String]) -> Self {
        let mut args = config.args.clone();
        if user_args.is_empty() {
            args.extend(config.default_targets.iter().cloned());
        } else {
            args.extend(user_args.iter().cloned());
        }

        Self {
            program: config.program.clone(),
            args,
            current_dir: config.cwd.as_ref().map(PathBuf::from),
        }
    }

    pub fn display(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(|s| s.as_str()))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Start the command with stdout and stderr piped
    pub fn spawn(&self) -> Result<Launched, RunError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = self.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| RunError::Spawn {
            command: self.display(),
            source,
        })?;

        let stdout = child
            .stdout
            .take()
            .ok_or(RunError::MissingPipe { stream: "stdout" })?;
        let stderr = child
            .stderr
            .take()
            .ok_or(RunError::MissingPipe { stream: "stderr" })?;

        tracing::debug!(command = %self.display(), pid = ?child.id(), "spawned test command");

        Ok(Launched { child, stdout, stderr })
    }
}

/// A running command and its two output streams
#[derive(Debug)]
pub struct Launched {
    child: Child,
    pub stdout: ChildStdout,
    pub stderr: ChildStderr,
}

impl Launched {
    /// Split into the streams and a handle that can only be waited on
    pub fn into_parts(self) -> (ChildStdout, ChildStderr, Exit) {
        (self.stdout, self.stderr, Exit { child: self.child })
    }
}

/// Wait handle of a launched command
#[derive(Debug)]
pub struct Exit {
    child: Child,
}

impl Exit {
    /// Block until the command exits; `None` means it was killed by a signal
    pub async fn wait(mut self) -> Result<Option<i32>, RunError> {
        let status = self.child.wait().await.map_err(RunError::Wait)?;
        tracing::debug!(%status, "test command exited");
        Ok(status.code())
    }
}
