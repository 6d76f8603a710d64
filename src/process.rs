//! Process runner
//!
//! Spawns the executable under test once, waits for it, and captures the
//! exit code and both output streams. There is no timeout and no retry.

use std::borrow::Cow;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::process::Command;

use crate::common::{display_command, Error, Result};

/// An executable plus its argument vector
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Shell-like rendering for logs and reports
    pub fn display(&self) -> String {
        display_command(&self.program, &self.args)
    }
}

/// Observed result of one invocation
#[derive(Debug, Clone)]
pub struct ProcessResult {
    /// Exit code, `None` when the process was terminated by a signal
    pub exit_code: Option<i32>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
}

impl ProcessResult {
    /// Whether the process exited with code 0
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn stdout_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stdout)
    }

    pub fn stderr_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.stderr)
    }

    /// Exit code for messages
    pub fn describe_exit(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "termination by signal".to_string(),
        }
    }
}

/// Run an invocation to completion
///
/// With `must_succeed`, a non-zero exit is returned as
/// [`Error::RequiredSuccess`]. Without it, every exit code is a valid
/// observation. Failing to start the process at all is always an error.
pub async fn run(invocation: &Invocation, must_succeed: bool) -> Result<ProcessResult> {
    tracing::debug!(command = %invocation.display(), must_succeed, "Spawning");

    let output = Command::new(&invocation.program)
        .args(&invocation.args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await
        .map_err(|e| match e.kind() {
            io::ErrorKind::NotFound | io::ErrorKind::PermissionDenied => {
                Error::ExecutableNotFound {
                    path: invocation.program.clone(),
                    reason: e.to_string(),
                }
            }
            _ => Error::Spawn {
                path: invocation.program.clone(),
                source: e,
            },
        })?;

    let result = ProcessResult {
        exit_code: output.status.code(),
        stdout: output.stdout,
        stderr: output.stderr,
    };

    tracing::debug!(
        command = %invocation.display(),
        exit = %result.describe_exit(),
        stdout_bytes = result.stdout.len(),
        stderr_bytes = result.stderr.len(),
        "Process finished"
    );

    if must_succeed && !result.success() {
        return Err(Error::RequiredSuccess {
            command: invocation.display(),
            code: result.describe_exit(),
            stderr: result.stderr_text().trim().to_string(),
        });
    }

    Ok(result)
}
