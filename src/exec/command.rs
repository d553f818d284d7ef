// src/exec/command.rs

//! Shell commands used by external transforms and validators.

use std::path::Path;
use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::{debug, info};

/// Captured result of a finished command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub code: i32,
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// Invocation of `cmd` through the platform shell.
#[derive(Debug, Clone, Default)]
pub struct ShellCommand<'a> {
    pub cmd: &'a str,
    /// Extra arguments appended to the command line, passed without
    /// re-quoting (`sh -c 'cmd "$@"'`).
    pub args: Vec<String>,
    pub env: Vec<(&'static str, String)>,
    /// Written to the child's stdin, which is closed afterwards.
    pub stdin: Option<Vec<u8>>,
}

impl<'a> ShellCommand<'a> {
    pub fn new(cmd: &'a str) -> Self {
        Self {
            cmd,
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn env(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.env.push((key, value.into()));
        self
    }

    pub fn stdin(mut self, input: impl Into<Vec<u8>>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Run to completion in `cwd` and capture stdout/stderr.
    ///
    /// A non-zero exit is reported through [`CommandOutput::success`], not
    /// as an error; errors mean the process could not be run at all.
    pub async fn run(self, cwd: &Path) -> Result<CommandOutput> {
        // Build a shell command appropriate for the platform.
        let mut cmd = if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(self.cmd).args(&self.args);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c")
                .arg(format!("{} \"$@\"", self.cmd))
                .arg("assetdag")
                .args(&self.args);
            c
        };

        cmd.current_dir(cwd)
            .stdin(if self.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        info!(cmd = %self.cmd, args = self.args.len(), "starting command");

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning command '{}'", self.cmd))?;

        // Feed stdin from a separate task so a chatty child cannot deadlock
        // against us on a full stdout pipe.
        let writer = match (child.stdin.take(), self.stdin) {
            (Some(mut stdin), Some(input)) => Some(tokio::spawn(async move {
                let res = stdin.write_all(&input).await;
                drop(stdin);
                res
            })),
            _ => None,
        };

        let output = child
            .wait_with_output()
            .await
            .with_context(|| format!("waiting for command '{}'", self.cmd))?;

        if let Some(writer) = writer {
            match writer.await {
                Ok(Err(e)) => debug!(cmd = %self.cmd, error = %e, "stdin closed early"),
                Err(e) => debug!(cmd = %self.cmd, error = %e, "stdin writer aborted"),
                Ok(Ok(())) => {}
            }
        }

        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
        for line in stderr.lines() {
            debug!(cmd = %self.cmd, "stderr: {}", line);
        }

        let code = output.status.code().unwrap_or(-1);
        info!(
            cmd = %self.cmd,
            exit_code = code,
            success = output.status.success(),
            "command exited"
        );

        Ok(CommandOutput {
            code,
            success: output.status.success(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr,
        })
    }
}
