//! Fallback agents the server can hand natural-language changes to.

use std::io;
use std::process::Stdio;

use anyhow::{Context, Result, anyhow, bail};
use futures_util::FutureExt;
use futures_util::future::BoxFuture;
use strudel_core::FallbackAgent;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

/// Runs an external program per instruction. The instruction is written to
/// the program's stdin and its stdout is the answer.
#[derive(Debug, Clone)]
pub struct CommandAgent {
    program: String,
    args: Vec<String>,
}

impl CommandAgent {
    /// `command` is split on whitespace into a program and its arguments.
    pub fn new(command: &str) -> Result<Self> {
        let mut parts = command.split_whitespace().map(str::to_string);
        let program = parts.next().context("Agent command is empty")?;
        Ok(Self {
            program,
            args: parts.collect(),
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, instruction: String) -> Result<String> {
        debug!("Running agent command '{}'", self.program);
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .with_context(|| format!("Failed to start agent command '{}'", self.program))?;

        if let Some(mut stdin) = child.stdin.take() {
            // A program that exits without reading its input is judged by its
            // exit status below.
            if let Err(err) = stdin.write_all(instruction.as_bytes()).await {
                if err.kind() != io::ErrorKind::BrokenPipe {
                    return Err(err).context("Failed to send instruction to agent");
                }
            }
            // stdin is closed on drop so the agent sees end of input
        }

        let output = child
            .wait_with_output()
            .await
            .context("Agent command did not finish")?;

        if !output.status.success() {
            bail!(
                "agent command exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl FallbackAgent for CommandAgent {
    fn apply(&self, instruction: String) -> BoxFuture<'_, Result<String>> {
        self.run(instruction).boxed()
    }
}

/// Used when no agent is configured. Every request fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableAgent;

impl FallbackAgent for UnavailableAgent {
    fn apply(&self, _instruction: String) -> BoxFuture<'_, Result<String>> {
        let result: Result<String> = Err(anyhow!("no fallback agent configured"));
        futures_util::future::ready(result).boxed()
    }
}
