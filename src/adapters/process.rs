//! Subprocess runner backed by `tokio::process`.

use std::io;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::debug;

use super::{CommandError, CommandOutput, CommandRunner, CommandSpec};

/// Runs commands as real child processes
#[derive(Debug, Clone, Default)]
pub struct ProcessRunner;

impl ProcessRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for ProcessRunner {
    async fn run(
        &self,
        spec: &CommandSpec,
        step_timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        let rendered = spec.render();
        debug!(command = %rendered, "Spawning");

        let mut command = Command::new(&spec.program);
        command
            .args(&spec.args)
            .envs(&spec.env)
            .stdin(if spec.stdin.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        if let Some(ref dir) = spec.current_dir {
            command.current_dir(dir);
        }

        let mut child = command.spawn().map_err(|source| CommandError::Spawn {
            command: rendered.clone(),
            source,
        })?;

        // Feed stdin while the output is collected; dropping the handle
        // signals EOF
        let stdin = child.stdin.take();
        let write_stdin = async move {
            let (Some(input), Some(mut stdin)) = (spec.stdin.as_ref(), stdin) else {
                return Ok::<(), io::Error>(());
            };
            match stdin.write_all(input.as_bytes()).await {
                // The child exited without reading all of its input
                Err(e) if e.kind() == io::ErrorKind::BrokenPipe => Ok(()),
                result => result,
            }
        };

        let (written, output) = timeout(step_timeout, async move {
            tokio::join!(write_stdin, child.wait_with_output())
        })
        .await
        .map_err(|_| CommandError::Timeout {
            command: rendered.clone(),
            seconds: step_timeout.as_secs(),
        })?;

        let output = output.map_err(|source| CommandError::Io {
            command: rendered.clone(),
            source,
        })?;
        written.map_err(|source| CommandError::Io {
            command: rendered.clone(),
            source,
        })?;

        Ok(CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        })
    }
}
