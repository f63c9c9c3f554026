//! Adapter interfaces for external systems.
//!
//! Every external collaborator (deployment CLI, cloud CLIs, docker,
//! package managers) is reached through a `CommandRunner`, which makes
//! the orchestration testable without spawning real processes.

pub mod aws;
pub mod datateer;
pub mod docker;
pub mod gcp;
pub mod public_ip;
pub mod process;

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use aws::AwsCli;
pub use datateer::DatateerCli;
pub use docker::DockerCli;
pub use gcp::GcloudCli;
pub use process::ProcessRunner;
pub use public_ip::{HttpIpLookup, IpLookup};

/// A fully described external command
#[derive(Clone, Default, PartialEq, Eq)]
pub struct CommandSpec {
    /// Program to execute (resolved through PATH)
    pub program: String,

    /// Arguments, passed without shell interpretation
    pub args: Vec<String>,

    /// Extra environment variables for this command only
    pub env: BTreeMap<String, String>,

    /// Working directory (inherits the current one if unset)
    pub current_dir: Option<PathBuf>,

    /// Data written to the child's stdin
    pub stdin: Option<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Default::default()
        }
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

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn stdin(mut self, input: impl Into<String>) -> Self {
        self.stdin = Some(input.into());
        self
    }

    /// Command line for logs and the journal.
    ///
    /// Environment values and stdin are never rendered.
    pub fn render(&self) -> String {
        let mut line = self.program.clone();
        for arg in &self.args {
            line.push(' ');
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                line.push_str(&format!("'{}'", arg));
            } else {
                line.push_str(arg);
            }
        }
        line
    }
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("command", &self.render())
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("current_dir", &self.current_dir)
            .field("stdin", &self.stdin.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Captured result of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// Exit code (`None` if killed by a signal)
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: Some(0),
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code: Some(exit_code),
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Turn a non-zero exit into a `CommandError::Failed`
    pub fn check(self, spec: &CommandSpec) -> Result<Self, CommandError> {
        if self.is_success() {
            return Ok(self);
        }

        let stderr = self.stderr.trim();
        Err(CommandError::Failed {
            command: spec.render(),
            exit_code: self.exit_code.unwrap_or(-1),
            stderr: if stderr.is_empty() {
                self.stdout.trim().to_string()
            } else {
                stderr.to_string()
            },
        })
    }
}

/// Errors from running an external command
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Failed to spawn '{command}': {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error while running '{command}': {source}")]
    Io {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{command}' timed out after {seconds}s")]
    Timeout { command: String, seconds: u64 },

    #[error("'{command}' failed with exit code {exit_code}: {stderr}")]
    Failed {
        command: String,
        exit_code: i32,
        stderr: String,
    },
}

/// Executes external commands
#[async_trait]
pub trait CommandRunner: Send + Sync {
    /// Run a command to completion.
    ///
    /// A non-zero exit is returned as `Ok`; callers decide whether it is
    /// fatal via `CommandOutput::check`.
    async fn run(&self, spec: &CommandSpec, timeout: Duration)
        -> Result<CommandOutput, CommandError>;

    /// Run a command and fail on non-zero exit
    async fn run_checked(
        &self,
        spec: &CommandSpec,
        timeout: Duration,
    ) -> Result<CommandOutput, CommandError> {
        self.run(spec, timeout).await?.check(spec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_quotes_whitespace() {
        let spec = CommandSpec::new("aws")
            .args(["ec2", "describe-vpcs"])
            .arg("Name=tag:Name,Values=default")
            .arg("with space");

        assert_eq!(
            spec.render(),
            "aws ec2 describe-vpcs Name=tag:Name,Values=default 'with space'"
        );
    }

    #[test]
    fn test_debug_hides_env_values_and_stdin() {
        let spec = CommandSpec::new("docker")
            .args(["login", "--password-stdin"])
            .env("AWS_SECRET_ACCESS_KEY", "topsecret")
            .stdin("ya29.token");

        let debug = format!("{:?}", spec);
        assert!(debug.contains("AWS_SECRET_ACCESS_KEY"));
        assert!(!debug.contains("topsecret"));
        assert!(!debug.contains("ya29.token"));
    }

    #[test]
    fn test_check_uses_stdout_when_stderr_empty() {
        let spec = CommandSpec::new("datateer").arg("pipeline");
        let output = CommandOutput {
            exit_code: Some(3),
            stdout: "boom\n".to_string(),
            stderr: String::new(),
        };

        match output.check(&spec) {
            Err(CommandError::Failed {
                exit_code, stderr, ..
            }) => {
                assert_eq!(exit_code, 3);
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected result: {:?}", other),
        }

        assert!(CommandOutput::success("ok").check(&spec).is_ok());
    }
}
