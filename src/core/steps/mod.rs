//! Step implementations.
//!
//! Each step is a thin wrapper around external commands. Steps receive the
//! immutable `RunConfig` and the `Session` explicitly; nothing is passed
//! through the process environment.

pub mod cache;
pub mod config_fetch;
pub mod credentials;
pub mod deploy;
pub mod hook;
pub mod network;
pub mod provision;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::TempDir;
use thiserror::Error;

use crate::adapters::{CommandError, CommandRunner};
use crate::config::ResolvedConfig;
use crate::domain::{CredentialBundle, RunConfig};

pub use credentials::load_credentials;

/// Fatal step errors
#[derive(Debug, Error)]
pub enum StepError {
    #[error("Tool installation failed: {0}")]
    Tooling(#[source] CommandError),

    #[error("Credential error: {0}")]
    Credential(String),

    #[error(transparent)]
    Command(#[from] CommandError),

    #[error("Pre-build script not found: {}", path.display())]
    MissingScript { path: PathBuf },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// What a finished step reports back
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step did its work
    Completed {
        summary: String,
        commands: Vec<String>,
    },

    /// The step had nothing to do
    Skipped { reason: String },
}

impl StepOutcome {
    pub fn completed(summary: impl Into<String>, commands: Vec<String>) -> Self {
        Self::Completed {
            summary: summary.into(),
            commands,
        }
    }

    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }
}

/// Everything a step needs to run
pub struct StepContext<'a> {
    pub config: &'a RunConfig,
    pub settings: &'a ResolvedConfig,
    /// Repository checkout the flow is built from
    pub workspace: &'a Path,
    pub runner: &'a dyn CommandRunner,
    pub timeout: Duration,
}

/// Run-scoped authentication state produced by the credential broker.
///
/// Holds the ambient environment later steps run with, plus the temporary
/// directory storing key files. Dropping the session deletes those files.
pub struct Session {
    env: BTreeMap<String, String>,
    credentials: CredentialBundle,
    _key_dir: TempDir,
}

impl Session {
    pub(crate) fn new(
        env: BTreeMap<String, String>,
        credentials: CredentialBundle,
        key_dir: TempDir,
    ) -> Self {
        Self {
            env,
            credentials,
            _key_dir: key_dir,
        }
    }

    /// Environment variables every later command runs with
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    pub fn credentials(&self) -> &CredentialBundle {
        &self.credentials
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("env", &self.env.keys().collect::<Vec<_>>())
            .field("key_dir", &self._key_dir.path())
            .finish()
    }
}
