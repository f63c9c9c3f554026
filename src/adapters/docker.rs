//! docker CLI adapter: registry login and layer-cache loading.

use std::path::Path;

use super::CommandSpec;

/// docker CLI wrapper
#[derive(Debug, Clone)]
pub struct DockerCli {
    binary: String,
}

impl DockerCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Log into `registry`, reading the password from stdin
    pub fn login(&self, registry: &str, username: &str, password: &str) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["login", "-u", username, "--password-stdin"])
            .arg(format!("https://{}", registry))
            .stdin(password)
    }

    /// Load image layers from a saved archive
    pub fn load(&self, archive: &Path) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["load", "-i"])
            .arg(archive.display().to_string())
    }
}
