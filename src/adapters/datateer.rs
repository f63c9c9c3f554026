//! Deployment CLI adapter.
//!
//! Builds the exact command lines the deployment CLI expects. The CLI
//! surface is a fixed contract:
//!
//! ```text
//! config pull --environment <env> --cloud <aws|gcp> [--region <r> --config-bucket <bucket>]
//! pipeline deploy <name> --environment <env> --cloud <aws|gcp> --region <r> --account <id>
//! ```

use crate::config::CliSettings;
use crate::domain::{CloudTarget, RunConfig};

use super::CommandSpec;

/// Command builder for the deployment CLI and its installation
#[derive(Debug, Clone)]
pub struct DatateerCli {
    settings: CliSettings,
}

impl Default for DatateerCli {
    fn default() -> Self {
        Self::new(CliSettings::default())
    }
}

impl DatateerCli {
    pub fn new(settings: CliSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &CliSettings {
        &self.settings
    }

    /// pip requirement string, e.g. `datateer-cli[visualization]==1.2.3`
    fn requirement(&self, extra: Option<&str>, version: Option<&str>) -> String {
        let mut requirement = self.settings.package.clone();
        if let Some(extra) = extra {
            requirement.push_str(&format!("[{}]", extra));
        }
        if let Some(version) = version.map(str::trim).filter(|v| !v.is_empty()) {
            requirement.push_str(&format!("=={}", version));
        }
        requirement
    }

    /// Commands installing native libs, the CLI, and its visualization extra
    pub fn install_commands(&self, version: Option<&str>) -> Vec<CommandSpec> {
        let mut commands = Vec::new();

        if self.settings.install_system_packages && !self.settings.system_packages.is_empty() {
            commands.push(
                CommandSpec::new("sudo")
                    .args(["apt-get", "install", "-y"])
                    .args(self.settings.system_packages.iter().cloned()),
            );
        }

        commands.push(
            CommandSpec::new(&self.settings.pip)
                .args(["install", "--upgrade"])
                .arg(self.requirement(None, version)),
        );

        if !self.settings.visualization_extra.is_empty() {
            commands.push(
                CommandSpec::new(&self.settings.pip)
                    .args(["install", "--upgrade"])
                    .arg(self.requirement(Some(&self.settings.visualization_extra), version)),
            );
        }

        commands
    }

    /// `config pull` for the run's environment
    pub fn config_pull(&self, config: &RunConfig) -> CommandSpec {
        let spec = CommandSpec::new(&self.settings.binary).args([
            "config",
            "pull",
            "--environment",
            config.environment(),
            "--cloud",
            config.cloud().as_str(),
        ]);

        match config.cloud() {
            CloudTarget::Aws => spec,
            CloudTarget::Gcp => spec
                .args(["--region", config.region()])
                .arg("--config-bucket")
                .arg(config.config_bucket()),
        }
    }

    /// `pipeline deploy` for the run's pipeline flow
    pub fn pipeline_deploy(&self, config: &RunConfig) -> CommandSpec {
        CommandSpec::new(&self.settings.binary).args([
            "pipeline",
            "deploy",
            config.pipeline_name(),
            "--environment",
            config.environment(),
            "--cloud",
            config.cloud().as_str(),
            "--region",
            config.region(),
            "--account",
            config.account_id(),
        ])
    }
}
