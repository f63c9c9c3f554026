//! Tool provisioning: native libraries, the deployment CLI, and its
//! visualization extra.

use tracing::info;

use crate::adapters::DatateerCli;

use super::{StepContext, StepError, StepOutcome};

/// Install the deployment CLI at the requested version (latest if unset)
pub async fn provision_tools(ctx: &StepContext<'_>) -> Result<StepOutcome, StepError> {
    let cli = DatateerCli::new(ctx.settings.cli.clone());
    let version = ctx.config.cli_version();
    let mut commands = Vec::new();

    for spec in cli.install_commands(version) {
        info!(command = %spec.render(), "Installing");
        ctx.runner
            .run_checked(&spec, ctx.timeout)
            .await
            .map_err(StepError::Tooling)?;
        commands.push(spec.render());
    }

    let summary = match version {
        Some(v) => format!("Installed {} {}", cli.settings().package, v),
        None => format!("Installed latest {}", cli.settings().package),
    };

    Ok(StepOutcome::completed(summary, commands))
}
