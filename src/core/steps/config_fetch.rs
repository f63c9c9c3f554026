//! Configuration fetch: pull environment-specific config into the workspace.

use tracing::info;

use crate::adapters::DatateerCli;

use super::{Session, StepContext, StepError, StepOutcome};

pub async fn fetch_config(
    ctx: &StepContext<'_>,
    session: &Session,
) -> Result<StepOutcome, StepError> {
    let spec = DatateerCli::new(ctx.settings.cli.clone())
        .config_pull(ctx.config)
        .envs(session.env())
        .current_dir(ctx.workspace);

    info!(command = %spec.render(), "Pulling configuration");
    ctx.runner.run_checked(&spec, ctx.timeout).await?;

    Ok(StepOutcome::completed(
        format!("Configuration for '{}' pulled", ctx.config.environment()),
        vec![spec.render()],
    ))
}
