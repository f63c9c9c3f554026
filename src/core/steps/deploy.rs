//! Deployer: build, push, and register the pipeline flow.
//!
//! This is the terminal action of a run. The orchestration API key and the
//! SSH deploy key are injected into this command's environment only.

use tracing::info;

use crate::adapters::{CommandSpec, DatateerCli};

use super::credentials::{SECRET_DEPLOY_KEY, SECRET_ORCHESTRATION_API_KEY};
use super::{Session, StepContext, StepError, StepOutcome};

/// The deploy command with its execution-scoped environment
pub fn deploy_command(ctx: &StepContext<'_>, session: &Session) -> CommandSpec {
    let credentials = session.credentials();

    DatateerCli::new(ctx.settings.cli.clone())
        .pipeline_deploy(ctx.config)
        .envs(session.env())
        .env(SECRET_DEPLOY_KEY, credentials.ssh_deploy_key.expose())
        .env(
            SECRET_ORCHESTRATION_API_KEY,
            credentials.orchestration_api_key.expose(),
        )
        .current_dir(ctx.workspace)
}

pub async fn deploy_pipeline(
    ctx: &StepContext<'_>,
    session: &Session,
) -> Result<StepOutcome, StepError> {
    let spec = deploy_command(ctx, session);

    info!(command = %spec.render(), "Deploying pipeline flow");
    ctx.runner.run_checked(&spec, ctx.timeout).await?;

    let summary = format!(
        "Pipeline '{}' deployed to {} ({} {})",
        ctx.config.pipeline_name(),
        ctx.config.environment(),
        ctx.config.cloud(),
        ctx.config.region()
    );

    Ok(StepOutcome::completed(summary, vec![spec.render()]))
}
