//! Pre-build hook: a repository-local script run before the image build.

use tracing::info;

use crate::adapters::CommandSpec;

use super::{Session, StepContext, StepError, StepOutcome};

/// Script location relative to the workspace root
pub const PRE_BUILD_SCRIPT: &str = ".datateer/build_scripts/pre-build.sh";

/// Mark the pre-build script executable and run it with no arguments
pub async fn run_pre_build(
    ctx: &StepContext<'_>,
    session: &Session,
) -> Result<StepOutcome, StepError> {
    let script = ctx.workspace.join(PRE_BUILD_SCRIPT);
    if !script.is_file() {
        return Err(StepError::MissingScript { path: script });
    }

    #[cfg(unix)]
    {
        use anyhow::Context;
        use std::os::unix::fs::PermissionsExt;

        let metadata = tokio::fs::metadata(&script)
            .await
            .with_context(|| format!("Failed to stat {}", script.display()))?;
        let mut permissions = metadata.permissions();
        permissions.set_mode(permissions.mode() | 0o111);
        tokio::fs::set_permissions(&script, permissions)
            .await
            .with_context(|| format!("Failed to make {} executable", script.display()))?;
    }

    let spec = CommandSpec::new(script.display().to_string())
        .envs(session.env())
        .current_dir(ctx.workspace);

    info!(script = %script.display(), "Running pre-build hook");
    ctx.runner.run_checked(&spec, ctx.timeout).await?;

    Ok(StepOutcome::completed(
        "Pre-build hook finished",
        vec![spec.render()],
    ))
}
