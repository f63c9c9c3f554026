//! Network access window (AWS only).
//!
//! Opens the database security group to the runner's public IP so the
//! build can reach it. Nothing here removes the rule afterwards.

use tracing::{info, warn};

use crate::adapters::{AwsCli, IpLookup};
use crate::domain::{IngressRule, SecurityGroupId};

use super::{Session, StepContext, StepError, StepOutcome};

/// Find the database security group, if it exists
pub async fn discover_security_group(
    ctx: &StepContext<'_>,
    aws: &AwsCli,
    session: &Session,
) -> Result<Option<SecurityGroupId>, StepError> {
    let network = &ctx.settings.network;
    let group = aws
        .find_security_group(
            ctx.runner,
            session.env(),
            &network.vpc_name,
            &network.security_group_name,
            ctx.timeout,
        )
        .await?;

    Ok(group)
}

/// Open TCP access to the database from the runner, or skip if there is no
/// database security group
pub async fn open_database_access(
    ctx: &StepContext<'_>,
    session: &Session,
    ip_lookup: &dyn IpLookup,
) -> Result<StepOutcome, StepError> {
    let aws = AwsCli::new(&ctx.settings.tools.aws);
    let network = &ctx.settings.network;

    let Some(group_id) = discover_security_group(ctx, &aws, session).await? else {
        info!(
            group = %network.security_group_name,
            "No database security group found, skipping network access"
        );
        return Ok(StepOutcome::skipped(format!(
            "Security group '{}' not found in VPC '{}'",
            network.security_group_name, network.vpc_name
        )));
    };

    let runner_ip = ip_lookup.public_ip().await?;
    let rule = IngressRule::database_access(
        group_id.clone(),
        &runner_ip.to_string(),
        &network.rule_description,
    );

    let spec = aws.authorize_ingress(&rule).envs(session.env());
    ctx.runner.run_checked(&spec, ctx.timeout).await?;

    warn!(
        group = %group_id,
        cidr = %rule.cidr,
        port = rule.port,
        "Opened database ingress; the rule is not removed by this run"
    );

    Ok(StepOutcome::completed(
        format!(
            "Opened {}/{} on {} to {}",
            rule.protocol, rule.port, group_id, rule.cidr
        ),
        vec![spec.render()],
    ))
}
