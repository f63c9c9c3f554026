//! AWS CLI adapter for security-group discovery and ingress rules.

use std::collections::BTreeMap;
use std::time::Duration;

use anyhow::Result;
use tracing::debug;

use crate::domain::network::parse_lookup;
use crate::domain::{IngressRule, SecurityGroupId};

use super::{CommandRunner, CommandSpec};

/// AWS CLI wrapper
#[derive(Debug, Clone)]
pub struct AwsCli {
    binary: String,
}

impl AwsCli {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
        }
    }

    /// Look up a VPC by its `Name` tag
    pub fn describe_vpc(&self, vpc_name: &str) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["ec2", "describe-vpcs", "--filters"])
            .arg(format!("Name=tag:Name,Values={}", vpc_name))
            .args(["--query", "Vpcs[0].VpcId", "--output", "text"])
    }

    /// Look up a security group by name inside a VPC
    pub fn describe_security_group(&self, vpc_id: &str, group_name: &str) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["ec2", "describe-security-groups", "--filters"])
            .arg(format!("Name=vpc-id,Values={}", vpc_id))
            .arg(format!("Name=group-name,Values={}", group_name))
            .args(["--query", "SecurityGroups[0].GroupId", "--output", "text"])
    }

    /// Add an inbound rule to a security group
    pub fn authorize_ingress(&self, rule: &IngressRule) -> CommandSpec {
        CommandSpec::new(&self.binary)
            .args(["ec2", "authorize-security-group-ingress", "--group-id"])
            .arg(rule.group_id.as_str())
            .arg("--ip-permissions")
            .arg(rule.ip_permissions())
    }

    /// Find the security group named `group_name` in the VPC tagged `vpc_name`.
    ///
    /// Returns `None` when either lookup matches nothing.
    pub async fn find_security_group(
        &self,
        runner: &dyn CommandRunner,
        session_env: &BTreeMap<String, String>,
        vpc_name: &str,
        group_name: &str,
        timeout: Duration,
    ) -> Result<Option<SecurityGroupId>> {
        let vpc_spec = self.describe_vpc(vpc_name).envs(session_env);
        let vpc_output = runner.run_checked(&vpc_spec, timeout).await?;

        let Some(vpc_id) = parse_lookup(&vpc_output.stdout) else {
            debug!(vpc_name, "No VPC found");
            return Ok(None);
        };

        let sg_spec = self
            .describe_security_group(&vpc_id, group_name)
            .envs(session_env);
        let sg_output = runner.run_checked(&sg_spec, timeout).await?;

        Ok(SecurityGroupId::from_lookup(&sg_output.stdout))
    }
}
