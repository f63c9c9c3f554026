//! Network access types for the database ingress window.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Database port opened for the build
pub const DATABASE_PORT: u16 = 5432;

/// Parse the text output of an AWS CLI `--query ... --output text` lookup.
///
/// The CLI prints `None` (or nothing) when the query matches no resource.
pub fn parse_lookup(output: &str) -> Option<String> {
    let value = output.trim();
    if value.is_empty() || value == "None" || value == "null" {
        None
    } else {
        Some(value.to_string())
    }
}

/// Identifier of a discovered security group (e.g. `sg-0abc...`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityGroupId(String);

impl SecurityGroupId {
    /// Parse a lookup result; `None` means the group does not exist
    pub fn from_lookup(output: &str) -> Option<Self> {
        parse_lookup(output).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SecurityGroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A temporary inbound rule opened for the runner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngressRule {
    pub group_id: SecurityGroupId,
    pub protocol: String,
    pub port: u16,
    pub cidr: String,
    pub description: String,
}

impl IngressRule {
    /// TCP rule on the database port from a single IPv4 address
    pub fn database_access(group_id: SecurityGroupId, runner_ip: &str, description: &str) -> Self {
        Self {
            group_id,
            protocol: "tcp".to_string(),
            port: DATABASE_PORT,
            cidr: format!("{}/32", runner_ip.trim()),
            description: description.to_string(),
        }
    }

    /// Shorthand syntax for `aws ec2 authorize-security-group-ingress --ip-permissions`
    pub fn ip_permissions(&self) -> String {
        format!(
            "IpProtocol={},FromPort={},ToPort={},IpRanges=[{{CidrIp={},Description=\"{}\"}}]",
            self.protocol, self.port, self.port, self.cidr, self.description
        )
    }
}
