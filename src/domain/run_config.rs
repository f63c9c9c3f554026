//! Run configuration for a single deployment.
//!
//! A `RunConfig` can only be obtained from the precondition checker, so
//! holding one means every required field is populated.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::events::RunHeader;

/// Pipeline name used when the caller does not provide one
pub const DEFAULT_PIPELINE_NAME: &str = "main";

/// Cloud the flow is deployed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloudTarget {
    /// AWS (ECR registry, static access keys)
    Aws,

    /// GCP (Artifact Registry, service-account token)
    Gcp,
}

impl CloudTarget {
    /// Value passed to the deployment CLI's `--cloud` flag
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Aws => "aws",
            Self::Gcp => "gcp",
        }
    }
}

impl fmt::Display for CloudTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CloudTarget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "aws" => Ok(Self::Aws),
            "gcp" => Ok(Self::Gcp),
            other => anyhow::bail!("Unknown cloud target '{}' (expected aws or gcp)", other),
        }
    }
}

/// The required configuration fields, in the order they are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequiredField {
    AccountId,
    Region,
    ClientCode,
    Environment,
}

impl RequiredField {
    /// All required fields in check order
    pub const ALL: [RequiredField; 4] = [
        Self::AccountId,
        Self::Region,
        Self::ClientCode,
        Self::Environment,
    ];

    /// Input name as the caller knows it for the given cloud
    pub fn input_name(&self, cloud: CloudTarget) -> &'static str {
        match (self, cloud) {
            (Self::AccountId, CloudTarget::Aws) => "awsAccountId",
            (Self::AccountId, CloudTarget::Gcp) => "gcpProjectId",
            (Self::Region, CloudTarget::Aws) => "awsRegion",
            (Self::Region, CloudTarget::Gcp) => "gcpRegion",
            (Self::ClientCode, _) => "clientCode",
            (Self::Environment, _) => "environment",
        }
    }

    /// Secret-store key consulted when the input is absent
    pub fn secret_name(&self, cloud: CloudTarget) -> &'static str {
        match (self, cloud) {
            (Self::AccountId, CloudTarget::Aws) => "AWS_ACCOUNT_ID",
            (Self::AccountId, CloudTarget::Gcp) => "GCP_PROJECT_ID",
            (Self::Region, CloudTarget::Aws) => "AWS_REGION",
            (Self::Region, CloudTarget::Gcp) => "GCP_REGION",
            (Self::ClientCode, _) => "CLIENT_CODE",
            (Self::Environment, _) => "ENVIRONMENT",
        }
    }
}

/// Fully populated, immutable configuration for one run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunConfig {
    pub(crate) cloud: CloudTarget,
    pub(crate) account_id: String,
    pub(crate) region: String,
    pub(crate) client_code: String,
    pub(crate) environment: String,
    pub(crate) pipeline_name: String,
    pub(crate) cli_version: Option<String>,
}

impl RunConfig {
    pub fn cloud(&self) -> CloudTarget {
        self.cloud
    }

    /// AWS account id or GCP project id
    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn client_code(&self) -> &str {
        &self.client_code
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn pipeline_name(&self) -> &str {
        &self.pipeline_name
    }

    /// Requested deployment CLI version (`None` means latest)
    pub fn cli_version(&self) -> Option<&str> {
        self.cli_version.as_deref()
    }

    /// Identity recorded in the run journal
    pub fn header(&self) -> RunHeader {
        RunHeader {
            pipeline_name: self.pipeline_name.clone(),
            environment: self.environment.clone(),
            cloud: self.cloud,
        }
    }

    /// GCS bucket holding environment config for this client
    pub fn config_bucket(&self) -> String {
        format!("{}-prefect-config-data", self.client_code)
    }

    /// Artifact Registry host for the configured region
    pub fn registry_host(&self) -> String {
        match self.cloud {
            CloudTarget::Aws => format!(
                "{}.dkr.ecr.{}.amazonaws.com",
                self.account_id, self.region
            ),
            CloudTarget::Gcp => format!("{}-docker.pkg.dev", self.region),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(cloud: CloudTarget) -> RunConfig {
        RunConfig {
            cloud,
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            client_code: "pkt".to_string(),
            environment: "stg".to_string(),
            pipeline_name: DEFAULT_PIPELINE_NAME.to_string(),
            cli_version: None,
        }
    }

    #[test]
    fn test_cloud_target_parsing() {
        assert_eq!("aws".parse::<CloudTarget>().unwrap(), CloudTarget::Aws);
        assert_eq!(" GCP ".parse::<CloudTarget>().unwrap(), CloudTarget::Gcp);
        assert!("azure".parse::<CloudTarget>().is_err());
        assert_eq!(CloudTarget::Gcp.to_string(), "gcp");
    }

    #[test]
    fn test_field_names_follow_cloud() {
        assert_eq!(RequiredField::AccountId.input_name(CloudTarget::Aws), "awsAccountId");
        assert_eq!(RequiredField::AccountId.input_name(CloudTarget::Gcp), "gcpProjectId");
        assert_eq!(RequiredField::Region.secret_name(CloudTarget::Gcp), "GCP_REGION");
        assert_eq!(RequiredField::ClientCode.secret_name(CloudTarget::Aws), "CLIENT_CODE");
    }

    #[test]
    fn test_config_bucket_and_registry() {
        let config = sample(CloudTarget::Gcp);
        assert_eq!(config.config_bucket(), "pkt-prefect-config-data");
        assert_eq!(config.registry_host(), "us-east-1-docker.pkg.dev");

        let config = sample(CloudTarget::Aws);
        assert_eq!(
            config.registry_host(),
            "123456789012.dkr.ecr.us-east-1.amazonaws.com"
        );
    }
}
