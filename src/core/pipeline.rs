//! Deployment plan definitions.
//!
//! A plan is the ordered list of steps for one cloud target. The order is
//! fixed; the only variation is the AWS-only network window and whether
//! tool provisioning is requested.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::CloudTarget;

/// The steps a deployment can contain, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StepKind {
    ProvisionTools,
    BrokerCredentials,
    FetchConfig,
    PreBuildHook,
    NetworkAccess,
    RestoreCache,
    Deploy,
}

impl StepKind {
    /// Stable step name used in logs and the journal
    pub fn name(&self) -> &'static str {
        match self {
            Self::ProvisionTools => "provision-tools",
            Self::BrokerCredentials => "broker-credentials",
            Self::FetchConfig => "fetch-config",
            Self::PreBuildHook => "pre-build-hook",
            Self::NetworkAccess => "network-access",
            Self::RestoreCache => "restore-cache",
            Self::Deploy => "deploy",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::ProvisionTools => "Install the deployment CLI and graph-rendering libraries",
            Self::BrokerCredentials => "Install the SSH deploy key and cloud credentials",
            Self::FetchConfig => "Pull environment configuration into the workspace",
            Self::PreBuildHook => "Run the repository pre-build script",
            Self::NetworkAccess => "Open database access from the runner",
            Self::RestoreCache => "Restore the container layer cache",
            Self::Deploy => "Build, push and register the pipeline flow",
        }
    }

    /// How a failure of this step affects the run
    pub fn failure_policy(&self) -> FailurePolicy {
        match self {
            Self::RestoreCache => FailurePolicy::Tolerated,
            _ => FailurePolicy::Fatal,
        }
    }
}

impl fmt::Display for StepKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Effect of a step failure on the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// The run stops at the first failure
    Fatal,

    /// The failure is recorded and the run continues
    Tolerated,
}

/// Ordered steps for one deployment
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeployPlan {
    pub cloud: CloudTarget,
    pub steps: Vec<StepKind>,
}

impl DeployPlan {
    /// Build the plan for a cloud target
    pub fn for_cloud(cloud: CloudTarget, provision_tools: bool) -> Self {
        let mut steps = Vec::with_capacity(7);

        if provision_tools {
            steps.push(StepKind::ProvisionTools);
        }
        steps.push(StepKind::BrokerCredentials);
        steps.push(StepKind::FetchConfig);
        steps.push(StepKind::PreBuildHook);
        if cloud == CloudTarget::Aws {
            steps.push(StepKind::NetworkAccess);
        }
        steps.push(StepKind::RestoreCache);
        steps.push(StepKind::Deploy);

        Self { cloud, steps }
    }

    pub fn contains(&self, step: StepKind) -> bool {
        self.steps.contains(&step)
    }
}
