//! Credential bundle for a run.
//!
//! Secret material lives only in memory for the lifetime of a run and
//! never reaches the journal or the logs.

use std::fmt;

use crate::domain::CloudTarget;

/// A secret string whose formatting is redacted
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Access the raw value (only for handing to a subprocess)
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("***")
    }
}

/// Cloud access credentials
#[derive(Debug, Clone)]
pub enum CloudCredentials {
    /// Static AWS access key pair
    Aws {
        access_key_id: Secret,
        secret_access_key: Secret,
    },

    /// GCP service-account key document (JSON)
    Gcp { service_account_json: Secret },
}

impl CloudCredentials {
    pub fn cloud(&self) -> CloudTarget {
        match self {
            Self::Aws { .. } => CloudTarget::Aws,
            Self::Gcp { .. } => CloudTarget::Gcp,
        }
    }
}

/// Everything a run needs to authenticate
#[derive(Debug, Clone)]
pub struct CredentialBundle {
    pub cloud: CloudCredentials,

    /// SSH private key for the private source dependency
    pub ssh_deploy_key: Secret,

    /// Orchestration service API key
    pub orchestration_api_key: Secret,
}
