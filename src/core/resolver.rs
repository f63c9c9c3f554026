//! Parameter resolution.
//!
//! Merges caller-supplied inputs with secret-store fallbacks. An explicit,
//! non-empty input always wins over the secret.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::domain::{CloudTarget, RequiredField, DEFAULT_PIPELINE_NAME};

/// Read-only source of secret values
pub trait SecretStore: Send + Sync {
    /// Get a secret by name; empty values are treated as absent
    fn get(&self, name: &str) -> Option<String>;
}

/// Secrets exposed as process environment variables (the CI convention)
#[derive(Debug, Clone, Default)]
pub struct EnvSecretStore;

impl SecretStore for EnvSecretStore {
    fn get(&self, name: &str) -> Option<String> {
        std::env::var(name).ok().filter(|v| !v.trim().is_empty())
    }
}

/// In-memory secret store
#[derive(Debug, Clone, Default)]
pub struct MemorySecretStore {
    values: HashMap<String, String>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.insert(name.into(), value.into());
        self
    }
}

impl SecretStore for MemorySecretStore {
    fn get(&self, name: &str) -> Option<String> {
        self.values
            .get(name)
            .filter(|v| !v.trim().is_empty())
            .cloned()
    }
}

/// Caller-supplied inputs; every field except the cloud is optional
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployInputs {
    pub environment: Option<String>,
    pub pipeline_name: Option<String>,
    /// AWS account id or GCP project id
    pub account_id: Option<String>,
    pub region: Option<String>,
    pub client_code: Option<String>,
    pub cli_version: Option<String>,
}

impl DeployInputs {
    fn explicit(&self, field: RequiredField) -> Option<&str> {
        let value = match field {
            RequiredField::AccountId => self.account_id.as_deref(),
            RequiredField::Region => self.region.as_deref(),
            RequiredField::ClientCode => self.client_code.as_deref(),
            RequiredField::Environment => self.environment.as_deref(),
        };
        value.map(str::trim).filter(|v| !v.is_empty())
    }
}

/// Parameters after merging; required fields may still be empty
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedParameters {
    pub cloud: CloudTarget,
    pub account_id: String,
    pub region: String,
    pub client_code: String,
    pub environment: String,
    pub pipeline_name: String,
    pub cli_version: Option<String>,
}

impl ResolvedParameters {
    /// Value of a required field
    pub fn field(&self, field: RequiredField) -> &str {
        match field {
            RequiredField::AccountId => &self.account_id,
            RequiredField::Region => &self.region,
            RequiredField::ClientCode => &self.client_code,
            RequiredField::Environment => &self.environment,
        }
    }
}

/// Resolve inputs against the secret store for the given cloud
pub fn resolve(
    cloud: CloudTarget,
    inputs: &DeployInputs,
    secrets: &dyn SecretStore,
) -> ResolvedParameters {
    let pick = |field: RequiredField| -> String {
        match inputs.explicit(field) {
            Some(value) => value.to_string(),
            None => secrets
                .get(field.secret_name(cloud))
                .map(|v| v.trim().to_string())
                .unwrap_or_default(),
        }
    };

    let pipeline_name = inputs
        .pipeline_name
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .unwrap_or(DEFAULT_PIPELINE_NAME)
        .to_string();

    let cli_version = inputs
        .cli_version
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    ResolvedParameters {
        cloud,
        account_id: pick(RequiredField::AccountId),
        region: pick(RequiredField::Region),
        client_code: pick(RequiredField::ClientCode),
        environment: pick(RequiredField::Environment),
        pipeline_name,
        cli_version,
    }
}
