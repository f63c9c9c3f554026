//! Precondition checks.
//!
//! The only way to obtain a `RunConfig` is through `check`, which rejects
//! any resolution that left a required field empty.

use thiserror::Error;

use crate::domain::{CloudTarget, RequiredField, RunConfig};

use super::resolver::ResolvedParameters;

/// A required parameter could not be resolved
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("Missing required input '{input}': pass it explicitly or set the {secret} secret")]
    MissingField {
        field: RequiredField,
        cloud: CloudTarget,
        input: &'static str,
        secret: &'static str,
    },
}

impl PreconditionError {
    fn missing(field: RequiredField, cloud: CloudTarget) -> Self {
        Self::MissingField {
            field,
            cloud,
            input: field.input_name(cloud),
            secret: field.secret_name(cloud),
        }
    }

    /// The field that was missing
    pub fn field(&self) -> RequiredField {
        match self {
            Self::MissingField { field, .. } => *field,
        }
    }
}

/// Validate resolved parameters and freeze them into a `RunConfig`
pub fn check(params: ResolvedParameters) -> Result<RunConfig, PreconditionError> {
    for field in RequiredField::ALL {
        if params.field(field).trim().is_empty() {
            return Err(PreconditionError::missing(field, params.cloud));
        }
    }

    Ok(RunConfig {
        cloud: params.cloud,
        account_id: params.account_id,
        region: params.region,
        client_code: params.client_code,
        environment: params.environment,
        pipeline_name: params.pipeline_name,
        cli_version: params.cli_version,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> ResolvedParameters {
        ResolvedParameters {
            cloud: CloudTarget::Aws,
            account_id: "123456789012".to_string(),
            region: "us-east-1".to_string(),
            client_code: "pkt".to_string(),
            environment: "stg".to_string(),
            pipeline_name: "main".to_string(),
            cli_version: None,
        }
    }

    #[test]
    fn test_complete_parameters_pass() {
        let config = check(params()).unwrap();
        assert_eq!(config.account_id(), "123456789012");
        assert_eq!(config.client_code(), "pkt");
    }

    #[test]
    fn test_each_missing_field_is_named() {
        for field in RequiredField::ALL {
            let mut p = params();
            match field {
                RequiredField::AccountId => p.account_id.clear(),
                RequiredField::Region => p.region = "   ".to_string(),
                RequiredField::ClientCode => p.client_code.clear(),
                RequiredField::Environment => p.environment.clear(),
            }

            let err = check(p).unwrap_err();
            assert_eq!(err.field(), field);
            assert!(err
                .to_string()
                .contains(field.input_name(CloudTarget::Aws)));
        }
    }

    #[test]
    fn test_first_missing_field_reported() {
        let mut p = params();
        p.region.clear();
        p.client_code.clear();

        assert_eq!(check(p).unwrap_err().field(), RequiredField::Region);
    }

    #[test]
    fn test_gcp_message_uses_project_vocabulary() {
        let mut p = params();
        p.cloud = CloudTarget::Gcp;
        p.account_id.clear();

        let message = check(p).unwrap_err().to_string();
        assert!(message.contains("gcpProjectId"));
        assert!(message.contains("GCP_PROJECT_ID"));
    }
}
