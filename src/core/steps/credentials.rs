//! Credential broker.
//!
//! Installs the SSH deploy key and establishes cloud credentials. AWS keys
//! become session environment; on GCP the service-account key is exchanged
//! for an access token that authenticates the container registry session.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Context;
use tracing::info;

use crate::adapters::gcp::OAUTH2_TOKEN_USER;
use crate::adapters::{DockerCli, GcloudCli};
use crate::core::resolver::SecretStore;
use crate::domain::{CloudCredentials, CloudTarget, CredentialBundle, Secret};

use super::{Session, StepContext, StepError, StepOutcome};

pub const SECRET_DEPLOY_KEY: &str = "DATATEER_DEPLOY_KEY";
pub const SECRET_ORCHESTRATION_API_KEY: &str = "PREFECT_API_KEY";
pub const SECRET_AWS_ACCESS_KEY_ID: &str = "AWS_ACCESS_KEY_ID";
pub const SECRET_AWS_SECRET_ACCESS_KEY: &str = "AWS_SECRET_ACCESS_KEY";
pub const SECRET_GCP_SERVICE_ACCOUNT: &str = "GCP_SA_KEY";

fn required(secrets: &dyn SecretStore, name: &str) -> Result<Secret, StepError> {
    secrets
        .get(name)
        .map(Secret::new)
        .ok_or_else(|| StepError::Credential(format!("Required secret {} is not set", name)))
}

/// Read the credential bundle for a cloud from the secret store
pub fn load_credentials(
    cloud: CloudTarget,
    secrets: &dyn SecretStore,
) -> Result<CredentialBundle, StepError> {
    let cloud_credentials = match cloud {
        CloudTarget::Aws => CloudCredentials::Aws {
            access_key_id: required(secrets, SECRET_AWS_ACCESS_KEY_ID)?,
            secret_access_key: required(secrets, SECRET_AWS_SECRET_ACCESS_KEY)?,
        },
        CloudTarget::Gcp => {
            let json = required(secrets, SECRET_GCP_SERVICE_ACCOUNT)?;
            serde_json::from_str::<serde_json::Value>(json.expose()).map_err(|e| {
                StepError::Credential(format!(
                    "{} is not a valid service-account document: {}",
                    SECRET_GCP_SERVICE_ACCOUNT, e
                ))
            })?;
            CloudCredentials::Gcp {
                service_account_json: json,
            }
        }
    };

    Ok(CredentialBundle {
        cloud: cloud_credentials,
        ssh_deploy_key: required(secrets, SECRET_DEPLOY_KEY)?,
        orchestration_api_key: required(secrets, SECRET_ORCHESTRATION_API_KEY)?,
    })
}

/// Write a secret file readable only by the owner
async fn write_private_file(path: &Path, contents: &str) -> anyhow::Result<()> {
    tokio::fs::write(path, contents)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o600))
            .await
            .with_context(|| format!("Failed to restrict permissions on {}", path.display()))?;
    }

    Ok(())
}

/// `GIT_SSH_COMMAND` value pinning git to the deploy key
pub fn git_ssh_command(key_path: &Path) -> String {
    format!(
        "ssh -i {} -o IdentitiesOnly=yes -o StrictHostKeyChecking=accept-new",
        key_path.display()
    )
}

/// Install the SSH key and cloud credentials, returning the session
pub async fn broker_credentials(
    ctx: &StepContext<'_>,
    credentials: CredentialBundle,
) -> Result<(Session, StepOutcome), StepError> {
    let key_dir = tempfile::Builder::new()
        .prefix("flowdeploy-keys-")
        .tempdir()
        .context("Failed to create key directory")?;

    let mut env = BTreeMap::new();
    let mut commands = Vec::new();

    // SSH deploy key for the private source dependency
    let mut key = credentials.ssh_deploy_key.expose().to_string();
    if !key.ends_with('\n') {
        key.push('\n');
    }
    let ssh_key_path = key_dir.path().join("deploy_key");
    write_private_file(&ssh_key_path, &key).await?;
    env.insert("GIT_SSH_COMMAND".to_string(), git_ssh_command(&ssh_key_path));
    info!(path = %ssh_key_path.display(), "Installed SSH deploy key");

    match &credentials.cloud {
        CloudCredentials::Aws {
            access_key_id,
            secret_access_key,
        } => {
            env.insert("AWS_ACCESS_KEY_ID".to_string(), access_key_id.expose().to_string());
            env.insert(
                "AWS_SECRET_ACCESS_KEY".to_string(),
                secret_access_key.expose().to_string(),
            );
            env.insert("AWS_DEFAULT_REGION".to_string(), ctx.config.region().to_string());
            env.insert("AWS_REGION".to_string(), ctx.config.region().to_string());
            info!(region = ctx.config.region(), "Configured AWS credentials");
        }
        CloudCredentials::Gcp {
            service_account_json,
        } => {
            let key_file = key_dir.path().join("service-account.json");
            write_private_file(&key_file, service_account_json.expose()).await?;
            env.insert(
                "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
                key_file.display().to_string(),
            );
            env.insert(
                "CLOUDSDK_CORE_PROJECT".to_string(),
                ctx.config.account_id().to_string(),
            );

            commands.extend(gcp_registry_login(ctx, &key_file, &env).await?);
        }
    }

    let session = Session::new(env, credentials, key_dir);
    let outcome = StepOutcome::completed(
        format!("Credentials ready for {}", ctx.config.cloud()),
        commands,
    );

    Ok((session, outcome))
}

/// Exchange the service account for a token and log into Artifact Registry
async fn gcp_registry_login(
    ctx: &StepContext<'_>,
    key_file: &Path,
    env: &BTreeMap<String, String>,
) -> Result<Vec<String>, StepError> {
    let gcloud = GcloudCli::new(&ctx.settings.tools.gcloud);
    let docker = DockerCli::new(&ctx.settings.tools.docker);
    let mut commands = Vec::new();

    let activate = gcloud.activate_service_account(key_file).envs(env);
    ctx.runner.run_checked(&activate, ctx.timeout).await?;
    commands.push(activate.render());

    let print_token = gcloud.print_access_token().envs(env);
    let token = ctx
        .runner
        .run_checked(&print_token, ctx.timeout)
        .await?
        .stdout
        .trim()
        .to_string();
    commands.push(print_token.render());

    if token.is_empty() {
        return Err(StepError::Credential(
            "gcloud returned an empty access token".to_string(),
        ));
    }

    let registry = ctx.config.registry_host();
    let login = docker.login(&registry, OAUTH2_TOKEN_USER, &token).envs(env);
    ctx.runner.run_checked(&login, ctx.timeout).await?;
    commands.push(login.render());
    info!(%registry, "Authenticated container registry");

    Ok(commands)
}
