//! GCP deployment integration tests.

mod common;

use std::sync::Arc;

use common::*;
use flowdeploy::adapters::CommandOutput;
use flowdeploy::core::{DeployPlan, Orchestrator, StepKind};
use flowdeploy::domain::{CloudTarget, RequiredField, StepStatus};

fn gcp_runner() -> ScriptedRunner {
    ScriptedRunner::new().respond(
        "gcloud auth print-access-token",
        CommandOutput::success(format!("{}\n", GCP_TOKEN)),
    )
}

#[tokio::test]
async fn test_gcp_deploy_pulls_config_from_client_bucket() {
    let fixture = Fixture::new();
    let runner = Arc::new(gcp_runner());
    let ip_lookup = Arc::new(StaticIpLookup::default());
    let secrets = gcp_secrets();

    let config = Orchestrator::prepare(CloudTarget::Gcp, &staging_inputs(), &secrets).unwrap();
    let plan = DeployPlan::for_cloud(CloudTarget::Gcp, true);
    let run = fixture
        .orchestrator(runner.clone(), ip_lookup.clone())
        .run_deployment(&config, &plan, &secrets)
        .await
        .unwrap();

    assert!(run.succeeded());

    let rendered = runner.rendered();
    assert!(rendered.contains(
        &"datateer config pull --environment stg --cloud gcp --region us-central1 --config-bucket pkt-prefect-config-data"
            .to_string()
    ));
    assert_eq!(
        rendered.last().map(String::as_str),
        Some("datateer pipeline deploy main --environment stg --cloud gcp --region us-central1 --account acme-data")
    );

    // No network window on GCP
    assert!(!plan.contains(StepKind::NetworkAccess));
    assert!(runner.position("aws").is_none());
    assert_eq!(ip_lookup.lookups(), 0);
}

#[tokio::test]
async fn test_gcp_registry_login_uses_token_on_stdin() {
    let fixture = Fixture::new();
    let runner = Arc::new(gcp_runner());
    let secrets = gcp_secrets();

    let config = Orchestrator::prepare(CloudTarget::Gcp, &staging_inputs(), &secrets).unwrap();
    let plan = DeployPlan::for_cloud(CloudTarget::Gcp, false);
    fixture
        .orchestrator(runner.clone(), Arc::new(StaticIpLookup::default()))
        .run_deployment(&config, &plan, &secrets)
        .await
        .unwrap();

    let activate = runner.position("gcloud auth activate-service-account").unwrap();
    let token = runner.position("gcloud auth print-access-token").unwrap();
    let login = runner.position("docker login").unwrap();
    assert!(activate < token && token < login);

    let login = runner.find("docker login").unwrap();
    assert_eq!(
        login.render(),
        "docker login -u oauth2accesstoken --password-stdin https://us-central1-docker.pkg.dev"
    );
    assert_eq!(login.stdin.as_deref(), Some(GCP_TOKEN));

    let deploy = runner.find("datateer pipeline deploy").unwrap();
    assert!(deploy.env.contains_key("GOOGLE_APPLICATION_CREDENTIALS"));
    assert_eq!(
        deploy.env.get("CLOUDSDK_CORE_PROJECT").map(String::as_str),
        Some("acme-data")
    );
}

#[tokio::test]
async fn test_empty_access_token_is_a_credential_failure() {
    let fixture = Fixture::new();
    let runner = Arc::new(
        ScriptedRunner::new().respond("gcloud auth print-access-token", CommandOutput::success("\n")),
    );
    let secrets = gcp_secrets();

    let config = Orchestrator::prepare(CloudTarget::Gcp, &staging_inputs(), &secrets).unwrap();
    let plan = DeployPlan::for_cloud(CloudTarget::Gcp, false);
    let run = fixture
        .orchestrator(runner.clone(), Arc::new(StaticIpLookup::default()))
        .run_deployment(&config, &plan, &secrets)
        .await
        .unwrap();

    assert_eq!(run.step_status("broker-credentials"), StepStatus::Failed);
    assert!(runner.position("docker login").is_none());
    assert!(runner.position("datateer").is_none());
}

#[tokio::test]
async fn test_invalid_service_account_json_fails_without_echoing_it() {
    let fixture = Fixture::new();
    let runner = Arc::new(gcp_runner());
    let secrets = gcp_secrets().with("GCP_SA_KEY", "not-json-but-secret-material");

    let config = Orchestrator::prepare(CloudTarget::Gcp, &staging_inputs(), &secrets).unwrap();
    let plan = DeployPlan::for_cloud(CloudTarget::Gcp, false);
    let run = fixture
        .orchestrator(runner.clone(), Arc::new(StaticIpLookup::default()))
        .run_deployment(&config, &plan, &secrets)
        .await
        .unwrap();

    assert!(!run.succeeded());
    assert!(runner.calls().is_empty());
    assert!(!fixture.journal(run.id).contains("secret-material"));
}

#[tokio::test]
async fn test_gcp_uses_project_and_region_secrets() {
    let secrets = gcp_secrets().with("GCP_REGION", "");

    let err = Orchestrator::prepare(CloudTarget::Gcp, &staging_inputs(), &secrets).unwrap_err();

    assert_eq!(err.field(), RequiredField::Region);
    assert!(err.to_string().contains("gcpRegion"));
    assert!(err.to_string().contains("GCP_REGION"));
}
