//! Main orchestrator for deployment runs.
//!
//! Executes the plan strictly in order, records every transition in the
//! run journal, and stops at the first fatal error. The cache step is the
//! only one whose failure is tolerated.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use crate::adapters::{
    AwsCli, CommandRunner, DatateerCli, DockerCli, GcloudCli, HttpIpLookup, IpLookup,
    ProcessRunner,
};
use crate::adapters::gcp::OAUTH2_TOKEN_USER;
use crate::config::ResolvedConfig;
use crate::domain::{
    CacheOutcome, CloudTarget, Event, EventType, Run, RunState, RunConfig, StepStatus,
};

use super::event_store::EventStore;
use super::limits::{LimitViolation, RunTracker};
use super::pipeline::{DeployPlan, FailurePolicy, StepKind};
use super::preconditions::{self, PreconditionError};
use super::resolver::{self, DeployInputs, SecretStore};
use super::steps::{
    self, cache, config_fetch, credentials, deploy, hook, network, provision, Session,
    StepContext, StepError, StepOutcome,
};

/// What a step reported, before it is written to the journal
enum StepReport {
    Outcome(StepOutcome),
    Cache(CacheOutcome),
}

/// Main deployment orchestrator
pub struct Orchestrator {
    settings: ResolvedConfig,
    /// Repository checkout the flow is built from
    workspace: PathBuf,
    runner: Arc<dyn CommandRunner>,
    ip_lookup: Arc<dyn IpLookup>,
}

impl Orchestrator {
    /// Create an orchestrator that runs real processes
    pub fn new(settings: ResolvedConfig, workspace: PathBuf) -> Result<Self> {
        let ip_lookup = HttpIpLookup::new(settings.network.ip_endpoint.clone())?;
        Ok(Self::with_adapters(
            settings,
            workspace,
            Arc::new(ProcessRunner::new()),
            Arc::new(ip_lookup),
        ))
    }

    /// Create an orchestrator with custom adapters
    pub fn with_adapters(
        settings: ResolvedConfig,
        workspace: PathBuf,
        runner: Arc<dyn CommandRunner>,
        ip_lookup: Arc<dyn IpLookup>,
    ) -> Self {
        Self {
            settings,
            workspace,
            runner,
            ip_lookup,
        }
    }

    /// Resolve inputs against secrets and check preconditions.
    ///
    /// This touches nothing outside the process; a missing field fails
    /// here before any step can run.
    pub fn prepare(
        cloud: CloudTarget,
        inputs: &DeployInputs,
        secrets: &dyn SecretStore,
    ) -> Result<RunConfig, PreconditionError> {
        let params = resolver::resolve(cloud, inputs, secrets);
        preconditions::check(params)
    }

    /// Execute a deployment plan
    #[instrument(
        skip(self, config, plan, secrets),
        fields(pipeline = %config.pipeline_name(), environment = %config.environment(), cloud = %config.cloud())
    )]
    pub async fn run_deployment(
        &self,
        config: &RunConfig,
        plan: &DeployPlan,
        secrets: &dyn SecretStore,
    ) -> Result<Run> {
        let run_id = Uuid::new_v4();
        info!(%run_id, steps = plan.steps.len(), "Starting deployment");

        let store = EventStore::open(&self.settings.runs_dir(), run_id).await?;

        let mut run = Run::new(
            run_id,
            config.pipeline_name().to_string(),
            config.environment().to_string(),
            config.cloud(),
        );
        let mut tracker = RunTracker::new();
        let mut session: Option<Session> = None;

        let start_event = Event::new(
            run_id,
            None,
            EventType::RunStarted,
            format!(
                "Deploying pipeline '{}' to {} on {}",
                config.pipeline_name(),
                config.environment(),
                config.cloud()
            ),
            StepStatus::Running,
        )
        .with_header(config.header());
        store.append(&start_event).await?;

        for step in &plan.steps {
            let step = *step;

            if let Err(violation) = self.settings.limits.check(&tracker) {
                return self.handle_limit_violation(&store, &mut run, violation).await;
            }

            let ctx = StepContext {
                config,
                settings: &self.settings,
                workspace: &self.workspace,
                runner: self.runner.as_ref(),
                timeout: self.settings.limits.timeout_for(step),
            };

            let started = Event::new(
                run_id,
                Some(step.name().to_string()),
                EventType::StepStarted,
                step.description().to_string(),
                StepStatus::Running,
            );
            store.append(&started).await?;
            run.record_step(step.name(), StepStatus::Running);
            info!(step = %step, "Step started");

            let step_start = Instant::now();
            let result = self.execute_step(step, &ctx, &mut session, secrets).await;
            let duration_ms = step_start.elapsed().as_millis() as u64;
            tracker.record_step();

            match result {
                Ok(report) => {
                    self.record_report(&store, &mut run, step, report, duration_ms)
                        .await?;
                }
                Err(e) if step.failure_policy() == FailurePolicy::Tolerated => {
                    let message = e.to_string();
                    warn!(step = %step, error = %message, "Tolerated step failure");
                    let tolerated = Event::new(
                        run_id,
                        Some(step.name().to_string()),
                        EventType::StepTolerated,
                        format!("Step '{}' failed, continuing", step),
                        StepStatus::Tolerated,
                    )
                    .with_duration(duration_ms)
                    .with_error(message);
                    store.append(&tolerated).await?;
                    run.record_step(step.name(), StepStatus::Tolerated);
                }
                Err(e) => {
                    let message = e.to_string();
                    let failed = Event::new(
                        run_id,
                        Some(step.name().to_string()),
                        EventType::StepFailed,
                        format!("Step '{}' failed", step),
                        StepStatus::Failed,
                    )
                    .with_duration(duration_ms)
                    .with_error(message.clone());
                    store.append(&failed).await?;
                    run.record_step(step.name(), StepStatus::Failed);

                    error!(step = %step, error = %message, "Step failed");
                    return self
                        .handle_run_failure(&store, &mut run, format!("{}: {}", step, message))
                        .await;
                }
            }
        }

        self.complete_run(&store, &mut run).await
    }

    /// Run a single step
    async fn execute_step(
        &self,
        step: StepKind,
        ctx: &StepContext<'_>,
        session: &mut Option<Session>,
        secrets: &dyn SecretStore,
    ) -> Result<StepReport, StepError> {
        let report = match step {
            StepKind::ProvisionTools => StepReport::Outcome(provision::provision_tools(ctx).await?),
            StepKind::BrokerCredentials => {
                let bundle = steps::load_credentials(ctx.config.cloud(), secrets)?;
                let (established, outcome) = credentials::broker_credentials(ctx, bundle).await?;
                *session = Some(established);
                StepReport::Outcome(outcome)
            }
            StepKind::FetchConfig => {
                StepReport::Outcome(config_fetch::fetch_config(ctx, established(session, step)?).await?)
            }
            StepKind::PreBuildHook => {
                StepReport::Outcome(hook::run_pre_build(ctx, established(session, step)?).await?)
            }
            StepKind::NetworkAccess => StepReport::Outcome(
                network::open_database_access(
                    ctx,
                    established(session, step)?,
                    self.ip_lookup.as_ref(),
                )
                .await?,
            ),
            StepKind::RestoreCache => {
                StepReport::Cache(cache::restore_cache(ctx, established(session, step)?).await)
            }
            StepKind::Deploy => {
                StepReport::Outcome(deploy::deploy_pipeline(ctx, established(session, step)?).await?)
            }
        };

        Ok(report)
    }

    /// Journal a finished step
    async fn record_report(
        &self,
        store: &EventStore,
        run: &mut Run,
        step: StepKind,
        report: StepReport,
        duration_ms: u64,
    ) -> Result<()> {
        let step_id = Some(step.name().to_string());

        let (event, status) = match report {
            StepReport::Outcome(StepOutcome::Completed { summary, commands }) => {
                info!(step = %step, duration_ms, "Step completed");
                let mut event = Event::new(
                    run.id,
                    step_id,
                    EventType::StepCompleted,
                    summary,
                    StepStatus::Completed,
                );
                if !commands.is_empty() {
                    event = event.with_command(commands.join("; "));
                }
                (event, StepStatus::Completed)
            }
            StepReport::Outcome(StepOutcome::Skipped { reason }) => {
                info!(step = %step, %reason, "Step skipped");
                let event = Event::new(
                    run.id,
                    step_id,
                    EventType::StepSkipped,
                    reason,
                    StepStatus::Skipped,
                );
                (event, StepStatus::Skipped)
            }
            StepReport::Cache(outcome) => {
                let summary = outcome.summary();
                match outcome {
                    CacheOutcome::Restored { .. } => (
                        Event::new(
                            run.id,
                            step_id,
                            EventType::StepCompleted,
                            summary,
                            StepStatus::Completed,
                        ),
                        StepStatus::Completed,
                    ),
                    CacheOutcome::Miss => (
                        Event::new(
                            run.id,
                            step_id,
                            EventType::StepTolerated,
                            summary,
                            StepStatus::Tolerated,
                        ),
                        StepStatus::Tolerated,
                    ),
                    CacheOutcome::Error { message } => {
                        warn!(step = %step, error = %message, "Tolerated step failure");
                        (
                            Event::new(
                                run.id,
                                step_id,
                                EventType::StepTolerated,
                                summary,
                                StepStatus::Tolerated,
                            )
                            .with_error(message),
                            StepStatus::Tolerated,
                        )
                    }
                }
            }
        };

        store.append(&event.with_duration(duration_ms)).await?;
        run.record_step(step.name(), status);
        Ok(())
    }

    /// Handle a limit violation by failing the run
    async fn handle_limit_violation(
        &self,
        store: &EventStore,
        run: &mut Run,
        violation: LimitViolation,
    ) -> Result<Run> {
        error!(%violation, "Execution limit reached");
        self.handle_run_failure(store, run, violation.to_string())
            .await
    }

    /// Handle a run failure
    async fn handle_run_failure(
        &self,
        store: &EventStore,
        run: &mut Run,
        error_msg: String,
    ) -> Result<Run> {
        error!(%error_msg, "Run failed");

        run.state = RunState::Failed {
            error: error_msg.clone(),
        };
        run.completed_at = Some(chrono::Utc::now());

        let event = Event::new(
            run.id,
            None,
            EventType::RunFailed,
            format!("Run failed: {}", error_msg),
            StepStatus::Failed,
        )
        .with_error(error_msg);
        store.append(&event).await?;

        Ok(run.clone())
    }

    /// Complete a successful run
    async fn complete_run(&self, store: &EventStore, run: &mut Run) -> Result<Run> {
        info!(run_id = %run.id, "Deployment completed successfully");

        run.state = RunState::Completed;
        run.completed_at = Some(chrono::Utc::now());

        let event = Event::new(
            run.id,
            None,
            EventType::RunCompleted,
            format!("Pipeline '{}' deployed", run.pipeline_name),
            StepStatus::Completed,
        );
        store.append(&event).await?;

        Ok(run.clone())
    }

    /// Commands each step would run, without running anything
    pub fn preview(&self, config: &RunConfig, plan: &DeployPlan) -> Vec<(StepKind, Vec<String>)> {
        let cli = DatateerCli::new(self.settings.cli.clone());

        plan.steps
            .iter()
            .map(|step| {
                let commands = match step {
                    StepKind::ProvisionTools => cli
                        .install_commands(config.cli_version())
                        .iter()
                        .map(|c| c.render())
                        .collect(),
                    StepKind::BrokerCredentials => {
                        let mut commands = vec!["install SSH deploy key".to_string()];
                        if config.cloud() == CloudTarget::Gcp {
                            let key_file = PathBuf::from("<service-account.json>");
                            let gcloud = GcloudCli::new(&self.settings.tools.gcloud);
                            commands.push(gcloud.activate_service_account(&key_file).render());
                            commands.push(gcloud.print_access_token().render());
                            commands.push(
                                DockerCli::new(&self.settings.tools.docker)
                                    .login(&config.registry_host(), OAUTH2_TOKEN_USER, "")
                                    .render(),
                            );
                        }
                        commands
                    }
                    StepKind::FetchConfig => vec![cli.config_pull(config).render()],
                    StepKind::PreBuildHook => vec![hook::PRE_BUILD_SCRIPT.to_string()],
                    StepKind::NetworkAccess => {
                        let aws = AwsCli::new(&self.settings.tools.aws);
                        let network = &self.settings.network;
                        vec![
                            aws.describe_vpc(&network.vpc_name).render(),
                            aws.describe_security_group("<vpc-id>", &network.security_group_name)
                                .render(),
                            format!(
                                "{} ec2 authorize-security-group-ingress (only if the group exists)",
                                self.settings.tools.aws
                            ),
                        ]
                    }
                    StepKind::RestoreCache => {
                        vec![format!(
                            "{} load -i {}/<cache-key>.tar (best effort)",
                            self.settings.tools.docker,
                            self.settings.cache_dir.display()
                        )]
                    }
                    StepKind::Deploy => vec![cli.pipeline_deploy(config).render()],
                };
                (*step, commands)
            })
            .collect()
    }

    /// Get status of a run by ID
    pub async fn get_run_status(&self, run_id: Uuid) -> Result<Run> {
        let Some(store) = EventStore::existing(&self.settings.runs_dir(), run_id) else {
            anyhow::bail!("Run {} not found", run_id);
        };
        let events = store.replay().await?;

        if events.is_empty() {
            anyhow::bail!("Run {} not found", run_id);
        }

        Run::from_events(&events).context("Failed to reconstruct run state")
    }

    /// List recent runs
    pub async fn list_runs(&self, limit: usize) -> Result<Vec<Run>> {
        let run_ids = EventStore::list_runs(&self.settings.runs_dir()).await?;
        let mut runs = Vec::new();

        for run_id in run_ids {
            if let Ok(run) = self.get_run_status(run_id).await {
                runs.push(run);
            }
        }

        // Most recent first
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        runs.truncate(limit);

        Ok(runs)
    }
}

/// The session a step depends on, or an error if credentials never ran
fn established(session: &Option<Session>, step: StepKind) -> Result<&Session, StepError> {
    session.as_ref().ok_or_else(|| {
        StepError::Credential(format!(
            "Step '{}' requires credentials, but none were established",
            step
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_steps_after_credentials_need_a_session() {
        let err = established(&None, StepKind::FetchConfig).unwrap_err();
        assert!(matches!(err, StepError::Credential(_)));
        assert!(err.to_string().contains("fetch-config"));
    }
}
