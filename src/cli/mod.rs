//! Command-line interface for flowdeploy.
//!
//! Provides commands for deploying a pipeline, previewing a deployment,
//! checking run status, listing runs, and showing configuration.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use uuid::Uuid;

use crate::config;
use crate::core::{DeployInputs, DeployPlan, EnvSecretStore, Orchestrator};
use crate::domain::{CloudTarget, RunConfig, RunState};

/// flowdeploy - Deployment orchestrator for containerized data pipelines
#[derive(Parser, Debug)]
#[command(name = "flowdeploy")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Deploy a pipeline flow
    Deploy {
        #[command(flatten)]
        args: DeployArgs,

        /// Print the plan instead of running it
        #[arg(long)]
        dry_run: bool,
    },

    /// Resolve inputs and print the commands a deployment would run
    Plan {
        #[command(flatten)]
        args: DeployArgs,
    },

    /// Check the status of a run
    Status {
        /// Run ID (UUID)
        run_id: String,
    },

    /// List recent runs
    Runs {
        /// Maximum number of runs to show
        #[arg(short, long, default_value = "10")]
        limit: usize,
    },

    /// Show resolved configuration (debug)
    Config,
}

/// Deployment inputs; anything left out falls back to the matching secret
#[derive(Args, Debug, Clone)]
pub struct DeployArgs {
    /// Target cloud (aws or gcp)
    #[arg(long, env = "FLOWDEPLOY_CLOUD")]
    pub cloud: CloudTarget,

    /// Target environment (e.g. stg, prd)
    #[arg(long, env = "FLOWDEPLOY_ENVIRONMENT")]
    pub environment: Option<String>,

    /// Pipeline name
    #[arg(long, env = "FLOWDEPLOY_PIPELINE_NAME")]
    pub pipeline_name: Option<String>,

    /// AWS account ID or GCP project ID
    #[arg(long, env = "FLOWDEPLOY_ACCOUNT_ID")]
    pub account_id: Option<String>,

    /// Cloud region
    #[arg(long, env = "FLOWDEPLOY_REGION")]
    pub region: Option<String>,

    /// Client code
    #[arg(long, env = "FLOWDEPLOY_CLIENT_CODE")]
    pub client_code: Option<String>,

    /// Pin the deployment CLI to this version
    #[arg(long, env = "FLOWDEPLOY_CLI_VERSION")]
    pub cli_version: Option<String>,

    /// Repository checkout to deploy from (defaults to the current directory)
    #[arg(long, env = "FLOWDEPLOY_WORKSPACE")]
    pub workspace: Option<PathBuf>,

    /// Assume the deployment CLI is already installed
    #[arg(long, env = "FLOWDEPLOY_SKIP_PROVISION")]
    pub skip_provision: bool,
}

impl DeployArgs {
    pub fn inputs(&self) -> DeployInputs {
        DeployInputs {
            environment: self.environment.clone(),
            pipeline_name: self.pipeline_name.clone(),
            account_id: self.account_id.clone(),
            region: self.region.clone(),
            client_code: self.client_code.clone(),
            cli_version: self.cli_version.clone(),
        }
    }

    fn workspace(&self) -> Result<PathBuf> {
        match &self.workspace {
            Some(path) => Ok(path.clone()),
            None => std::env::current_dir().context("Failed to determine current directory"),
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub async fn execute(self) -> Result<()> {
        match self.command {
            Commands::Deploy { args, dry_run } => {
                if dry_run {
                    show_plan(&args)
                } else {
                    deploy(&args).await
                }
            }
            Commands::Plan { args } => show_plan(&args),
            Commands::Status { run_id } => show_status(&run_id).await,
            Commands::Runs { limit } => list_runs(limit).await,
            Commands::Config => show_config(),
        }
    }
}

/// Resolve inputs and check preconditions; nothing runs if this fails
fn prepare(args: &DeployArgs) -> Result<(RunConfig, DeployPlan)> {
    let run_config = Orchestrator::prepare(args.cloud, &args.inputs(), &EnvSecretStore)?;
    let plan = DeployPlan::for_cloud(run_config.cloud(), !args.skip_provision);
    Ok((run_config, plan))
}

/// Run a deployment
async fn deploy(args: &DeployArgs) -> Result<()> {
    let (run_config, plan) = prepare(args)?;

    let settings = config::config()?.clone();
    let orchestrator = Orchestrator::new(settings, args.workspace()?)?;
    let run = orchestrator
        .run_deployment(&run_config, &plan, &EnvSecretStore)
        .await?;

    match &run.state {
        RunState::Completed => {
            eprintln!(
                "\n[Run {} completed: pipeline '{}' deployed to {}]",
                run.id,
                run_config.pipeline_name(),
                run_config.environment()
            );
        }
        RunState::Failed { error } => {
            eprintln!("\n[Run {} failed: {}]", run.id, error);
            std::process::exit(1);
        }
        RunState::Running => {
            eprintln!("\n[Run {} in state: {:?}]", run.id, run.state);
        }
    }

    Ok(())
}

/// Print the resolved configuration and the commands each step would run
fn show_plan(args: &DeployArgs) -> Result<()> {
    let (run_config, plan) = prepare(args)?;

    let settings = config::config()?.clone();
    let orchestrator = Orchestrator::new(settings, args.workspace()?)?;

    println!("Pipeline:    {}", run_config.pipeline_name());
    println!("Environment: {}", run_config.environment());
    println!("Cloud:       {}", run_config.cloud());
    println!("Account:     {}", run_config.account_id());
    println!("Region:      {}", run_config.region());
    println!("Client:      {}", run_config.client_code());
    println!(
        "CLI version: {}",
        run_config.cli_version().unwrap_or("latest")
    );
    println!();
    println!("Steps:");

    for (index, (step, commands)) in orchestrator
        .preview(&run_config, &plan)
        .into_iter()
        .enumerate()
    {
        println!("  {}. {} - {}", index + 1, step, step.description());
        for command in commands {
            println!("       $ {}", command);
        }
    }

    Ok(())
}

/// Show the status of a run
async fn show_status(run_id_str: &str) -> Result<()> {
    let run_id = Uuid::parse_str(run_id_str)
        .with_context(|| format!("Invalid run ID: {}", run_id_str))?;

    let settings = config::config()?.clone();
    let orchestrator = Orchestrator::new(settings, PathBuf::from("."))?;
    let run = orchestrator.get_run_status(run_id).await?;

    println!("Run ID: {}", run.id);
    println!("Pipeline: {}", run.pipeline_name);
    println!("Environment: {}", run.environment);
    if let Some(cloud) = run.cloud {
        println!("Cloud: {}", cloud);
    }
    println!("State: {:?}", run.state);
    println!("Started: {}", run.started_at);
    if let Some(completed) = run.completed_at {
        println!("Completed: {}", completed);
    }
    println!("Current step: {}", run.current_step);
    println!("\nStep statuses:");
    for step in &run.step_order {
        println!("  {}: {:?}", step, run.step_status(step));
    }

    Ok(())
}

/// List recent runs
async fn list_runs(limit: usize) -> Result<()> {
    let settings = config::config()?.clone();
    let orchestrator = Orchestrator::new(settings, PathBuf::from("."))?;
    let runs = orchestrator.list_runs(limit).await?;

    if runs.is_empty() {
        println!("No runs found");
        return Ok(());
    }

    println!(
        "{:<38} {:<16} {:<8} {:<6} {:<10}",
        "RUN ID", "PIPELINE", "ENV", "CLOUD", "STATE"
    );
    println!("{}", "-".repeat(82));

    for run in runs {
        let state_str = match &run.state {
            RunState::Running => "running",
            RunState::Completed => "completed",
            RunState::Failed { .. } => "failed",
        };
        let cloud = run.cloud.map(|c| c.to_string()).unwrap_or_default();
        println!(
            "{:<38} {:<16} {:<8} {:<6} {:<10}",
            run.id, run.pipeline_name, run.environment, cloud, state_str
        );
    }

    Ok(())
}

/// Show the resolved configuration
fn show_config() -> Result<()> {
    let cfg = config::config()?;

    println!("flowdeploy configuration");
    println!("========================");
    println!();
    println!(
        "Config file: {}",
        cfg.config_file
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(none - using defaults)".to_string())
    );
    println!();
    println!("Paths:");
    println!("  Home:        {}", cfg.home.display());
    println!("  Runs:        {}", cfg.runs_dir().display());
    println!("  Layer cache: {}", cfg.cache_dir.display());
    println!();
    println!("Deployment CLI:");
    println!("  Binary:          {}", cfg.cli.binary);
    println!("  Package:         {}[{}]", cfg.cli.package, cfg.cli.visualization_extra);
    println!("  Installer:       {}", cfg.cli.pip);
    if cfg.cli.install_system_packages {
        println!("  System packages: {}", cfg.cli.system_packages.join(", "));
    } else {
        println!("  System packages: (not installed)");
    }
    println!();
    println!("Layer cache hash globs:");
    for pattern in &cfg.cache.hash_globs {
        println!("  {}", pattern);
    }
    println!();
    println!("Tools:");
    println!("  aws:    {}", cfg.tools.aws);
    println!("  gcloud: {}", cfg.tools.gcloud);
    println!("  docker: {}", cfg.tools.docker);
    println!();
    println!("Network access (AWS):");
    println!("  IP endpoint:    {}", cfg.network.ip_endpoint);
    println!("  VPC name:       {}", cfg.network.vpc_name);
    println!("  Security group: {}", cfg.network.security_group_name);
    println!();
    println!("Limits:");
    println!("  Step timeout:   {}s", cfg.limits.step_timeout_seconds);
    println!("  Deploy timeout: {}s", cfg.limits.deploy_timeout_seconds);
    println!("  Run timeout:    {}s", cfg.limits.run_timeout_seconds);

    Ok(())
}
