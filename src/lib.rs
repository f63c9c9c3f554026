//! flowdeploy - Deployment orchestrator for containerized data pipelines
//!
//! Resolves deployment parameters, brokers cloud credentials, and drives
//! the `datateer` CLI through a fixed sequence of steps that ends with the
//! pipeline flow registered on the orchestration service.
//!
//! # Architecture
//!
//! - Parameters are resolved and validated before anything runs
//! - Steps execute strictly in order; the first fatal error stops the run
//! - Every transition is recorded in an append-only run journal
//! - Run-scoped state (credentials, environment) lives in an explicit
//!   `Session` that is dropped at the end of the run
//!
//! # Modules
//!
//! - `adapters`: External commands (datateer, aws, gcloud, docker) and the process runner
//! - `core`: Orchestration logic (Resolver, Preconditions, Steps, EventStore)
//! - `domain`: Data structures (RunConfig, Credentials, Event, Run)
//! - `cli`: Command-line interface
//!
//! # Usage
//!
//! ```bash
//! # Deploy the main pipeline to staging on AWS
//! flowdeploy deploy --cloud aws --environment stg
//!
//! # Show what would run
//! flowdeploy plan --cloud gcp --environment prd
//!
//! # Check run status
//! flowdeploy status <run-id>
//! ```

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;

// Re-export main types at crate root for convenience
pub use core::Orchestrator;
pub use domain::{CloudTarget, Event, EventType, Run, RunConfig, RunState};
