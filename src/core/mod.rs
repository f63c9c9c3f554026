//! Core orchestration logic.
//!
//! This module contains:
//! - Resolver: Inputs merged with the secret store
//! - Preconditions: Required field validation
//! - Pipeline: The fixed step plan per cloud
//! - Steps: One module per deployment step
//! - EventStore: Append-only run journal
//! - Limits: Timeouts and enforcement
//! - Orchestrator: Main execution engine

pub mod event_store;
pub mod limits;
pub mod orchestrator;
pub mod pipeline;
pub mod preconditions;
pub mod resolver;
pub mod steps;

// Re-export commonly used types
pub use event_store::EventStore;
pub use limits::{ExecutionLimits, LimitViolation, RunTracker};
pub use orchestrator::Orchestrator;
pub use pipeline::{DeployPlan, FailurePolicy, StepKind};
pub use preconditions::PreconditionError;
pub use resolver::{DeployInputs, EnvSecretStore, MemorySecretStore, ResolvedParameters, SecretStore};
pub use steps::{Session, StepContext, StepError, StepOutcome};
