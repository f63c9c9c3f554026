//! Domain types for flowdeploy.
//!
//! This module contains the core data structures:
//! - RunConfig: The validated, immutable parameters of a run
//! - Credentials: Secret material, redacted when formatted
//! - Network / Cache: Security group handles and layer-cache keys
//! - Events / Run: The run journal and state reconstructed from it

pub mod cache;
pub mod credentials;
pub mod events;
pub mod network;
pub mod run;
pub mod run_config;

// Re-export commonly used types
pub use cache::{CacheKey, CacheOutcome};
pub use credentials::{CloudCredentials, CredentialBundle, Secret};
pub use events::{Event, EventType, RunHeader, StepStatus};
pub use network::{IngressRule, SecurityGroupId};
pub use run::{Run, RunState};
pub use run_config::{CloudTarget, RequiredField, RunConfig, DEFAULT_PIPELINE_NAME};
