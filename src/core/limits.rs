//! Execution limits for deployment runs.
//!
//! Every external command runs under a per-step timeout, and the run as a
//! whole is bounded by a wall-clock limit checked between steps.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::pipeline::StepKind;

/// Timeouts applied while running a plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionLimits {
    /// Per-command timeout in seconds (default: 1800 = 30 min)
    #[serde(default = "default_step_timeout")]
    pub step_timeout_seconds: u64,

    /// Timeout for the deploy command, which builds and pushes the image
    /// (default: 3600 = 1 hour)
    #[serde(default = "default_deploy_timeout")]
    pub deploy_timeout_seconds: u64,

    /// Total run timeout in seconds (default: 7200 = 2 hours)
    #[serde(default = "default_run_timeout")]
    pub run_timeout_seconds: u64,
}

fn default_step_timeout() -> u64 {
    1800
}
fn default_deploy_timeout() -> u64 {
    3600
}
fn default_run_timeout() -> u64 {
    7200
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            step_timeout_seconds: default_step_timeout(),
            deploy_timeout_seconds: default_deploy_timeout(),
            run_timeout_seconds: default_run_timeout(),
        }
    }
}

impl ExecutionLimits {
    /// Timeout for commands issued by a step
    pub fn timeout_for(&self, step: StepKind) -> Duration {
        let seconds = match step {
            StepKind::Deploy => self.deploy_timeout_seconds,
            _ => self.step_timeout_seconds,
        };
        Duration::from_secs(seconds)
    }

    /// Check the run clock before starting another step
    pub fn check(&self, tracker: &RunTracker) -> Result<(), LimitViolation> {
        let elapsed = tracker.elapsed_seconds();
        if elapsed >= self.run_timeout_seconds {
            return Err(LimitViolation::RunTimeout {
                elapsed_seconds: elapsed,
                limit_seconds: self.run_timeout_seconds,
                steps_executed: tracker.steps_executed,
            });
        }
        Ok(())
    }
}

/// Tracks progress during a run
#[derive(Debug, Clone)]
pub struct RunTracker {
    /// Number of steps executed
    pub steps_executed: u32,

    /// When the run started
    pub started_at: Instant,
}

impl Default for RunTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RunTracker {
    pub fn new() -> Self {
        Self {
            steps_executed: 0,
            started_at: Instant::now(),
        }
    }

    pub fn record_step(&mut self) {
        self.steps_executed += 1;
    }

    pub fn elapsed_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}

/// Limit violation errors
#[derive(Debug, Clone, Error)]
pub enum LimitViolation {
    #[error("Run timeout after {steps_executed} steps: {elapsed_seconds}s >= {limit_seconds}s")]
    RunTimeout {
        elapsed_seconds: u64,
        limit_seconds: u64,
        steps_executed: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_limits() {
        let limits = ExecutionLimits::default();
        assert_eq!(limits.step_timeout_seconds, 1800);
        assert_eq!(limits.run_timeout_seconds, 7200);
    }

    #[test]
    fn test_deploy_gets_its_own_timeout() {
        let limits = ExecutionLimits {
            step_timeout_seconds: 10,
            deploy_timeout_seconds: 99,
            ..Default::default()
        };

        assert_eq!(limits.timeout_for(StepKind::FetchConfig), Duration::from_secs(10));
        assert_eq!(limits.timeout_for(StepKind::Deploy), Duration::from_secs(99));
    }

    #[test]
    fn test_run_timeout() {
        let limits = ExecutionLimits {
            run_timeout_seconds: 0,
            ..Default::default()
        };

        let result = limits.check(&RunTracker::new());
        assert!(matches!(result, Err(LimitViolation::RunTimeout { .. })));

        assert!(ExecutionLimits::default().check(&RunTracker::new()).is_ok());
    }

    #[test]
    fn test_run_timeout_reports_completed_steps() {
        let limits = ExecutionLimits {
            run_timeout_seconds: 0,
            ..Default::default()
        };
        let mut tracker = RunTracker::new();
        tracker.record_step();
        tracker.record_step();

        let violation = limits.check(&tracker).unwrap_err();
        assert!(matches!(
            violation,
            LimitViolation::RunTimeout { steps_executed: 2, .. }
        ));
        assert!(violation.to_string().starts_with("Run timeout after 2 steps"));
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let limits: ExecutionLimits = serde_yaml::from_str("step_timeout_seconds: 60").unwrap();
        assert_eq!(limits.step_timeout_seconds, 60);
        assert_eq!(limits.deploy_timeout_seconds, 3600);
    }
}
