//! Run state and reconstruction from events.
//!
//! A Run represents a single deployment of one pipeline flow.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::events::{Event, EventType, RunHeader, StepStatus};
use super::run_config::CloudTarget;

/// A deployment run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    /// Unique identifier for this run
    pub id: Uuid,

    /// Name of the pipeline flow being deployed
    pub pipeline_name: String,

    /// Target environment (e.g. `stg`)
    pub environment: String,

    /// Cloud target (unknown when reconstructed from an empty journal)
    pub cloud: Option<CloudTarget>,

    /// Current state of the run
    pub state: RunState,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When the run finished (if applicable)
    pub completed_at: Option<DateTime<Utc>>,

    /// Number of steps that have finished (completed, skipped or tolerated)
    pub current_step: usize,

    /// Status of each step (step_name -> status)
    pub step_statuses: HashMap<String, StepStatus>,

    /// Step names in the order they first appeared
    pub step_order: Vec<String>,
}

impl Run {
    /// Create a new run
    pub fn new(id: Uuid, pipeline_name: String, environment: String, cloud: CloudTarget) -> Self {
        Self {
            id,
            pipeline_name,
            environment,
            cloud: Some(cloud),
            state: RunState::Running,
            started_at: Utc::now(),
            completed_at: None,
            current_step: 0,
            step_statuses: HashMap::new(),
            step_order: Vec::new(),
        }
    }

    /// Reconstruct run state from a sequence of events
    pub fn from_events(events: &[Event]) -> Option<Self> {
        let first_event = events.first()?;

        let mut run = Self {
            id: first_event.run_id,
            pipeline_name: String::new(),
            environment: String::new(),
            cloud: None,
            state: RunState::Running,
            started_at: first_event.timestamp,
            completed_at: None,
            current_step: 0,
            step_statuses: HashMap::new(),
            step_order: Vec::new(),
        };

        for event in events {
            run.apply_event(event);
        }

        Some(run)
    }

    /// Apply a single event to update run state
    pub fn apply_event(&mut self, event: &Event) {
        match event.event_type {
            EventType::RunStarted => {
                self.state = RunState::Running;
                self.started_at = event.timestamp;
                if let Some(header) = &event.header {
                    self.pipeline_name = header.pipeline_name.clone();
                    self.environment = header.environment.clone();
                    self.cloud = Some(header.cloud);
                }
            }
            EventType::RunCompleted => {
                self.state = RunState::Completed;
                self.completed_at = Some(event.timestamp);
            }
            EventType::RunFailed => {
                self.state = RunState::Failed {
                    error: event.error.clone().unwrap_or_default(),
                };
                self.completed_at = Some(event.timestamp);
            }
            EventType::StepStarted => self.set_step(event, StepStatus::Running, false),
            EventType::StepCompleted => self.set_step(event, StepStatus::Completed, true),
            EventType::StepSkipped => self.set_step(event, StepStatus::Skipped, true),
            EventType::StepTolerated => self.set_step(event, StepStatus::Tolerated, true),
            EventType::StepFailed => self.set_step(event, StepStatus::Failed, false),
        }
    }

    fn set_step(&mut self, event: &Event, status: StepStatus, finished: bool) {
        if let Some(ref step_id) = event.step_id {
            if !self.step_statuses.contains_key(step_id) {
                self.step_order.push(step_id.clone());
            }
            self.step_statuses.insert(step_id.clone(), status);
            if finished {
                self.current_step += 1;
            }
        }
    }

    /// Record a step status change directly (used while executing)
    pub fn record_step(&mut self, step_name: &str, status: StepStatus) {
        if !self.step_statuses.contains_key(step_name) {
            self.step_order.push(step_name.to_string());
        }
        self.step_statuses.insert(step_name.to_string(), status);
        if matches!(
            status,
            StepStatus::Completed | StepStatus::Skipped | StepStatus::Tolerated
        ) {
            self.current_step += 1;
        }
    }

    /// Check if the run is still in progress
    pub fn is_running(&self) -> bool {
        matches!(self.state, RunState::Running)
    }

    pub fn succeeded(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    /// Status of a step, `Pending` if it never started
    pub fn step_status(&self, step_name: &str) -> StepStatus {
        self.step_statuses
            .get(step_name)
            .copied()
            .unwrap_or_default()
    }
}

/// State of a deployment run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum RunState {
    /// Currently executing
    Running,

    /// Deployed successfully
    Completed,

    /// Stopped by a fatal error
    Failed { error: String },
}

impl Default for RunState {
    fn default() -> Self {
        Self::Running
    }
}
