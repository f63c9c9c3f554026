//! Journal events for deployment runs.
//!
//! Every step transition is recorded as an immutable event in an
//! append-only log. Payloads are human-readable summaries and must never
//! contain secret material.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::run_config::CloudTarget;

/// What a run deploys, recorded once on `RunStarted`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunHeader {
    pub pipeline_name: String,
    pub environment: String,
    pub cloud: CloudTarget,
}

/// A single event in the run journal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique identifier for this event
    pub id: Uuid,

    /// When this event occurred (ISO 8601)
    pub timestamp: DateTime<Utc>,

    /// The run this event belongs to
    pub run_id: Uuid,

    /// Step name (if applicable)
    pub step_id: Option<String>,

    /// Type of event
    pub event_type: EventType,

    /// Human-readable summary (NO secrets)
    pub payload_summary: String,

    /// Current status of the step/run
    pub status: StepStatus,

    /// Run identity (only on `RunStarted`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<RunHeader>,

    /// Rendered command line, if the step ran one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<String>,

    /// Time taken in milliseconds (for finished steps)
    pub duration_ms: Option<u64>,

    /// Error message if failed
    pub error: Option<String>,
}

impl Event {
    /// Create a new event with the current timestamp
    pub fn new(
        run_id: Uuid,
        step_id: Option<String>,
        event_type: EventType,
        payload_summary: String,
        status: StepStatus,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            run_id,
            step_id,
            event_type,
            payload_summary,
            status,
            header: None,
            command: None,
            duration_ms: None,
            error: None,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    pub fn with_error(mut self, error: String) -> Self {
        self.error = Some(error);
        self
    }

    pub fn with_command(mut self, command: String) -> Self {
        self.command = Some(command);
        self
    }

    pub fn with_header(mut self, header: RunHeader) -> Self {
        self.header = Some(header);
        self
    }
}

/// Types of events that can occur during a deployment run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Parameters resolved and preconditions passed; the run is underway
    RunStarted,

    /// All steps finished and the flow was deployed
    RunCompleted,

    /// A fatal error stopped the run
    RunFailed,

    StepStarted,

    StepCompleted,

    /// A conditional step found nothing to do
    StepSkipped,

    /// A best-effort step failed or missed; the run continues
    StepTolerated,

    StepFailed,
}

/// Status of a step or run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    /// Not yet started
    Pending,

    /// Currently executing
    Running,

    /// Completed successfully
    Completed,

    /// Failed (with error)
    Failed,

    /// Skipped (condition not met)
    Skipped,

    /// Failed without affecting the run
    Tolerated,
}

impl Default for StepStatus {
    fn default() -> Self {
        Self::Pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization() {
        let event = Event::new(
            Uuid::new_v4(),
            Some("deploy".to_string()),
            EventType::StepStarted,
            "Starting deploy step".to_string(),
            StepStatus::Running,
        );

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.event_type, EventType::StepStarted);
        assert_eq!(parsed.status, StepStatus::Running);
        assert!(!json.contains("\"command\""));
        assert!(!json.contains("\"header\""));
    }

    #[test]
    fn test_header_survives_round_trip_verbatim() {
        let header = RunHeader {
            pipeline_name: "daily sync environment=prd".to_string(),
            environment: "stg".to_string(),
            cloud: CloudTarget::Aws,
        };
        let event = Event::new(
            Uuid::new_v4(),
            None,
            EventType::RunStarted,
            "Run started".to_string(),
            StepStatus::Running,
        )
        .with_header(header.clone());

        let json = serde_json::to_string(&event).unwrap();
        let parsed: Event = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.header, Some(header));
    }

    #[test]
    fn test_event_builders() {
        let event = Event::new(
            Uuid::new_v4(),
            Some("fetch-config".to_string()),
            EventType::StepFailed,
            "Failed".to_string(),
            StepStatus::Failed,
        )
        .with_duration(1500)
        .with_command("datateer config pull --environment stg --cloud aws".to_string())
        .with_error("exit code 2".to_string());

        assert_eq!(event.duration_ms, Some(1500));
        assert_eq!(event.error, Some("exit code 2".to_string()));
        assert!(event.command.unwrap().starts_with("datateer config pull"));
    }
}
