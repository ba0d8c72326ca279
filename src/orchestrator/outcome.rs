//! Build outcome
//!
//! The normalized result of one build attempt, consumed by the reporter.

use std::path::PathBuf;

use serde::Serialize;

use super::artifacts::CollectedArtifact;
use super::machine::{StepRecord, StepState};
use crate::buildsys::{searched_descriptors, BuildSystemKind};
use crate::error::ErrorInfo;

/// Exit code for a successful build
pub const EXIT_SUCCESS: u8 = 0;
/// Exit code when a tool ran and failed
pub const EXIT_TOOL_FAILURE: u8 = 3;
/// Exit code when no build descriptor was found
pub const EXIT_DETECTION_FAILURE: u8 = 4;
/// Exit code when a tool or the fetch mechanism could not be invoked
pub const EXIT_ENVIRONMENT_FAILURE: u8 = 5;

/// Overall status of a build attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeStatus {
    Success,
    ToolFailure,
    DetectionFailure,
    EnvironmentFailure,
}

impl OutcomeStatus {
    /// Process exit code for scripting callers
    pub fn exit_code(&self) -> u8 {
        match self {
            OutcomeStatus::Success => EXIT_SUCCESS,
            OutcomeStatus::ToolFailure => EXIT_TOOL_FAILURE,
            OutcomeStatus::DetectionFailure => EXIT_DETECTION_FAILURE,
            OutcomeStatus::EnvironmentFailure => EXIT_ENVIRONMENT_FAILURE,
        }
    }

    pub fn is_success(&self) -> bool {
        *self == OutcomeStatus::Success
    }
}

impl std::fmt::Display for OutcomeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutcomeStatus::Success => write!(f, "success"),
            OutcomeStatus::ToolFailure => write!(f, "tool failure"),
            OutcomeStatus::DetectionFailure => write!(f, "detection failure"),
            OutcomeStatus::EnvironmentFailure => write!(f, "environment failure"),
        }
    }
}

/// The step that ended the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailedStep {
    /// Zero-based position in the command sequence
    pub index: usize,
    /// Number of steps in the sequence
    pub total: usize,
    pub label: String,
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl FailedStep {
    pub fn from_record(index: usize, total: usize, record: &StepRecord) -> Self {
        Self {
            index,
            total,
            label: record.step.label.clone(),
            program: record.step.program.clone(),
            args: record.step.args.clone(),
            working_dir: record.step.working_dir.clone(),
            exit_code: record.exit_code,
        }
    }

    pub fn command_line(&self) -> String {
        crate::executor::render_command(&self.program, &self.args)
    }
}

/// Per-step summary kept in the outcome
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    pub label: String,
    pub command: String,
    pub state: StepState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
    pub duration_ms: u64,
}

impl From<&StepRecord> for StepSummary {
    fn from(record: &StepRecord) -> Self {
        Self {
            label: record.step.label.clone(),
            command: record.step.command_line(),
            state: record.state,
            exit_code: record.exit_code,
            duration_ms: record.duration_ms,
        }
    }
}

/// Result of one build attempt
#[derive(Debug, Clone, Serialize)]
pub struct BuildOutcome {
    pub status: OutcomeStatus,
    pub kind: BuildSystemKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failed_step: Option<FailedStep>,
    /// The error that stopped the build before a tool could report failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    /// Combined tool output of every step that ran
    pub output: String,
    /// Hints specific to this failure (tool name, timeout, searched files)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hints: Vec<String>,
    pub steps: Vec<StepSummary>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub artifacts: Vec<CollectedArtifact>,
    /// Non-fatal problems (artifact copies, optional steps)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub duration_ms: u64,
}

impl BuildOutcome {
    /// Empty outcome with a status, to be filled in by the orchestrator
    pub fn new(status: OutcomeStatus, kind: BuildSystemKind) -> Self {
        Self {
            status,
            kind,
            failed_step: None,
            error: None,
            output: String::new(),
            hints: Vec::new(),
            steps: Vec::new(),
            artifacts: Vec::new(),
            warnings: Vec::new(),
            duration_ms: 0,
        }
    }

    /// No recognized build descriptor
    pub fn detection_failure() -> Self {
        Self::new(OutcomeStatus::DetectionFailure, BuildSystemKind::Unknown).with_hint(format!(
            "Searched the top level of the source tree for: {}",
            searched_descriptors().join(", ")
        ))
    }

    /// A tool or collaborator could not be invoked at all
    pub fn environment_failure(kind: BuildSystemKind, message: impl Into<String>) -> Self {
        Self::new(OutcomeStatus::EnvironmentFailure, kind).with_hint(message)
    }

    pub fn with_output(mut self, output: impl Into<String>) -> Self {
        self.output = output.into();
        self
    }

    pub fn with_error(mut self, error: impl Into<ErrorInfo>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hints.push(hint.into());
        self
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }

    pub fn exit_code(&self) -> u8 {
        self.status.exit_code()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildsys::BuildStep;

    #[test]
    fn test_exit_codes_are_distinct() {
        let codes = [
            OutcomeStatus::Success.exit_code(),
            OutcomeStatus::ToolFailure.exit_code(),
            OutcomeStatus::DetectionFailure.exit_code(),
            OutcomeStatus::EnvironmentFailure.exit_code(),
        ];

        assert_eq!(codes[0], 0);
        for (i, a) in codes.iter().enumerate() {
            for b in &codes[i + 1..] {
                assert_ne!(a, b);
            }
        }
        // 1 and 2 are left to internal errors and usage errors
        assert!(!codes.contains(&1));
        assert!(!codes.contains(&2));
    }

    #[test]
    fn test_detection_failure_lists_searched_files() {
        let outcome = BuildOutcome::detection_failure();

        assert_eq!(outcome.status, OutcomeStatus::DetectionFailure);
        assert_eq!(outcome.kind, BuildSystemKind::Unknown);
        assert!(outcome.steps.is_empty());
        assert!(outcome.hints[0].contains("CMakeLists.txt"));
        assert!(outcome.hints[0].contains("Makefile"));
        assert!(outcome.hints[0].contains("configure.ac"));
    }

    #[test]
    fn test_environment_failure() {
        let outcome =
            BuildOutcome::environment_failure(BuildSystemKind::CMake, "Tool not found: cmake")
                .with_output("partial");

        assert_eq!(outcome.exit_code(), EXIT_ENVIRONMENT_FAILURE);
        assert_eq!(outcome.hints, vec!["Tool not found: cmake"]);
        assert_eq!(outcome.output, "partial");
    }

    #[test]
    fn test_failed_step_from_record() {
        let record = StepRecord {
            step: BuildStep::new("make", "make", "/src").arg("-j2"),
            state: StepState::Failed,
            exit_code: Some(2),
            duration_ms: 7,
        };
        let failed = FailedStep::from_record(0, 1, &record);

        assert_eq!(failed.command_line(), "make -j2");
        assert_eq!(failed.exit_code, Some(2));

        let summary = StepSummary::from(&record);
        assert_eq!(summary.state, StepState::Failed);
        assert_eq!(summary.command, "make -j2");
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = BuildOutcome::new(OutcomeStatus::Success, BuildSystemKind::Make);
        let json = serde_json::to_string(&outcome).unwrap();

        assert!(json.contains("\"status\":\"success\""));
        assert!(json.contains("\"kind\":\"make\""));
        assert!(!json.contains("failed_step"));
        assert!(!json.contains("warnings"));
    }
}
