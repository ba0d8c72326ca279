//! Outcome reporting
//!
//! Turns a [`BuildOutcome`] into a leveled report that a person can act on:
//! a one-line summary, the failing command with workspace paths shortened,
//! the tail of the captured output, and remediation hints.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::buildsys::BuildSystemKind;
use crate::error::{suggest_fixes, ErrorInfo};
use crate::orchestrator::{
    ArtifactKind, BuildOutcome, CollectedArtifact, OutcomeStatus, StepSummary,
};
use crate::workspace::Project;

/// Default number of output lines kept in a report
pub const DEFAULT_TAIL_LINES: usize = 50;

/// Options controlling report construction
#[derive(Debug, Clone)]
pub struct ReportOptions {
    /// Number of trailing output lines to keep
    pub tail_lines: usize,
    /// Absolute paths replaced by a placeholder in the failing command
    pub redactions: Vec<(PathBuf, String)>,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self::new(DEFAULT_TAIL_LINES)
    }
}

impl ReportOptions {
    pub fn new(tail_lines: usize) -> Self {
        Self {
            tail_lines,
            redactions: Vec::new(),
        }
    }

    /// Redact the project's tiers and the workspace root
    pub fn for_project(project: &Project, workspace_root: &Path, tail_lines: usize) -> Self {
        Self {
            tail_lines,
            redactions: vec![
                (project.source_dir.clone(), "<source>".to_string()),
                (project.build_dir.clone(), "<build>".to_string()),
                (project.output_dir.clone(), "<output>".to_string()),
                (workspace_root.to_path_buf(), "<workspace>".to_string()),
            ],
        }
    }

    /// Replace known absolute paths, longest first
    pub fn redact(&self, text: &str) -> String {
        let mut redactions: Vec<(String, &str)> = self
            .redactions
            .iter()
            .map(|(path, placeholder)| (path.to_string_lossy().into_owned(), placeholder.as_str()))
            .filter(|(path, _)| !path.is_empty())
            .collect();
        redactions.sort_by(|a, b| b.0.len().cmp(&a.0.len()));

        let mut text = text.to_string();
        for (path, placeholder) in redactions {
            text = text.replace(&path, placeholder);
        }
        text
    }
}

/// Severity of a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

/// A rendered-ready build report
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub level: ReportLevel,
    pub status: OutcomeStatus,
    pub kind: BuildSystemKind,
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failing_command: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
    pub output_tail: Vec<String>,
    pub hints: Vec<String>,
    pub warnings: Vec<String>,
    pub artifacts: Vec<CollectedArtifact>,
    pub steps: Vec<StepSummary>,
    pub exit_code: u8,
    pub duration_ms: u64,
}

/// Build a report from an outcome
///
/// Total over every outcome: no I/O, no panics.
pub fn build_report(outcome: &BuildOutcome, options: &ReportOptions) -> Report {
    let level = match outcome.status {
        OutcomeStatus::Success if outcome.warnings.is_empty() => ReportLevel::Info,
        OutcomeStatus::Success => ReportLevel::Warning,
        _ => ReportLevel::Error,
    };

    let failing_command = outcome
        .failed_step
        .as_ref()
        .map(|step| options.redact(&step.command_line()));

    let mut hints: Vec<String> = Vec::new();
    let mut push = |hint: String| {
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    };
    for hint in &outcome.hints {
        push(options.redact(hint));
    }
    if let Some(hint) = status_hint(outcome.status) {
        push(hint.to_string());
    }
    if !outcome.is_success() {
        let command = failing_command.as_deref().unwrap_or_default();
        for hint in suggest_fixes(command, &outcome.output) {
            push(hint);
        }
    }

    Report {
        level,
        status: outcome.status,
        kind: outcome.kind,
        summary: summary(outcome),
        failing_command,
        error: outcome.error.clone(),
        output_tail: tail(&outcome.output, options.tail_lines),
        hints,
        warnings: outcome.warnings.clone(),
        artifacts: outcome.artifacts.clone(),
        steps: outcome.steps.clone(),
        exit_code: outcome.exit_code(),
        duration_ms: outcome.duration_ms,
    }
}

fn summary(outcome: &BuildOutcome) -> String {
    match outcome.status {
        OutcomeStatus::Success => format!(
            "Build succeeded with {} ({} artifact{})",
            outcome.kind,
            outcome.artifacts.len(),
            if outcome.artifacts.len() == 1 { "" } else { "s" }
        ),
        OutcomeStatus::ToolFailure => match outcome.failed_step {
            Some(ref step) => {
                let result = match step.exit_code {
                    Some(code) => format!("exited with code {}", code),
                    None => "did not complete".to_string(),
                };
                format!(
                    "Build failed: step {}/{} ({}) {}",
                    step.index + 1,
                    step.total,
                    step.label,
                    result
                )
            }
            None => "Build failed".to_string(),
        },
        OutcomeStatus::DetectionFailure => "No supported build system found".to_string(),
        OutcomeStatus::EnvironmentFailure => match outcome.error {
            Some(ref error) => format!("Build could not run: {}", error.message),
            None => "Build could not run: the build environment is incomplete".to_string(),
        },
    }
}

fn status_hint(status: OutcomeStatus) -> Option<&'static str> {
    match status {
        OutcomeStatus::Success => None,
        OutcomeStatus::ToolFailure => Some(
            "The failing command can be rerun by hand from its working directory to inspect the full output.",
        ),
        OutcomeStatus::DetectionFailure => Some(
            "Check the repository URL and branch, or add a CMakeLists.txt, configure script or Makefile.",
        ),
        OutcomeStatus::EnvironmentFailure => {
            Some("Run 'cbuilder doctor' to check that the required tools are installed.")
        }
    }
}

/// The last `n` lines of `output`
fn tail(output: &str, n: usize) -> Vec<String> {
    let lines: Vec<&str> = output.lines().collect();
    let start = lines.len().saturating_sub(n);
    lines[start..].iter().map(|l| l.to_string()).collect()
}

impl Report {
    /// Human-readable, colored rendering
    pub fn render_text(&self) -> String {
        let mut out = String::new();

        let marker = match self.level {
            ReportLevel::Info => "✓".green().bold(),
            ReportLevel::Warning => "✓".yellow().bold(),
            ReportLevel::Error => "✗".red().bold(),
        };
        let summary = match self.level {
            ReportLevel::Error => self.summary.red().bold(),
            _ => self.summary.green().bold(),
        };
        out.push_str(&format!("{} {}\n", marker, summary));

        if let Some(ref command) = self.failing_command {
            out.push_str(&format!("  {}: {}\n", "command".cyan(), command));
        }

        if !self.is_success() && !self.output_tail.is_empty() {
            out.push_str(&format!(
                "\n{}\n",
                format!("Last {} lines of output:", self.output_tail.len()).cyan()
            ));
            for line in &self.output_tail {
                out.push_str(&format!("  {}\n", line));
            }
        }

        if !self.artifacts.is_empty() {
            out.push_str(&format!("\n{}:\n", "Artifacts".cyan()));
            for artifact in &self.artifacts {
                let kind = match artifact.kind {
                    ArtifactKind::Executable => "executable",
                    ArtifactKind::Library => "library",
                };
                out.push_str(&format!(
                    "  {:10}  {}\n",
                    kind,
                    artifact.relative_path.display()
                ));
            }
        }

        if !self.warnings.is_empty() {
            out.push_str(&format!("\n{}:\n", "Warnings".yellow()));
            for warning in &self.warnings {
                out.push_str(&format!("  - {}\n", warning));
            }
        }

        if !self.hints.is_empty() {
            out.push_str(&format!("\n{}:\n", "Hints".cyan()));
            for hint in &self.hints {
                out.push_str(&format!("  - {}\n", hint));
            }
        }

        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}
