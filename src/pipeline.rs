//! Build pipeline
//!
//! Workspace -> Fetch -> Detect -> Orchestrate. Every stage failure is
//! folded into the returned [`BuildOutcome`], so callers always get
//! something to report.

use std::path::Path;

use crate::buildsys::{detect_build_system, BuildSystemKind, DetectionResult};
use crate::fetch::SourceFetcher;
use crate::orchestrator::{BuildOutcome, Orchestrator, StepRunner};
use crate::report::ReportOptions;
use crate::workspace::{Project, Workspace};

/// Result of one pipeline run
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// `None` when no project could be derived from the URL
    pub project: Option<Project>,
    /// `None` when the pipeline stopped before detection
    pub detection: Option<DetectionResult>,
    pub outcome: BuildOutcome,
}

impl PipelineRun {
    /// Report options redacting this run's paths
    pub fn report_options(&self, workspace_root: &Path, tail_lines: usize) -> ReportOptions {
        match self.project {
            Some(ref project) => ReportOptions::for_project(project, workspace_root, tail_lines),
            None => ReportOptions::new(tail_lines),
        }
    }
}

/// The full fetch-and-build pipeline for one repository
pub struct Pipeline<R: StepRunner> {
    workspace: Workspace,
    fetcher: Box<dyn SourceFetcher>,
    orchestrator: Orchestrator<R>,
    clean: bool,
}

impl<R: StepRunner> Pipeline<R> {
    pub fn new(
        workspace: Workspace,
        fetcher: Box<dyn SourceFetcher>,
        orchestrator: Orchestrator<R>,
    ) -> Self {
        Self {
            workspace,
            fetcher,
            orchestrator,
            clean: false,
        }
    }

    /// Empty the build and output tiers before building
    pub fn with_clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn run(&self, url: &str, branch: Option<&str>) -> PipelineRun {
        let project = match self.workspace.project(url, branch) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!("{}", e);
                return PipelineRun {
                    project: None,
                    detection: None,
                    outcome: BuildOutcome::environment_failure(
                        BuildSystemKind::Unknown,
                        e.to_string(),
                    )
                    .with_error(&e),
                };
            }
        };

        tracing::info!("Preparing workspace for {}", project.name);
        let prepared = self.workspace.prepare(&project).and_then(|()| {
            if self.clean {
                self.workspace.clean(&project)
            } else {
                Ok(())
            }
        });
        if let Err(e) = prepared {
            tracing::warn!("{}", e);
            return PipelineRun {
                outcome: BuildOutcome::environment_failure(BuildSystemKind::Unknown, e.to_string())
                    .with_error(&e),
                project: Some(project),
                detection: None,
            };
        }

        let source_dir = match self.fetcher.fetch(&project).await {
            Ok(dir) => dir,
            Err(e) => {
                tracing::warn!("Fetch failed: {}", e);
                return PipelineRun {
                    outcome: BuildOutcome::environment_failure(
                        BuildSystemKind::Unknown,
                        e.to_string(),
                    )
                    .with_output(e.output())
                    .with_error(&e),
                    project: Some(project),
                    detection: None,
                };
            }
        };

        let detection = detect_build_system(&source_dir);
        tracing::info!("Detected {} in {}", detection.kind, source_dir.display());

        let outcome = self.orchestrator.build(&project, detection.kind).await;

        PipelineRun {
            project: Some(project),
            detection: Some(detection),
            outcome,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buildsys::BuildStep;
    use crate::config::Config;
    use crate::error::{BuildError, FetchError};
    use crate::executor::ExecResult;
    use crate::fetch::LocalSource;
    use crate::orchestrator::OutcomeStatus;
    use crate::platform::PlatformCapabilities;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;
    use std::time::Duration;
    use tempfile::TempDir;

    struct AlwaysSucceeds;

    #[async_trait]
    impl StepRunner for AlwaysSucceeds {
        async fn run_step(&self, _step: &BuildStep) -> Result<ExecResult, BuildError> {
            Ok(ExecResult {
                success: true,
                exit_code: Some(0),
                output: String::new(),
                truncated: false,
                duration: Duration::ZERO,
            })
        }
    }

    struct FailingFetcher;

    #[async_trait]
    impl SourceFetcher for FailingFetcher {
        async fn fetch(&self, _project: &Project) -> Result<PathBuf, FetchError> {
            Err(FetchError::CommandFailed {
                command: "git clone https://example.com/demo.git".to_string(),
                exit_code: Some(128),
                output: "fatal: repository not found\n".to_string(),
            })
        }
    }

    fn pipeline(root: &Path, fetcher: Box<dyn SourceFetcher>) -> Pipeline<AlwaysSucceeds> {
        let orchestrator =
            Orchestrator::new(PlatformCapabilities::unix(), Config::default(), AlwaysSucceeds);
        Pipeline::new(Workspace::new(root), fetcher, orchestrator)
    }

    #[tokio::test]
    async fn test_no_descriptor_is_detection_failure() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source/demo");
        fs::create_dir_all(&source).unwrap();
        fs::write(source.join("main.c"), "int main(void){return 0;}").unwrap();

        let run = pipeline(root.path(), Box::new(LocalSource))
            .run("https://example.com/demo.git", None)
            .await;

        assert_eq!(run.outcome.status, OutcomeStatus::DetectionFailure);
        assert_eq!(run.detection.unwrap().kind, BuildSystemKind::Unknown);
        let output = root.path().join("output/demo");
        assert!(output.is_dir());
        assert_eq!(fs::read_dir(output).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_is_environment_failure() {
        let root = TempDir::new().unwrap();

        let run = pipeline(root.path(), Box::new(FailingFetcher))
            .run("https://example.com/demo.git", Some("main"))
            .await;

        assert_eq!(run.outcome.status, OutcomeStatus::EnvironmentFailure);
        assert!(run.detection.is_none());
        assert!(run.outcome.output.contains("repository not found"));
        assert_eq!(run.outcome.error.unwrap().error_type, "fetch_failed");
        assert_eq!(run.project.unwrap().branch.as_deref(), Some("main"));
    }

    #[tokio::test]
    async fn test_invalid_url_is_environment_failure() {
        let root = TempDir::new().unwrap();

        let run = pipeline(root.path(), Box::new(LocalSource)).run("/", None).await;

        assert_eq!(run.outcome.status, OutcomeStatus::EnvironmentFailure);
        assert!(run.project.is_none());
        assert_eq!(
            run.outcome.error.unwrap().error_type,
            "invalid_project_name"
        );
    }

    #[tokio::test]
    async fn test_clean_empties_output_before_building() {
        let root = TempDir::new().unwrap();
        let source = root.path().join("source/demo");
        let output = root.path().join("output/demo");
        fs::create_dir_all(&source).unwrap();
        fs::create_dir_all(&output).unwrap();
        fs::write(source.join("Makefile"), "all:\n").unwrap();
        fs::write(output.join("stale"), "old").unwrap();

        let run = pipeline(root.path(), Box::new(LocalSource))
            .with_clean(true)
            .run("https://example.com/demo.git", None)
            .await;

        assert_eq!(run.outcome.status, OutcomeStatus::Success);
        assert!(!output.join("stale").exists());
        assert!(source.join("Makefile").is_file());
    }

    #[test]
    fn test_report_options_without_project() {
        let run = PipelineRun {
            project: None,
            detection: None,
            outcome: BuildOutcome::detection_failure(),
        };
        let options = run.report_options(Path::new("/work"), 10);
        assert!(options.redactions.is_empty());
        assert_eq!(options.tail_lines, 10);
    }
}
