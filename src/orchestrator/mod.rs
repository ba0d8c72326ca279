//! Build orchestration
//!
//! Runs the command sequence of a detected build system step by step and
//! turns every result, including errors, into a [`BuildOutcome`].

pub mod artifacts;
pub mod machine;
pub mod outcome;
pub mod progress;

use std::time::{Duration, Instant};

use async_trait::async_trait;

pub use artifacts::*;
pub use machine::*;
pub use outcome::*;
pub use progress::StepProgress;

use crate::buildsys::{protocol_for, BuildStep, BuildSystemKind};
use crate::config::Config;
use crate::error::{BuildError, ErrorInfo};
use crate::executor::{exec_command, ExecOptions, ExecResult, PathLocator, ToolLocator};
use crate::platform::PlatformCapabilities;
use crate::workspace::Project;

/// Executes a single build step
#[async_trait]
pub trait StepRunner: Send + Sync {
    async fn run_step(&self, step: &BuildStep) -> Result<ExecResult, BuildError>;
}

/// Runs steps as child processes
pub struct ProcessStepRunner {
    timeout: Option<Duration>,
    stream: bool,
    locator: Box<dyn ToolLocator>,
}

impl ProcessStepRunner {
    pub fn new(timeout: Option<Duration>) -> Self {
        Self {
            timeout,
            stream: false,
            locator: Box::new(PathLocator),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.step_timeout())
    }

    /// Echo tool output to stderr while it runs
    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_locator(mut self, locator: Box<dyn ToolLocator>) -> Self {
        self.locator = locator;
        self
    }
}

#[async_trait]
impl StepRunner for ProcessStepRunner {
    async fn run_step(&self, step: &BuildStep) -> Result<ExecResult, BuildError> {
        if self.locator.locate(&step.program, &step.working_dir).is_none() {
            return Err(BuildError::ToolNotFound {
                program: step.program.clone(),
                command: step.command_line(),
            });
        }

        let options = ExecOptions::in_dir(&step.working_dir)
            .with_optional_timeout(self.timeout)
            .with_stream(self.stream);

        exec_command(&step.program, step.args.as_slice(), &options).await
    }
}

/// Drives one project through its build protocol
pub struct Orchestrator<R: StepRunner> {
    platform: PlatformCapabilities,
    config: Config,
    runner: R,
    progress: bool,
}

impl<R: StepRunner> Orchestrator<R> {
    pub fn new(platform: PlatformCapabilities, config: Config, runner: R) -> Self {
        Self {
            platform,
            config,
            runner,
            progress: false,
        }
    }

    /// Show a spinner per step on stderr
    pub fn with_progress(mut self, progress: bool) -> Self {
        self.progress = progress;
        self
    }

    /// Build a project whose source tree has been fetched and detected
    ///
    /// Never fails: every problem is reported through the outcome status.
    pub async fn build(&self, project: &Project, kind: BuildSystemKind) -> BuildOutcome {
        let start = Instant::now();

        let Some(protocol) = protocol_for(kind, &self.config) else {
            tracing::info!("No build system detected for {}", project.name);
            return BuildOutcome::detection_failure();
        };

        let command = protocol.plan(project, &self.platform);
        let total = command.len();
        tracing::info!("Building {} with {} ({} steps)", project.name, kind, total);

        let snapshot = protocol
            .builds_in_source()
            .then(|| ArtifactSnapshot::capture(&project.source_dir));
        if let Some(ref snapshot) = snapshot {
            tracing::debug!(
                "Recorded {} existing files before the in-source build",
                snapshot.len()
            );
        }

        let mut machine = StepMachine::new(&command);
        let mut progress = StepProgress::new(total, self.progress);
        let mut output = String::new();
        let mut warnings = Vec::new();
        let mut hints = Vec::new();
        let mut error: Option<ErrorInfo> = None;
        let mut status = OutcomeStatus::Success;

        while let Some(index) = machine.next_pending() {
            let step = machine.start(index).clone();
            let command_line = step.command_line();
            tracing::info!("[{}/{}] {}: {}", index + 1, total, step.label, command_line);
            output.push_str(&format!("$ {}\n", command_line));
            progress.start(index, &step);

            let started = Instant::now();
            match self.runner.run_step(&step).await {
                Ok(result) => {
                    output.push_str(&result.output);
                    let duration_ms = result.duration.as_millis() as u64;
                    if result.success {
                        progress.finish();
                        machine.succeed(index, result.exit_code, duration_ms);
                        continue;
                    }

                    progress.fail(&step);
                    machine.fail(index, result.exit_code, duration_ms);
                    let code = result
                        .exit_code
                        .map(|c| c.to_string())
                        .unwrap_or_else(|| "none (killed by signal)".to_string());
                    if step.optional {
                        warnings.push(format!(
                            "Optional step '{}' failed with exit code {}",
                            step.label, code
                        ));
                    } else {
                        tracing::debug!("Step '{}' failed with exit code {}", step.label, code);
                        status = OutcomeStatus::ToolFailure;
                    }
                }
                Err(e) => {
                    progress.fail(&step);
                    machine.fail(index, None, started.elapsed().as_millis() as u64);
                    if let BuildError::Timeout { output: ref captured, .. } = e {
                        output.push_str(captured);
                    }

                    if step.optional {
                        warnings.push(format!("Optional step '{}' failed: {}", step.label, e));
                        continue;
                    }

                    tracing::warn!("Step '{}' failed: {}", step.label, e);
                    // A timed out tool did start, everything else never ran
                    status = if e.is_environmental() {
                        OutcomeStatus::EnvironmentFailure
                    } else {
                        OutcomeStatus::ToolFailure
                    };
                    hints.push(match &e {
                        BuildError::Timeout { timeout_secs, .. } => format!(
                            "The {} step did not finish within {}s and was stopped. Raise --timeout if the build is just slow.",
                            step.label, timeout_secs
                        ),
                        BuildError::ToolNotFound { program, .. } => format!(
                            "'{}' was not found. Install it or run 'cbuilder doctor'.",
                            program
                        ),
                        _ => e.to_string(),
                    });
                    error = Some(ErrorInfo::from(&e));
                }
            }
        }

        let mut outcome = BuildOutcome::new(status, kind).with_output(output);
        outcome.hints = hints;
        outcome.error = error;
        outcome.failed_step = machine
            .failed_step()
            .map(|(index, record)| FailedStep::from_record(index, total, record));
        let complete = outcome.failed_step.is_none() && machine.is_complete();
        outcome.steps = machine.into_records().iter().map(StepSummary::from).collect();

        if complete {
            let root = protocol.artifact_root(project);
            tracing::debug!("Collecting artifacts from {}", root.display());
            let report = collect_artifacts(
                root,
                &project.output_dir,
                &self.platform,
                snapshot.as_ref(),
            );
            if report.artifacts.is_empty() && report.failures.is_empty() {
                warnings.push(format!("No artifacts found under {}", root.display()));
            }
            outcome.artifacts = report.artifacts;
            warnings.extend(report.failures);
        }

        outcome.warnings = warnings;
        outcome.duration_ms = start.elapsed().as_millis() as u64;
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::MockToolLocator;
    use std::collections::VecDeque;
    use std::fs;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;
    use tempfile::TempDir;

    /// Records every step it is asked to run and replays canned results
    #[derive(Default)]
    struct RecordingRunner {
        calls: Mutex<Vec<String>>,
        results: Mutex<VecDeque<Result<ExecResult, BuildError>>>,
    }

    impl RecordingRunner {
        fn with_results(results: Vec<Result<ExecResult, BuildError>>) -> Self {
            Self {
                calls: Mutex::new(Vec::new()),
                results: Mutex::new(results.into()),
            }
        }

        fn labels(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl StepRunner for RecordingRunner {
        async fn run_step(&self, step: &BuildStep) -> Result<ExecResult, BuildError> {
            self.calls.lock().unwrap().push(step.label.clone());
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(exit(0, "")))
        }
    }

    fn exit(code: i32, output: &str) -> ExecResult {
        ExecResult {
            success: code == 0,
            exit_code: Some(code),
            output: output.to_string(),
            truncated: false,
            duration: Duration::from_millis(3),
        }
    }

    fn project(root: &Path) -> Project {
        let project = Project {
            name: "demo".to_string(),
            url: "https://example.com/demo.git".to_string(),
            branch: None,
            source_dir: root.join("source/demo"),
            build_dir: root.join("build/demo"),
            output_dir: root.join("output/demo"),
        };
        for dir in project.tiers() {
            fs::create_dir_all(dir).unwrap();
        }
        project
    }

    fn orchestrator(runner: RecordingRunner) -> Orchestrator<RecordingRunner> {
        Orchestrator::new(PlatformCapabilities::unix(), Config::default(), runner)
    }

    #[tokio::test]
    async fn test_unknown_spawns_nothing() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let orchestrator = orchestrator(RecordingRunner::default());

        let outcome = orchestrator.build(&project, BuildSystemKind::Unknown).await;

        assert_eq!(outcome.status, OutcomeStatus::DetectionFailure);
        assert!(orchestrator.runner.labels().is_empty());
        assert_eq!(fs::read_dir(&project.output_dir).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_cmake_configure_failure_skips_build() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let runner =
            RecordingRunner::with_results(vec![Ok(exit(1, "CMake Error: bad CMakeLists.txt\n"))]);
        let orchestrator = orchestrator(runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::CMake).await;

        assert_eq!(outcome.status, OutcomeStatus::ToolFailure);
        assert_eq!(orchestrator.runner.labels(), vec!["configure"]);

        let failed = outcome.failed_step.unwrap();
        assert_eq!(failed.label, "configure");
        assert_eq!(failed.program, "cmake");
        assert_eq!(failed.exit_code, Some(1));
        assert_eq!(outcome.steps[1].state, StepState::Pending);
        assert!(outcome.output.contains("CMake Error"));
        assert!(outcome.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_make_failure_reports_make_invocation() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let runner = RecordingRunner::with_results(vec![Ok(exit(2, "make: *** [all] Error 2\n"))]);
        let orchestrator = orchestrator(runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::Make).await;

        assert_eq!(outcome.exit_code(), EXIT_TOOL_FAILURE);
        let failed = outcome.failed_step.unwrap();
        assert_eq!(failed.program, "make");
        assert_eq!(failed.working_dir, project.source_dir);
        assert!(outcome.output.starts_with("$ make"));
    }

    #[tokio::test]
    async fn test_tool_not_found_is_environment_failure() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let runner = RecordingRunner::with_results(vec![Err(BuildError::ToolNotFound {
            program: "cmake".to_string(),
            command: "cmake -S x -B y".to_string(),
        })]);
        let orchestrator = orchestrator(runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::CMake).await;

        assert_eq!(outcome.status, OutcomeStatus::EnvironmentFailure);
        assert_eq!(outcome.error.unwrap().error_type, "tool_not_found");
        assert!(outcome.hints.iter().any(|h| h.contains("'cmake' was not found")));
        assert_eq!(orchestrator.runner.labels(), vec!["configure"]);
    }

    #[tokio::test]
    async fn test_timeout_is_tool_failure_with_hint() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let runner = RecordingRunner::with_results(vec![Err(BuildError::Timeout {
            command: "make".to_string(),
            timeout_secs: 5,
            output: "compiling...\n".to_string(),
        })]);
        let orchestrator = orchestrator(runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::Make).await;

        assert_eq!(outcome.status, OutcomeStatus::ToolFailure);
        assert!(outcome.hints[0].contains("5s"));
        assert!(outcome.output.contains("compiling..."));
        assert_eq!(outcome.failed_step.unwrap().exit_code, None);
    }

    #[tokio::test]
    async fn test_spawn_failure_is_environment_failure() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let runner = RecordingRunner::with_results(vec![Err(BuildError::SpawnFailed {
            command: "make".to_string(),
            error: "Permission denied".to_string(),
        })]);
        let orchestrator = orchestrator(runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::Make).await;

        assert_eq!(outcome.status, OutcomeStatus::EnvironmentFailure);
        assert_eq!(outcome.error.unwrap().error_type, "spawn_failed");
        assert_eq!(outcome.steps.len(), 1);
        assert!(outcome.artifacts.is_empty());
    }

    #[tokio::test]
    async fn test_success_collects_new_artifacts_only() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        fs::write(project.source_dir.join("libold.a"), "!<arch>\n").unwrap();

        struct Producing(PathBuf);

        #[async_trait]
        impl StepRunner for Producing {
            async fn run_step(&self, _step: &BuildStep) -> Result<ExecResult, BuildError> {
                fs::write(self.0.join("libnew.a"), "!<arch>\n").unwrap();
                Ok(exit(0, "ar rcs libnew.a\n"))
            }
        }

        let orchestrator = Orchestrator::new(
            PlatformCapabilities::unix(),
            Config::default(),
            Producing(project.source_dir.clone()),
        );
        let outcome = orchestrator.build(&project, BuildSystemKind::Make).await;

        assert!(outcome.is_success());
        assert_eq!(
            artifact_paths(&outcome.artifacts),
            vec![PathBuf::from("libnew.a")]
        );
        assert!(project.output_dir.join("libnew.a").is_file());
        assert!(!project.output_dir.join("libold.a").exists());
        assert!(outcome.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_success_without_artifacts_warns() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let orchestrator = orchestrator(RecordingRunner::default());

        let outcome = orchestrator.build(&project, BuildSystemKind::CMake).await;

        assert!(outcome.is_success());
        assert_eq!(orchestrator.runner.labels(), vec!["configure", "build"]);
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("No artifacts"));
    }

    #[tokio::test]
    async fn test_optional_install_failure_is_warning() {
        let root = TempDir::new().unwrap();
        let project = project(root.path());
        let mut config = Config::default();
        config.build.install = true;
        let runner = RecordingRunner::with_results(vec![
            Ok(exit(0, "")),
            Ok(exit(0, "")),
            Ok(exit(1, "install: permission denied\n")),
        ]);
        let orchestrator = Orchestrator::new(PlatformCapabilities::unix(), config, runner);

        let outcome = orchestrator.build(&project, BuildSystemKind::CMake).await;

        assert!(outcome.is_success());
        assert!(outcome.failed_step.is_none());
        assert_eq!(
            orchestrator.runner.labels(),
            vec!["configure", "build", "install"]
        );
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("Optional step 'install'")));
    }

    #[tokio::test]
    async fn test_process_runner_reports_missing_tool_before_spawning() {
        let mut locator = MockToolLocator::new();
        locator
            .expect_locate()
            .withf(|program, _| program.contains("cmake"))
            .times(1)
            .returning(|_, _| None);

        let runner = ProcessStepRunner::new(None).with_locator(Box::new(locator));
        let step = BuildStep::new("configure", "cmake", "/nonexistent");

        match runner.run_step(&step).await {
            Err(BuildError::ToolNotFound { program, .. }) => assert_eq!(program, "cmake"),
            other => panic!("Expected ToolNotFound, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_process_runner_runs_located_tool() {
        let Ok(sh) = which::which("sh") else {
            eprintln!("Skipping test: sh not installed");
            return;
        };
        let dir = TempDir::new().unwrap();

        let mut locator = MockToolLocator::new();
        locator
            .expect_locate()
            .returning(move |_, _| Some(sh.clone()));

        let runner = ProcessStepRunner::new(Some(Duration::from_secs(10)))
            .with_locator(Box::new(locator));
        let step = BuildStep::new("make", "sh", dir.path()).args(["-c", "echo building; exit 2"]);

        let result = runner.run_step(&step).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, Some(2));
        assert!(result.output.contains("building"));
    }
}
