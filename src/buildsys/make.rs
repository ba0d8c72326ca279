//! Make protocol
//!
//! A single invocation of the default target from the source directory.
//! On Windows the make program is the MinGW one unless configured.

use super::detect::BuildSystemKind;
use super::traits::{BuildCommand, BuildProtocol, BuildStep};
use crate::config::Config;
use crate::platform::PlatformCapabilities;
use crate::workspace::Project;

/// Make protocol settings
#[derive(Debug, Clone, Default)]
pub struct MakeProtocol {
    /// Make program override (None = platform default)
    make_command: Option<String>,
    jobs: usize,
}

impl MakeProtocol {
    /// Create a make protocol using the platform's make program
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a make protocol with a custom make command path
    pub fn with_command(command: impl Into<String>) -> Self {
        Self {
            make_command: Some(command.into()),
            jobs: 0,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            make_command: Some(config.tools.make.clone()).filter(|m| !m.is_empty()),
            jobs: config.build.jobs,
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    /// Resolve the make program for a platform
    pub fn program(&self, platform: &PlatformCapabilities) -> String {
        self.make_command
            .clone()
            .unwrap_or_else(|| platform.make_program.clone())
    }

    /// The `make` step shared with the autotools protocol
    pub(crate) fn make_step(&self, project: &Project, platform: &PlatformCapabilities) -> BuildStep {
        let mut step = BuildStep::new("make", self.program(platform), &project.source_dir);
        if self.jobs > 0 {
            step = step.arg(format!("-j{}", self.jobs));
        }
        step
    }
}

impl BuildProtocol for MakeProtocol {
    fn kind(&self) -> BuildSystemKind {
        BuildSystemKind::Make
    }

    fn plan(&self, project: &Project, platform: &PlatformCapabilities) -> BuildCommand {
        BuildCommand::new(BuildSystemKind::Make, vec![self.make_step(project, platform)])
    }

    fn builds_in_source(&self) -> bool {
        true
    }
}
