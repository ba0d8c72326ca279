//! Common traits and types for build protocols
//!
//! Defines the interface that every build system protocol (cmake, make,
//! autotools) implements, and the step types the orchestrator executes.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::detect::BuildSystemKind;
use crate::executor::render_command;
use crate::platform::PlatformCapabilities;
use crate::workspace::Project;

/// One external tool invocation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildStep {
    /// Short label shown in progress and reports (e.g. "configure")
    pub label: String,
    /// Program name or path
    pub program: String,
    /// Arguments
    pub args: Vec<String>,
    /// Working directory
    pub working_dir: PathBuf,
    /// Failure of an optional step is reported as a warning only
    pub optional: bool,
}

impl BuildStep {
    /// Create a new step with no arguments
    pub fn new(
        label: impl Into<String>,
        program: impl Into<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            label: label.into(),
            program: program.into(),
            args: Vec::new(),
            working_dir: working_dir.into(),
            optional: false,
        }
    }

    /// Add an argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Add several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Mark the step as optional
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Full command line (program + arguments)
    pub fn command_line(&self) -> String {
        render_command(&self.program, &self.args)
    }
}

impl std::fmt::Display for BuildStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.command_line())
    }
}

/// Ordered, immutable sequence of steps realising one protocol
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildCommand {
    kind: BuildSystemKind,
    steps: Vec<BuildStep>,
}

impl BuildCommand {
    pub fn new(kind: BuildSystemKind, steps: Vec<BuildStep>) -> Self {
        Self { kind, steps }
    }

    pub fn kind(&self) -> BuildSystemKind {
        self.kind
    }

    pub fn steps(&self) -> &[BuildStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Labels of all steps, in order
    pub fn labels(&self) -> Vec<&str> {
        self.steps.iter().map(|s| s.label.as_str()).collect()
    }
}

/// Trait for build system protocols
///
/// Each protocol turns a project into the command sequence for one build
/// system on one platform. Planning never touches the filesystem beyond
/// checking which bootstrap scripts are present.
pub trait BuildProtocol: Send + Sync {
    /// The build system this protocol drives
    fn kind(&self) -> BuildSystemKind;

    /// Plan the command sequence for a project
    ///
    /// # Arguments
    /// * `project` - Project with its source, build and output directories
    /// * `platform` - Host capabilities (generator, make program, shell)
    fn plan(&self, project: &Project, platform: &PlatformCapabilities) -> BuildCommand;

    /// Whether the protocol builds inside the source tree
    fn builds_in_source(&self) -> bool;

    /// Directory scanned for artifacts after a successful build
    fn artifact_root<'a>(&self, project: &'a Project) -> &'a Path {
        if self.builds_in_source() {
            &project.source_dir
        } else {
            &project.build_dir
        }
    }
}
