//! cbuilder - fetch a C project and build it
//!
//! Clones a repository, works out which build system governs it and drives
//! that system's command sequence for the host platform:
//! - **CMake** - out-of-tree configure and build
//! - **Autotools** - bootstrap if needed, configure, make
//! - **Make** - the default target, in the source tree
//!
//! ## Features
//!
//! - Three-tier workspace layout (source / build / output) per project
//! - Build system detection by descriptor priority
//! - Step state machine with bounded waits and captured output
//! - Artifact collection into the output tier
//! - Actionable reports with distinct exit codes per failure class
//! - XDG-compliant layered configuration

pub mod buildsys;
pub mod cli;
pub mod config;
pub mod doctor;
pub mod error;
pub mod executor;
pub mod fetch;
pub mod orchestrator;
pub mod pipeline;
pub mod platform;
pub mod report;
pub mod workspace;

pub use buildsys::{detect_build_system, BuildSystemKind, DetectionResult, FilesFound};
pub use cli::{Cli, Commands};
pub use config::Config;
pub use error::{BuildError, ErrorInfo, FetchError, WorkspaceError};
pub use executor::{exec_command, ExecOptions, ExecResult};
pub use fetch::{GitFetcher, LocalSource, SourceFetcher};
pub use orchestrator::{BuildOutcome, Orchestrator, OutcomeStatus, ProcessStepRunner, StepRunner};
pub use pipeline::{Pipeline, PipelineRun};
pub use platform::PlatformCapabilities;
pub use report::{build_report, Report, ReportOptions};
pub use workspace::{Project, Workspace};
