//! Error types for cbuilder
//!
//! Provides structured error types for each boundary of the pipeline and
//! output-driven suggestions for common build failures.

use std::path::PathBuf;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while running an external tool
#[derive(Error, Debug)]
pub enum BuildError {
    /// The program is not on PATH (or the script does not exist)
    #[error("Tool not found: {program}")]
    ToolNotFound { program: String, command: String },

    /// The program exists but could not be started
    #[error("Failed to spawn command: {command}")]
    SpawnFailed { command: String, error: String },

    /// Command did not finish within the bounded wait
    #[error("Command timed out after {timeout_secs}s: {command}")]
    Timeout {
        command: String,
        timeout_secs: u64,
        output: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BuildError {
    /// Whether the error means the tool was never started at all
    pub fn is_environmental(&self) -> bool {
        !matches!(self, BuildError::Timeout { .. })
    }
}

/// Errors raised by a source fetcher
#[derive(Error, Debug)]
pub enum FetchError {
    /// git could not be located or started
    #[error("git is not available: {0}")]
    GitUnavailable(String),

    /// A git command ran and failed
    #[error("Command failed: {command}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        output: String,
    },

    /// git did not finish in time
    #[error("Command timed out after {timeout_secs}s: {command}")]
    Timeout { command: String, timeout_secs: u64 },

    /// The source tier holds something that is not a git checkout
    #[error("Source directory is not a git repository: {}", .0.display())]
    NotARepository(PathBuf),

    /// Fetching was skipped and there is nothing to build
    #[error("Source directory is missing or empty: {}", .0.display())]
    SourceMissing(PathBuf),
}

impl FetchError {
    /// Captured git output, if any
    pub fn output(&self) -> &str {
        match self {
            FetchError::CommandFailed { output, .. } => output,
            _ => "",
        }
    }
}

/// Errors raised while preparing the directory layout
#[derive(Error, Debug)]
pub enum WorkspaceError {
    /// No project name could be derived from the repository URL
    #[error("Cannot derive a project name from '{0}'")]
    InvalidProjectName(String),

    /// A tier directory could not be created
    #[error("Failed to create {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tier directory could not be emptied
    #[error("Failed to clean {}: {source}", path.display())]
    Clean {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Serializable error summary for JSON output
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorInfo {
    pub message: String,
    pub error_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,
}

impl From<&BuildError> for ErrorInfo {
    fn from(err: &BuildError) -> Self {
        match err {
            BuildError::ToolNotFound { program, .. } => ErrorInfo {
                message: err.to_string(),
                error_type: "tool_not_found".to_string(),
                suggestion: Some(format!(
                    "Install '{}' and make sure it is on PATH, or run 'cbuilder doctor'",
                    program
                )),
                exit_code: None,
            },
            BuildError::SpawnFailed { error, .. } => ErrorInfo {
                message: err.to_string(),
                error_type: "spawn_failed".to_string(),
                suggestion: Some(format!("Check that the program is executable: {}", error)),
                exit_code: None,
            },
            BuildError::Timeout { .. } => ErrorInfo {
                message: err.to_string(),
                error_type: "timeout".to_string(),
                suggestion: Some(
                    "Raise the step timeout with --timeout or build.timeout, or check whether the tool hangs"
                        .to_string(),
                ),
                exit_code: None,
            },
            BuildError::Io(_) => ErrorInfo {
                message: err.to_string(),
                error_type: "io_error".to_string(),
                suggestion: None,
                exit_code: None,
            },
        }
    }
}

impl From<&FetchError> for ErrorInfo {
    fn from(err: &FetchError) -> Self {
        let (error_type, suggestion, exit_code) = match err {
            FetchError::GitUnavailable(_) => (
                "git_unavailable",
                Some("Install git and make sure it is on PATH".to_string()),
                None,
            ),
            FetchError::CommandFailed { exit_code, .. } => (
                "fetch_failed",
                Some("Check the repository URL, branch name and network access".to_string()),
                *exit_code,
            ),
            FetchError::Timeout { .. } => (
                "fetch_timeout",
                Some("Raise the timeout with --timeout or check network access".to_string()),
                None,
            ),
            FetchError::NotARepository(_) => (
                "not_a_repository",
                Some("Remove the source directory or rerun with --no-fetch".to_string()),
                None,
            ),
            FetchError::SourceMissing(_) => (
                "source_missing",
                Some("Run without --no-fetch to clone the repository first".to_string()),
                None,
            ),
        };
        ErrorInfo {
            message: err.to_string(),
            error_type: error_type.to_string(),
            suggestion,
            exit_code,
        }
    }
}

impl From<&WorkspaceError> for ErrorInfo {
    fn from(err: &WorkspaceError) -> Self {
        let error_type = match err {
            WorkspaceError::InvalidProjectName(_) => "invalid_project_name",
            WorkspaceError::CreateDir { .. } => "create_dir_failed",
            WorkspaceError::Clean { .. } => "clean_failed",
        };
        ErrorInfo {
            message: err.to_string(),
            error_type: error_type.to_string(),
            suggestion: Some("Check the --root directory and its permissions".to_string()),
            exit_code: None,
        }
    }
}

static MISSING_HEADER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"fatal error: ([\w./+-]+\.h(?:pp)?): No such file or directory").unwrap()
});

static MISSING_LIB_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:cannot find -l|library not found for -l)([\w.+-]+)").unwrap()
});

static CMAKE_PACKAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"Could NOT find (\w+)|provided by "(\w+)""#).unwrap()
});

static SHELL_NOT_FOUND_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)(?:^|\s)([\w.+-]+): (?:command )?not found\s*$").unwrap()
});

/// Suggest fixes for common error patterns in captured tool output
///
/// Returns suggestions in a stable order without duplicates.
pub fn suggest_fixes(command: &str, output: &str) -> Vec<String> {
    let mut hints: Vec<String> = Vec::new();
    let mut push = |hint: String| {
        if !hints.contains(&hint) {
            hints.push(hint);
        }
    };

    // Compiler errors
    for caps in MISSING_HEADER_RE.captures_iter(output) {
        push(format!(
            "Missing header '{}'. Install the development package that provides it.",
            &caps[1]
        ));
    }
    for caps in MISSING_LIB_RE.captures_iter(output) {
        push(format!(
            "The linker cannot find library 'lib{}'. Install its development package.",
            &caps[1]
        ));
    }

    // CMake-specific errors
    for caps in CMAKE_PACKAGE_RE.captures_iter(output) {
        if let Some(name) = caps.get(1).or_else(|| caps.get(2)) {
            push(format!(
                "CMake could not find package '{}'. Install it or point CMAKE_PREFIX_PATH at it.",
                name.as_str()
            ));
        }
    }
    if output.contains("No CMAKE_C_COMPILER could be found")
        || output.contains("CMAKE_C_COMPILER not set")
    {
        push(
            "No C compiler found. Install gcc or clang (Visual Studio Build Tools on Windows)."
                .to_string(),
        );
    }

    // Autotools-specific errors
    if output.contains("possibly undefined macro") {
        push(
            "configure.ac uses an m4 macro that is not installed. Install autoconf-archive or the package shipping the macro."
                .to_string(),
        );
    }

    // Make-specific errors
    if output.contains("No rule to make target") {
        push(
            "Make has no rule for a required target. The Makefile may expect a generated file or a different working directory."
                .to_string(),
        );
    }

    // Command not found
    for caps in SHELL_NOT_FOUND_RE.captures_iter(output) {
        push(format!(
            "'{}' is not installed or not on PATH.",
            &caps[1]
        ));
    }

    // Permission errors
    if output.contains("Permission denied") {
        if command.contains("configure") || command.contains("autogen.sh") {
            push("A build script is not executable. Run 'chmod +x' on it or invoke it through sh.".to_string());
        } else {
            push("Permission denied. Check file permissions of the workspace.".to_string());
        }
    }

    hints
}
