//! Configuration model for cbuilder
//!
//! Defines the structure for XDG-compliant layered configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    /// Directory layout settings
    #[serde(default)]
    pub workspace: WorkspaceConfig,

    /// Build protocol settings shared by all build systems
    #[serde(default)]
    pub build: BuildConfig,

    /// External tool commands
    #[serde(default)]
    pub tools: ToolsConfig,

    /// Outcome report settings
    #[serde(default)]
    pub report: ReportConfig,
}

/// Directory layout settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WorkspaceConfig {
    /// Working root holding the source/, build/ and output/ tiers.
    /// `~` and `$VAR` are expanded.
    #[serde(default = "default_root")]
    pub root: String,

    /// Empty the build and output tiers before building
    #[serde(default)]
    pub clean: bool,
}

fn default_root() -> String {
    ".".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            clean: false,
        }
    }
}

/// Build protocol settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct BuildConfig {
    /// Per-step timeout in seconds (0 = no timeout)
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Parallel jobs passed to make / cmake --build (0 = tool default)
    #[serde(default)]
    pub jobs: usize,

    /// Run the install step into the output tier after building
    #[serde(default)]
    pub install: bool,

    /// CMake build configuration
    #[serde(default = "default_cmake_config")]
    pub cmake_config: String,

    /// CMake generator override (empty = platform default)
    #[serde(default)]
    pub cmake_generator: String,

    /// Extra arguments for the CMake configure step
    #[serde(default)]
    pub cmake_args: Vec<String>,

    /// Extra arguments for ./configure
    #[serde(default)]
    pub configure_args: Vec<String>,
}

fn default_timeout() -> u64 {
    1800
}

fn default_cmake_config() -> String {
    "Release".to_string()
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            jobs: 0,
            install: false,
            cmake_config: default_cmake_config(),
            cmake_generator: String::new(),
            cmake_args: Vec::new(),
            configure_args: Vec::new(),
        }
    }
}

/// External tool commands
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ToolsConfig {
    #[serde(default = "default_git")]
    pub git: String,

    #[serde(default = "default_cmake")]
    pub cmake: String,

    /// Make program (empty = platform default)
    #[serde(default)]
    pub make: String,

    #[serde(default = "default_autoreconf")]
    pub autoreconf: String,
}

fn default_git() -> String {
    "git".to_string()
}

fn default_cmake() -> String {
    "cmake".to_string()
}

fn default_autoreconf() -> String {
    "autoreconf".to_string()
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            git: default_git(),
            cmake: default_cmake(),
            make: String::new(),
            autoreconf: default_autoreconf(),
        }
    }
}

/// Outcome report settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ReportConfig {
    /// Number of trailing output lines shown in the report
    #[serde(default = "default_tail_lines")]
    pub tail_lines: usize,
}

fn default_tail_lines() -> usize {
    50
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            tail_lines: default_tail_lines(),
        }
    }
}

impl Config {
    /// Workspace root with `~` and environment variables expanded
    pub fn workspace_root(&self) -> PathBuf {
        match shellexpand::full(&self.workspace.root) {
            Ok(expanded) => PathBuf::from(expanded.as_ref()),
            Err(e) => {
                tracing::warn!(
                    "Failed to expand workspace root '{}': {}",
                    self.workspace.root,
                    e
                );
                PathBuf::from(&self.workspace.root)
            }
        }
    }

    /// Step timeout, `None` when disabled
    pub fn step_timeout(&self) -> Option<std::time::Duration> {
        if self.build.timeout > 0 {
            Some(std::time::Duration::from_secs(self.build.timeout))
        } else {
            None
        }
    }
}
