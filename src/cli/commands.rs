//! CLI command definitions using clap
//!
//! Defines all CLI subcommands and their arguments.

use clap::{Parser, Subcommand, ValueEnum};
use tracing::Level;

use crate::config::Config;

/// Fetch a C project and build it with CMake, Make or Autotools.
///
/// Sources are cloned into <root>/source/<name>, out-of-tree builds use
/// <root>/build/<name>, and executables and libraries are collected into
/// <root>/output/<name>.
#[derive(Parser, Debug)]
#[command(name = "cbuilder")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (overrides default XDG paths)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Log level (overrides --verbose and the default of warn)
    #[arg(long, global = true, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Level for cbuilder's own logs: `--log-level`, then `-v`, then warn
    pub fn log_filter_level(&self) -> Level {
        match self.log_level {
            Some(level) => level.as_level(),
            None if self.verbose => Level::DEBUG,
            None => Level::WARN,
        }
    }

    /// `EnvFilter` directive used when `RUST_LOG` is unset
    pub fn log_directive(&self) -> String {
        format!("cbuilder={}", self.log_filter_level())
    }
}

/// Available CLI subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Fetch a repository and build it
    Run(RunArgs),

    /// Detect which build system a source tree uses
    Detect(DetectArgs),

    /// Check that the required build tools are installed
    Doctor(DoctorArgs),

    /// Show the resolved configuration
    Config(ConfigArgs),
}

/// Arguments for the `run` subcommand
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Repository URL (https, ssh or a local path)
    #[arg(required = true)]
    pub url: String,

    /// Branch to check out (defaults to the remote's default branch)
    pub branch: Option<String>,

    /// Working root holding the source, build and output directories
    #[arg(short, long)]
    pub root: Option<String>,

    /// Empty the build and output directories first
    #[arg(long)]
    pub clean: bool,

    /// Build what is already in the source directory without fetching
    #[arg(long)]
    pub no_fetch: bool,

    /// Per-step timeout in seconds (0 for no timeout)
    #[arg(short, long)]
    pub timeout: Option<u64>,

    /// Parallel jobs for make and cmake --build
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Also run the install step into the output directory
    #[arg(long)]
    pub install: bool,

    /// Don't only capture tool output, stream it to stderr too
    #[arg(long)]
    pub stream: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Number of output lines shown on failure
    #[arg(long)]
    pub tail: Option<usize>,
}

impl RunArgs {
    /// Layer command-line overrides on top of the loaded configuration
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref root) = self.root {
            config.workspace.root = root.clone();
        }
        if self.clean {
            config.workspace.clean = true;
        }
        if let Some(timeout) = self.timeout {
            config.build.timeout = timeout;
        }
        if let Some(jobs) = self.jobs {
            config.build.jobs = jobs;
        }
        if self.install {
            config.build.install = true;
        }
        if let Some(tail) = self.tail {
            config.report.tail_lines = tail;
        }
    }
}

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON output
    Json,
    /// Plain text (one value per line)
    Plain,
}

/// Log levels accepted by --log-level
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_level(&self) -> Level {
        match self {
            LogLevel::Trace => Level::TRACE,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Info => Level::INFO,
            LogLevel::Warn => Level::WARN,
            LogLevel::Error => Level::ERROR,
        }
    }
}

/// Arguments for the `detect` subcommand
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Source directory (defaults to current directory)
    pub path: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `doctor` subcommand
#[derive(Parser, Debug)]
pub struct DoctorArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the `config` subcommand
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    /// Output format (text prints TOML, plain lists the files read)
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}
