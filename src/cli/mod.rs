//! CLI module for cbuilder
//!
//! Provides command-line interface with the following subcommands:
//! - `run` - Fetch a repository and build it
//! - `detect` - Detect build system
//! - `doctor` - Check installed tools
//! - `config` - Show configuration

pub mod commands;

pub use commands::{Cli, Commands};
