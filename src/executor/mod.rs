//! Command execution module
//!
//! Provides async command execution with:
//! - Timeout support
//! - Combined output capture and truncation
//! - Environment variable injection
//! - Working directory control
//! - Tool lookup on PATH

pub mod locate;
pub mod runner;

pub use locate::*;
pub use runner::*;
