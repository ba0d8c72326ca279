//! Build system detection and protocols
//!
//! Provides auto-detection and command planning for:
//! - CMake (CMakeLists.txt)
//! - Autotools (configure, configure.ac, configure.in)
//! - Make (Makefile)

pub mod autotools;
pub mod cmake;
pub mod detect;
pub mod make;
pub mod traits;

use std::path::Path;

pub use autotools::AutotoolsProtocol;
pub use cmake::CMakeProtocol;
pub use detect::*;
pub use make::MakeProtocol;
pub use traits::*;

use crate::config::Config;

/// Get the protocol for a detected kind, `None` for `Unknown`
pub fn protocol_for(kind: BuildSystemKind, config: &Config) -> Option<Box<dyn BuildProtocol>> {
    match kind {
        BuildSystemKind::CMake => Some(Box::new(CMakeProtocol::from_config(config))),
        BuildSystemKind::Make => Some(Box::new(MakeProtocol::from_config(config))),
        BuildSystemKind::Autotools => Some(Box::new(AutotoolsProtocol::from_config(config))),
        BuildSystemKind::Unknown => None,
    }
}

/// Render a path as a command-line argument
pub(crate) fn path_arg(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
