//! Tool lookup
//!
//! Resolves external programs before they are spawned, so that a missing
//! tool is reported as an environment problem rather than a build failure.

use std::path::{Path, PathBuf};

use super::runner::is_path_like;

/// Resolves a program name to an executable path
#[cfg_attr(test, mockall::automock)]
pub trait ToolLocator: Send + Sync {
    /// Locate `program`, resolving relative paths against `working_dir`
    fn locate(&self, program: &str, working_dir: &Path) -> Option<PathBuf>;
}

/// Locator backed by the process search path
#[derive(Debug, Clone, Copy, Default)]
pub struct PathLocator;

impl ToolLocator for PathLocator {
    fn locate(&self, program: &str, working_dir: &Path) -> Option<PathBuf> {
        if is_path_like(program) {
            let path = working_dir.join(program);
            return path.is_file().then_some(path);
        }
        which::which(program).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_locate_relative_script() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("configure"), "#!/bin/sh\n").unwrap();

        let found = PathLocator.locate("./configure", dir.path());
        assert_eq!(found, Some(dir.path().join("./configure")));
    }

    #[test]
    fn test_locate_absolute_path() {
        let dir = TempDir::new().unwrap();
        let script = dir.path().join("autogen.sh");
        fs::write(&script, "#!/bin/sh\n").unwrap();

        let found = PathLocator.locate(script.to_str().unwrap(), Path::new("/"));
        assert_eq!(found, Some(script));
    }

    #[test]
    fn test_locate_missing_script() {
        let dir = TempDir::new().unwrap();
        assert!(PathLocator.locate("./configure", dir.path()).is_none());
    }

    #[test]
    fn test_locate_missing_program() {
        let dir = TempDir::new().unwrap();
        assert!(PathLocator
            .locate("nonexistent_command_12345", dir.path())
            .is_none());
    }
}
