//! Common test utilities for cbuilder tests
#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Repository URL used by fixtures; the project name is "demo"
pub const PROJECT_URL: &str = "https://example.com/org/demo.git";

/// Creates a workspace root whose source tier already holds `files`
///
/// Returns the temp dir guard and the project's source directory.
pub fn create_workspace_with_source(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("Failed to create temp dir");
    let source = dir.path().join("source").join("demo");
    std::fs::create_dir_all(&source).expect("Failed to create source dir");
    for (name, content) in files {
        let path = source.join(name);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("Failed to create parent dir");
        }
        std::fs::write(&path, content).expect("Failed to write fixture file");
    }
    (dir, source)
}

/// Output directory of the fixture project
pub fn output_dir(root: &Path) -> PathBuf {
    root.join("output").join("demo")
}

/// Make a fixture script executable on Unix
pub fn make_executable(path: &Path) {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = std::fs::metadata(path)
            .expect("Failed to get metadata")
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(path, perms).expect("Failed to set permissions");
    }
    #[cfg(not(unix))]
    let _ = path;
}

/// Whether a program is on PATH
pub fn tool_available(program: &str) -> bool {
    which::which(program).is_ok()
}

/// Makefile whose default target fails with exit code 2
pub const FAILING_MAKEFILE: &str = "all:\n\t@echo \"building demo\"\n\t@exit 2\n";

/// Makefile that compiles a single C program in-source
pub const HELLO_MAKEFILE: &str = "all: hello\n\nhello: hello.c\n\tcc -o hello hello.c\n";

/// Minimal C program
pub const HELLO_C: &str = "#include <stdio.h>\nint main(void) { puts(\"hello\"); return 0; }\n";

/// Minimal CMake project producing one executable named `hello`
pub const HELLO_CMAKELISTS: &str = r#"cmake_minimum_required(VERSION 3.10)
project(hello C)
add_executable(hello hello.c)
"#;

/// Hand-written configure script that generates a trivial Makefile
pub const TRIVIAL_CONFIGURE: &str = "#!/bin/sh\nprintf 'all:\\n\\t@echo configured build\\n' > Makefile\n";
