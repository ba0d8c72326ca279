//! Build system auto-detection
//!
//! Classifies a source tree by the build descriptors at its top level.
//! Detection is a priority chain, first match wins:
//! 1. `CMakeLists.txt` (cmake)
//! 2. `configure`, `configure.ac`, `configure.in` (autotools)
//! 3. `Makefile`, `makefile`, `GNUmakefile` (make)
//!
//! CMake projects sometimes ship a generated Makefile, and autotools trees
//! carry `Makefile.am`/`Makefile.in`, so the more specific systems are
//! checked first.

use std::path::Path;

use serde::Serialize;

/// Descriptor files that mark a CMake project
pub const CMAKE_DESCRIPTORS: &[&str] = &["CMakeLists.txt"];

/// Descriptor files that mark an autotools project
pub const AUTOTOOLS_DESCRIPTORS: &[&str] = &["configure", "configure.ac", "configure.in"];

/// Descriptor files that mark a plain make project
pub const MAKE_DESCRIPTORS: &[&str] = &["Makefile", "makefile", "GNUmakefile"];

/// Kind of build system governing a source tree
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildSystemKind {
    CMake,
    Make,
    Autotools,
    Unknown,
}

impl BuildSystemKind {
    /// Get the display name for this kind
    pub fn name(&self) -> &'static str {
        match self {
            BuildSystemKind::CMake => "cmake",
            BuildSystemKind::Make => "make",
            BuildSystemKind::Autotools => "autotools",
            BuildSystemKind::Unknown => "unknown",
        }
    }

    /// Descriptor files that select this kind
    pub fn descriptors(&self) -> &'static [&'static str] {
        match self {
            BuildSystemKind::CMake => CMAKE_DESCRIPTORS,
            BuildSystemKind::Make => MAKE_DESCRIPTORS,
            BuildSystemKind::Autotools => AUTOTOOLS_DESCRIPTORS,
            BuildSystemKind::Unknown => &[],
        }
    }
}

impl std::fmt::Display for BuildSystemKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// Every descriptor filename the detector looks for, in priority order
pub fn searched_descriptors() -> Vec<&'static str> {
    CMAKE_DESCRIPTORS
        .iter()
        .chain(AUTOTOOLS_DESCRIPTORS)
        .chain(MAKE_DESCRIPTORS)
        .copied()
        .collect()
}

/// Descriptor files found during detection
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FilesFound {
    /// Whether CMakeLists.txt was found
    pub cmake_lists: bool,
    /// Whether a ready-to-run configure script was found
    pub configure: bool,
    /// configure.ac or configure.in if found
    #[serde(skip_serializing_if = "Option::is_none")]
    pub configure_source: Option<String>,
    /// Whether autogen.sh was found
    pub autogen: bool,
    /// Makefile name if found (could be "Makefile", "makefile" or "GNUmakefile")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub makefile: Option<String>,
}

impl FilesFound {
    /// Names of all descriptor files present
    pub fn names(&self) -> Vec<String> {
        let mut names = Vec::new();
        if self.cmake_lists {
            names.push("CMakeLists.txt".to_string());
        }
        if self.configure {
            names.push("configure".to_string());
        }
        if let Some(ref source) = self.configure_source {
            names.push(source.clone());
        }
        if self.autogen {
            names.push("autogen.sh".to_string());
        }
        if let Some(ref makefile) = self.makefile {
            names.push(makefile.clone());
        }
        names
    }
}

/// Result of build system detection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetectionResult {
    /// The detected kind (first match by priority)
    pub kind: BuildSystemKind,
    /// The descriptor that decided the kind
    #[serde(skip_serializing_if = "Option::is_none")]
    pub descriptor: Option<String>,
    /// Details about files found
    pub files_found: FilesFound,
}

/// Detect which build system a source tree uses
///
/// Only regular files at the top level of `dir` are considered; file
/// contents are never read.
pub fn detect_build_system(dir: &Path) -> DetectionResult {
    let files_found = FilesFound {
        cmake_lists: is_file(dir, "CMakeLists.txt"),
        configure: is_file(dir, "configure"),
        configure_source: first_present(dir, &["configure.ac", "configure.in"]),
        autogen: is_file(dir, "autogen.sh"),
        makefile: first_present(dir, MAKE_DESCRIPTORS),
    };

    let (kind, descriptor) = if files_found.cmake_lists {
        (BuildSystemKind::CMake, Some("CMakeLists.txt".to_string()))
    } else if files_found.configure {
        (BuildSystemKind::Autotools, Some("configure".to_string()))
    } else if let Some(ref source) = files_found.configure_source {
        (BuildSystemKind::Autotools, Some(source.clone()))
    } else if let Some(ref makefile) = files_found.makefile {
        (BuildSystemKind::Make, Some(makefile.clone()))
    } else {
        (BuildSystemKind::Unknown, None)
    };

    match descriptor {
        Some(ref name) => tracing::debug!("Detected {} build system via {}", kind, name),
        None => tracing::debug!("No build descriptor found in {}", dir.display()),
    }

    DetectionResult {
        kind,
        descriptor,
        files_found,
    }
}

/// Detect only the kind
pub fn detect_kind(dir: &Path) -> BuildSystemKind {
    detect_build_system(dir).kind
}

fn is_file(dir: &Path, name: &str) -> bool {
    dir.join(name).is_file()
}

fn first_present(dir: &Path, names: &[&str]) -> Option<String> {
    names
        .iter()
        .find(|name| is_file(dir, name))
        .map(|name| name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn tree(files: &[&str]) -> TempDir {
        let dir = TempDir::new().unwrap();
        for file in files {
            fs::write(dir.path().join(file), "").unwrap();
        }
        dir
    }

    #[test]
    fn test_detect_cmake() {
        let dir = tree(&["CMakeLists.txt"]);
        let result = detect_build_system(dir.path());

        assert_eq!(result.kind, BuildSystemKind::CMake);
        assert_eq!(result.descriptor.as_deref(), Some("CMakeLists.txt"));
        assert!(result.files_found.cmake_lists);
    }

    #[test]
    fn test_detect_configure_script() {
        let dir = tree(&["configure"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Autotools);
    }

    #[test]
    fn test_detect_configure_ac() {
        let dir = tree(&["configure.ac", "Makefile.am"]);
        let result = detect_build_system(dir.path());

        assert_eq!(result.kind, BuildSystemKind::Autotools);
        assert_eq!(result.descriptor.as_deref(), Some("configure.ac"));
        assert!(!result.files_found.configure);
    }

    #[test]
    fn test_detect_configure_in() {
        let dir = tree(&["configure.in"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Autotools);
    }

    #[test]
    fn test_detect_makefile() {
        let dir = tree(&["Makefile"]);
        let result = detect_build_system(dir.path());

        assert_eq!(result.kind, BuildSystemKind::Make);
        assert_eq!(result.files_found.makefile.as_deref(), Some("Makefile"));
    }

    #[test]
    fn test_detect_lowercase_makefile() {
        let dir = tree(&["makefile"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Make);
    }

    #[test]
    fn test_detect_gnumakefile() {
        let dir = tree(&["GNUmakefile"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Make);
    }

    #[test]
    fn test_detect_empty_directory() {
        let dir = tree(&[]);
        let result = detect_build_system(dir.path());

        assert_eq!(result.kind, BuildSystemKind::Unknown);
        assert!(result.descriptor.is_none());
        assert_eq!(result.files_found, FilesFound::default());
    }

    #[test]
    fn test_detect_unrelated_files_only() {
        let dir = tree(&["README.md", "main.c", "Makefile.am", "meson.build"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Unknown);
    }

    #[test]
    fn test_detect_priority_cmake_over_make() {
        let dir = tree(&["CMakeLists.txt", "Makefile"]);
        let result = detect_build_system(dir.path());

        assert_eq!(result.kind, BuildSystemKind::CMake);
        assert_eq!(result.files_found.makefile.as_deref(), Some("Makefile"));
    }

    #[test]
    fn test_detect_priority_cmake_over_autotools() {
        let dir = tree(&["CMakeLists.txt", "configure.ac"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::CMake);
    }

    #[test]
    fn test_detect_priority_autotools_over_make() {
        let dir = tree(&["configure", "Makefile"]);
        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Autotools);
    }

    #[test]
    fn test_detect_ignores_directories() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("CMakeLists.txt")).unwrap();
        fs::create_dir(dir.path().join("Makefile")).unwrap();

        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Unknown);
    }

    #[test]
    fn test_detect_ignores_nested_descriptors() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/CMakeLists.txt"), "").unwrap();

        assert_eq!(detect_kind(dir.path()), BuildSystemKind::Unknown);
    }

    #[test]
    fn test_detect_is_pure() {
        let dir = tree(&["configure.ac", "Makefile"]);
        let first = detect_build_system(dir.path());
        let second = detect_build_system(dir.path());

        assert_eq!(first, second);
        // Nothing was created by detection
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
    }

    #[test]
    fn test_detect_missing_directory() {
        let result = detect_build_system(Path::new("/nonexistent/source/tree"));
        assert_eq!(result.kind, BuildSystemKind::Unknown);
    }

    #[test]
    fn test_files_found_names() {
        let dir = tree(&["configure.ac", "autogen.sh", "makefile"]);
        let result = detect_build_system(dir.path());

        assert_eq!(
            result.files_found.names(),
            vec!["configure.ac", "autogen.sh", "makefile"]
        );
    }

    #[test]
    fn test_searched_descriptors_order() {
        let searched = searched_descriptors();
        assert_eq!(searched.first(), Some(&"CMakeLists.txt"));
        assert!(searched.contains(&"configure.in"));
        assert_eq!(searched.last(), Some(&"GNUmakefile"));
    }

    #[test]
    fn test_kind_display() {
        assert_eq!(BuildSystemKind::CMake.to_string(), "cmake");
        assert_eq!(BuildSystemKind::Autotools.to_string(), "autotools");
        assert_eq!(BuildSystemKind::Make.to_string(), "make");
        assert_eq!(BuildSystemKind::Unknown.to_string(), "unknown");
    }

    #[test]
    fn test_detection_result_serialization() {
        let dir = tree(&["Makefile"]);
        let result = detect_build_system(dir.path());

        let json = serde_json::to_string(&result).unwrap();
        assert!(json.contains("\"kind\":\"make\""));
        assert!(json.contains("\"makefile\":\"Makefile\""));
    }
}
