//! Host platform capabilities
//!
//! Everything that differs between Unix-like hosts and Windows is captured
//! in a [`PlatformCapabilities`] value that is handed to the orchestrator,
//! so build plans never consult the host OS directly.

use std::path::PathBuf;
use std::process::Command;

use serde::Serialize;

/// Operating system family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    Unix,
    Windows,
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OsFamily::Unix => write!(f, "unix"),
            OsFamily::Windows => write!(f, "windows"),
        }
    }
}

/// Platform-dependent choices for build protocols and artifact collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformCapabilities {
    pub os: OsFamily,
    /// CMake generator (`None` lets CMake pick its native default)
    pub cmake_generator: Option<String>,
    /// CMake `-A` platform argument
    pub cmake_arch: Option<String>,
    /// Default make program
    pub make_program: String,
    /// Shell used to run `configure` / `autogen.sh` (`None` = execute directly)
    pub script_shell: Option<String>,
    /// File extensions that mark an executable artifact
    pub executable_extensions: Vec<String>,
    /// File extensions that mark a library artifact
    pub library_extensions: Vec<String>,
}

impl PlatformCapabilities {
    /// Capabilities of the host this process runs on
    pub fn host() -> Self {
        if cfg!(windows) {
            Self::windows()
        } else {
            Self::unix()
        }
    }

    /// Unix-like hosts (Linux, macOS, BSD)
    pub fn unix() -> Self {
        Self {
            os: OsFamily::Unix,
            cmake_generator: Some("Unix Makefiles".to_string()),
            cmake_arch: None,
            make_program: "make".to_string(),
            script_shell: None,
            // Unix executables carry no extension; they are recognised by mode and magic
            executable_extensions: Vec::new(),
            library_extensions: vec!["so".to_string(), "a".to_string(), "dylib".to_string()],
        }
    }

    /// Windows hosts with Visual Studio Build Tools and a MinGW make
    pub fn windows() -> Self {
        Self {
            os: OsFamily::Windows,
            cmake_generator: None,
            cmake_arch: Some("x64".to_string()),
            make_program: "mingw32-make".to_string(),
            script_shell: Some("sh".to_string()),
            executable_extensions: vec!["exe".to_string()],
            library_extensions: vec!["dll".to_string(), "lib".to_string()],
        }
    }

    pub fn is_windows(&self) -> bool {
        self.os == OsFamily::Windows
    }
}

/// Locate MSBuild through `vswhere`, falling back to well-known install paths
///
/// Only meaningful on Windows; returns `None` elsewhere.
pub fn find_msbuild() -> Option<PathBuf> {
    if !cfg!(windows) {
        return None;
    }

    let program_files = std::env::var("ProgramFiles(x86)")
        .unwrap_or_else(|_| r"C:\Program Files (x86)".to_string());
    let vswhere = PathBuf::from(&program_files)
        .join("Microsoft Visual Studio")
        .join("Installer")
        .join("vswhere.exe");

    if vswhere.exists() {
        let output = Command::new(&vswhere)
            .args([
                "-latest",
                "-products",
                "*",
                "-requires",
                "Microsoft.VisualStudio.Component.VC.Tools.x86.x64",
                "-property",
                "installationPath",
            ])
            .output();
        match output {
            Ok(output) if output.status.success() => {
                let install = String::from_utf8_lossy(&output.stdout).trim().to_string();
                if !install.is_empty() {
                    let msbuild = PathBuf::from(install)
                        .join("MSBuild")
                        .join("Current")
                        .join("Bin")
                        .join("MSBuild.exe");
                    if msbuild.exists() {
                        return Some(msbuild);
                    }
                }
            }
            Ok(_) => tracing::debug!("vswhere found no Visual Studio installation"),
            Err(e) => tracing::debug!("Failed to run vswhere: {}", e),
        }
    }

    const COMMON_PATHS: &[&str] = &[
        r"C:\Program Files\Microsoft Visual Studio\2022\Community\MSBuild\Current\Bin\MSBuild.exe",
        r"C:\Program Files\Microsoft Visual Studio\2022\BuildTools\MSBuild\Current\Bin\MSBuild.exe",
        r"C:\Program Files (x86)\Microsoft Visual Studio\2022\BuildTools\MSBuild\Current\Bin\MSBuild.exe",
        r"C:\Program Files (x86)\Microsoft Visual Studio\2019\BuildTools\MSBuild\Current\Bin\MSBuild.exe",
        r"C:\Program Files (x86)\Microsoft Visual Studio\2019\Community\MSBuild\Current\Bin\MSBuild.exe",
    ];

    COMMON_PATHS.iter().map(PathBuf::from).find(|p| p.exists())
}
