//! Environment checks
//!
//! Verifies that the tools the pipeline shells out to are reachable and
//! prints installation guidance for the ones that are not.

use std::path::{Path, PathBuf};

use colored::Colorize;
use serde::Serialize;

use crate::config::Config;
use crate::executor::ToolLocator;
use crate::platform::{find_msbuild, PlatformCapabilities};

/// Result of checking one tool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ToolCheck {
    /// Display name (e.g. "CMake")
    pub name: String,
    /// Program that was looked up
    pub program: String,
    /// Whether builds cannot run at all without it
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guidance: Option<String>,
}

impl ToolCheck {
    pub fn found(&self) -> bool {
        self.path.is_some()
    }
}

/// All tool checks for a host
#[derive(Debug, Clone, Serialize)]
pub struct DoctorReport {
    pub platform: String,
    pub checks: Vec<ToolCheck>,
}

impl DoctorReport {
    /// Whether every required tool was found
    pub fn is_healthy(&self) -> bool {
        self.checks.iter().all(|c| c.found() || !c.required)
    }

    /// Names of tools that were not found
    pub fn missing(&self) -> Vec<&str> {
        self.checks
            .iter()
            .filter(|c| !c.found())
            .map(|c| c.name.as_str())
            .collect()
    }

    pub fn render_text(&self) -> String {
        let mut out = format!("{}: {}\n", "Platform".cyan(), self.platform);
        for check in &self.checks {
            match check.path {
                Some(ref path) => out.push_str(&format!(
                    "{} {} found at {}\n",
                    "✓".green(),
                    check.name,
                    path.display()
                )),
                None => {
                    let marker = if check.required {
                        "✗".red()
                    } else {
                        "!".yellow()
                    };
                    out.push_str(&format!("{} {} not found\n", marker, check.name));
                    if let Some(ref guidance) = check.guidance {
                        for line in guidance.lines() {
                            out.push_str(&format!("    {}\n", line));
                        }
                    }
                }
            }
        }
        out
    }
}

/// Check every tool the build protocols may need
pub fn run_doctor(
    config: &Config,
    platform: &PlatformCapabilities,
    locator: &dyn ToolLocator,
) -> DoctorReport {
    let windows = platform.is_windows();
    let make = if config.tools.make.is_empty() {
        platform.make_program.clone()
    } else {
        config.tools.make.clone()
    };

    let mut checks = vec![
        check(locator, "Git", &config.tools.git, true, git_guidance(windows)),
        check(locator, "Make", &make, true, make_guidance(windows)),
        check(locator, "CMake", &config.tools.cmake, true, cmake_guidance(windows)),
        check(
            locator,
            "Autoreconf",
            &config.tools.autoreconf,
            false,
            "Needed only for Autotools projects without a configure script.\nInstall autoconf, automake and libtool using your package manager.".to_string(),
        ),
    ];

    if windows {
        let path = find_msbuild();
        checks.push(ToolCheck {
            name: "MSBuild".to_string(),
            program: "MSBuild.exe".to_string(),
            required: true,
            guidance: path.is_none().then(msbuild_guidance),
            path,
        });
    } else {
        checks.push(check(
            locator,
            "C compiler",
            "cc",
            true,
            "No C compiler found. Install gcc or clang using your package manager.".to_string(),
        ));
    }

    DoctorReport {
        platform: platform.os.to_string(),
        checks,
    }
}

fn check(
    locator: &dyn ToolLocator,
    name: &str,
    program: &str,
    required: bool,
    guidance: String,
) -> ToolCheck {
    let path = locator.locate(program, Path::new("."));
    tracing::debug!("Looked up {}: {:?}", program, path);
    ToolCheck {
        name: name.to_string(),
        program: program.to_string(),
        required,
        guidance: path.is_none().then_some(guidance),
        path,
    }
}

fn git_guidance(windows: bool) -> String {
    if windows {
        "1. Download from: https://git-scm.com/download/win\n2. Run the installer and select \"Add to PATH\"".to_string()
    } else {
        "Install git using your package manager.".to_string()
    }
}

fn make_guidance(windows: bool) -> String {
    if windows {
        "Install MinGW-w64 (mingw32-make) or Cygwin and add it to PATH.".to_string()
    } else {
        "Install make using your package manager.".to_string()
    }
}

fn cmake_guidance(windows: bool) -> String {
    if windows {
        "1. Download from: https://cmake.org/download/\n2. Choose the Windows x64 Installer\n3. During installation, select \"Add CMake to system PATH\"".to_string()
    } else {
        "Install cmake using your package manager.".to_string()
    }
}

fn msbuild_guidance() -> String {
    "1. Download Visual Studio Build Tools 2022:\n   https://aka.ms/vs/17/release/vs_buildtools.exe\n2. Select \"Desktop development with C++\" with MSVC Build Tools, the Windows 10/11 SDK and C++ CMake tools\n3. Complete the installation and restart".to_string()
}
