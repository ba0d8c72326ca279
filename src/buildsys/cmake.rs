//! CMake protocol
//!
//! Out-of-tree build in two steps, both run from the build directory:
//!
//! ```text
//! cmake -S <source> -B <build> [-G <generator>] [-A <arch>] -DCMAKE_BUILD_TYPE=<cfg> -DCMAKE_INSTALL_PREFIX=<output>
//! cmake --build <build> --config <cfg> [--parallel N]
//! ```
//!
//! An optional `cmake --install` step installs into the output tier.

use super::detect::BuildSystemKind;
use super::path_arg;
use super::traits::{BuildCommand, BuildProtocol, BuildStep};
use crate::config::Config;
use crate::platform::PlatformCapabilities;
use crate::workspace::Project;

/// CMake protocol settings
#[derive(Debug, Clone)]
pub struct CMakeProtocol {
    cmake: String,
    build_config: String,
    generator: Option<String>,
    extra_args: Vec<String>,
    jobs: usize,
    install: bool,
}

impl Default for CMakeProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl CMakeProtocol {
    /// Protocol using system `cmake` and a Release configuration
    pub fn new() -> Self {
        Self {
            cmake: "cmake".to_string(),
            build_config: "Release".to_string(),
            generator: None,
            extra_args: Vec::new(),
            jobs: 0,
            install: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            cmake: config.tools.cmake.clone(),
            build_config: config.build.cmake_config.clone(),
            generator: Some(config.build.cmake_generator.clone()).filter(|g| !g.is_empty()),
            extra_args: config.build.cmake_args.clone(),
            jobs: config.build.jobs,
            install: config.build.install,
        }
    }

    /// Override the platform's generator
    pub fn with_generator(mut self, generator: impl Into<String>) -> Self {
        self.generator = Some(generator.into());
        self
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }
}

impl BuildProtocol for CMakeProtocol {
    fn kind(&self) -> BuildSystemKind {
        BuildSystemKind::CMake
    }

    fn plan(&self, project: &Project, platform: &PlatformCapabilities) -> BuildCommand {
        let source = path_arg(&project.source_dir);
        let build = path_arg(&project.build_dir);
        let output = path_arg(&project.output_dir);

        let mut configure = BuildStep::new("configure", &self.cmake, &project.build_dir)
            .args(["-S", source.as_str(), "-B", build.as_str()]);

        match self.generator {
            Some(ref generator) => {
                configure = configure.args(["-G", generator.as_str()]);
            }
            None => {
                if let Some(ref generator) = platform.cmake_generator {
                    configure = configure.args(["-G", generator.as_str()]);
                }
                // The -A platform only applies to the native generator
                if let Some(ref arch) = platform.cmake_arch {
                    configure = configure.args(["-A", arch.as_str()]);
                }
            }
        }

        configure = configure
            .arg(format!("-DCMAKE_BUILD_TYPE={}", self.build_config))
            .arg(format!("-DCMAKE_INSTALL_PREFIX={}", output))
            .args(self.extra_args.iter().cloned());

        let mut build_step = BuildStep::new("build", &self.cmake, &project.build_dir)
            .args(["--build", build.as_str(), "--config", self.build_config.as_str()]);
        if self.jobs > 0 {
            build_step = build_step.args(["--parallel".to_string(), self.jobs.to_string()]);
        }

        let mut steps = vec![configure, build_step];

        if self.install {
            steps.push(
                BuildStep::new("install", &self.cmake, &project.build_dir)
                    .args([
                        "--install",
                        build.as_str(),
                        "--config",
                        self.build_config.as_str(),
                        "--prefix",
                        output.as_str(),
                    ])
                    .optional(),
            );
        }

        BuildCommand::new(BuildSystemKind::CMake, steps)
    }

    fn builds_in_source(&self) -> bool {
        false
    }
}
