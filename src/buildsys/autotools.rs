//! Autotools protocol
//!
//! Runs in the source directory:
//! 1. bootstrap, only when no `configure` script ships with the tree:
//!    `./autogen.sh` if present, otherwise `autoreconf -fi`
//! 2. `./configure --prefix=<output>`
//! 3. `make`
//! 4. `make install` (optional, when enabled)

use std::path::Path;

use super::detect::BuildSystemKind;
use super::make::MakeProtocol;
use super::path_arg;
use super::traits::{BuildCommand, BuildProtocol, BuildStep};
use crate::config::Config;
use crate::platform::PlatformCapabilities;
use crate::workspace::Project;

/// Autotools protocol settings
#[derive(Debug, Clone)]
pub struct AutotoolsProtocol {
    autoreconf: String,
    make: MakeProtocol,
    configure_args: Vec<String>,
    install: bool,
}

impl Default for AutotoolsProtocol {
    fn default() -> Self {
        Self::new()
    }
}

impl AutotoolsProtocol {
    pub fn new() -> Self {
        Self {
            autoreconf: "autoreconf".to_string(),
            make: MakeProtocol::new(),
            configure_args: Vec::new(),
            install: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self {
            autoreconf: config.tools.autoreconf.clone(),
            make: MakeProtocol::from_config(config),
            configure_args: config.build.configure_args.clone(),
            install: config.build.install,
        }
    }

    /// Extra arguments passed to ./configure
    pub fn with_configure_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.configure_args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_install(mut self, install: bool) -> Self {
        self.install = install;
        self
    }

    /// Step running a shell script shipped with the source tree
    fn script_step(
        label: &str,
        script: &Path,
        project: &Project,
        platform: &PlatformCapabilities,
    ) -> BuildStep {
        match platform.script_shell {
            Some(ref shell) => {
                BuildStep::new(label, shell, &project.source_dir).arg(path_arg(script))
            }
            None => BuildStep::new(label, path_arg(script), &project.source_dir),
        }
    }
}

impl BuildProtocol for AutotoolsProtocol {
    fn kind(&self) -> BuildSystemKind {
        BuildSystemKind::Autotools
    }

    fn plan(&self, project: &Project, platform: &PlatformCapabilities) -> BuildCommand {
        let source = &project.source_dir;
        let mut steps = Vec::new();

        if !source.join("configure").is_file() {
            let autogen = source.join("autogen.sh");
            if autogen.is_file() {
                steps.push(Self::script_step("bootstrap", &autogen, project, platform));
            } else {
                steps.push(BuildStep::new("bootstrap", &self.autoreconf, source).arg("-fi"));
            }
        }

        steps.push(
            Self::script_step("configure", &source.join("configure"), project, platform)
                .arg(format!("--prefix={}", path_arg(&project.output_dir)))
                .args(self.configure_args.iter().cloned()),
        );

        steps.push(self.make.make_step(project, platform));

        if self.install {
            let mut install = self.make.make_step(project, platform).arg("install").optional();
            install.label = "install".to_string();
            steps.push(install);
        }

        BuildCommand::new(BuildSystemKind::Autotools, steps)
    }

    fn builds_in_source(&self) -> bool {
        true
    }
}
