//! Source fetching
//!
//! Puts a repository's sources into the source tier of a project. The git
//! fetcher clones on first use and updates an existing checkout in place;
//! the local source is used when fetching is skipped.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;

use crate::buildsys::path_arg;
use crate::config::Config;
use crate::error::{BuildError, FetchError};
use crate::executor::{exec_command, render_command, ExecOptions, ExecResult};
use crate::workspace::Project;

/// Provides the source tree of a project
#[async_trait]
pub trait SourceFetcher: Send + Sync {
    /// Make the sources available and return the source directory
    async fn fetch(&self, project: &Project) -> Result<PathBuf, FetchError>;
}

/// Fetches sources with the git command line client
#[derive(Debug, Clone)]
pub struct GitFetcher {
    git: String,
    timeout: Option<Duration>,
    stream: bool,
}

impl Default for GitFetcher {
    fn default() -> Self {
        Self::new("git")
    }
}

impl GitFetcher {
    pub fn new(git: impl Into<String>) -> Self {
        Self {
            git: git.into(),
            timeout: None,
            stream: false,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.tools.git).with_timeout(config.step_timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    async fn clone_into(&self, project: &Project) -> Result<(), FetchError> {
        let dest = &project.source_dir;
        let parent = dest.parent().unwrap_or(dest);

        let mut args = vec!["clone".to_string()];
        if let Some(ref branch) = project.branch {
            args.push("--branch".to_string());
            args.push(branch.clone());
        }
        args.push(project.url.clone());
        args.push(path_arg(dest));

        tracing::info!("Cloning {} into {}", project.url, dest.display());
        self.git(args.as_slice(), parent).await
    }

    async fn update(&self, project: &Project) -> Result<(), FetchError> {
        let dir = &project.source_dir;
        tracing::info!("Updating existing checkout in {}", dir.display());

        self.git(&["fetch", "--tags", "origin"], dir).await?;
        if let Some(ref branch) = project.branch {
            self.git(&["checkout", branch.as_str()], dir).await?;
        }

        // Tags and commits check out as a detached HEAD with nothing to pull
        if self.on_branch(dir).await? {
            self.git(&["pull", "--ff-only"], dir).await
        } else {
            tracing::info!("HEAD is detached in {}, skipping pull", dir.display());
            Ok(())
        }
    }

    async fn on_branch(&self, dir: &Path) -> Result<bool, FetchError> {
        let args = ["symbolic-ref", "-q", "HEAD"];
        let result = self.run_git(&args, dir).await?;
        match result.exit_code {
            Some(0) => Ok(true),
            Some(1) => Ok(false),
            exit_code => Err(FetchError::CommandFailed {
                command: render_command(&self.git, &args),
                exit_code,
                output: result.output,
            }),
        }
    }

    /// Run one git command that must succeed
    async fn git<S: AsRef<str>>(&self, args: &[S], dir: &Path) -> Result<(), FetchError> {
        let result = self.run_git(args, dir).await?;
        if result.success {
            Ok(())
        } else {
            Err(FetchError::CommandFailed {
                command: render_command(&self.git, args),
                exit_code: result.exit_code,
                output: result.output,
            })
        }
    }

    /// Run one git command, mapping a failure to start or finish it to a fetch error
    async fn run_git<S: AsRef<str>>(
        &self,
        args: &[S],
        dir: &Path,
    ) -> Result<ExecResult, FetchError> {
        let options = ExecOptions::in_dir(dir)
            .with_optional_timeout(self.timeout)
            .with_stream(self.stream)
            .with_env("GIT_TERMINAL_PROMPT", "0");

        exec_command(&self.git, args, &options)
            .await
            .map_err(|e| match e {
                BuildError::Timeout {
                    command,
                    timeout_secs,
                    ..
                } => FetchError::Timeout {
                    command,
                    timeout_secs,
                },
                other => FetchError::GitUnavailable(other.to_string()),
            })
    }
}

#[async_trait]
impl SourceFetcher for GitFetcher {
    async fn fetch(&self, project: &Project) -> Result<PathBuf, FetchError> {
        let dir = &project.source_dir;

        if dir.join(".git").exists() {
            self.update(project).await?;
        } else if is_non_empty_dir(dir) {
            return Err(FetchError::NotARepository(dir.clone()));
        } else {
            self.clone_into(project).await?;
        }

        self.git(&["submodule", "update", "--init", "--recursive"], dir)
            .await?;

        Ok(dir.clone())
    }
}

/// Uses whatever is already in the source tier
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSource;

#[async_trait]
impl SourceFetcher for LocalSource {
    async fn fetch(&self, project: &Project) -> Result<PathBuf, FetchError> {
        let dir = &project.source_dir;
        if !is_non_empty_dir(dir) {
            return Err(FetchError::SourceMissing(dir.clone()));
        }
        tracing::info!("Skipping fetch, using sources in {}", dir.display());
        Ok(dir.clone())
    }
}

fn is_non_empty_dir(dir: &Path) -> bool {
    std::fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}
