//! Workspace layout
//!
//! Every project gets three tiers under the working root:
//!
//! ```text
//! <root>/source/<name>/   cloned sources
//! <root>/build/<name>/    scratch space for out-of-tree builds
//! <root>/output/<name>/   collected artifacts
//! ```

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::WorkspaceError;

/// A project and its three directories
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Project {
    pub name: String,
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
    pub output_dir: PathBuf,
}

impl Project {
    /// The three tier directories in layout order
    pub fn tiers(&self) -> [&Path; 3] {
        [&self.source_dir, &self.build_dir, &self.output_dir]
    }
}

/// Owner of the working root
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Create a workspace rooted at `root` (relative roots are made absolute)
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let root = if root.is_absolute() {
            root
        } else {
            match std::env::current_dir() {
                Ok(cwd) => cwd.join(root),
                Err(e) => {
                    tracing::warn!("Failed to resolve current directory: {}", e);
                    root
                }
            }
        };
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Describe the project for a repository URL without touching the disk
    pub fn project(&self, url: &str, branch: Option<&str>) -> Result<Project, WorkspaceError> {
        let name = project_name_from_url(url)
            .ok_or_else(|| WorkspaceError::InvalidProjectName(url.to_string()))?;

        Ok(Project {
            source_dir: self.root.join("source").join(&name),
            build_dir: self.root.join("build").join(&name),
            output_dir: self.root.join("output").join(&name),
            name,
            url: url.to_string(),
            branch: branch.map(str::to_string),
        })
    }

    /// Create the tier directories if absent
    pub fn prepare(&self, project: &Project) -> Result<(), WorkspaceError> {
        for dir in project.tiers() {
            std::fs::create_dir_all(dir).map_err(|source| WorkspaceError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        tracing::debug!("Prepared workspace for {} under {}", project.name, self.root.display());
        Ok(())
    }

    /// Empty the build and output tiers, leaving them in place
    pub fn clean(&self, project: &Project) -> Result<(), WorkspaceError> {
        for dir in [&project.build_dir, &project.output_dir] {
            if dir.exists() {
                std::fs::remove_dir_all(dir).map_err(|source| WorkspaceError::Clean {
                    path: dir.clone(),
                    source,
                })?;
            }
            std::fs::create_dir_all(dir).map_err(|source| WorkspaceError::CreateDir {
                path: dir.clone(),
                source,
            })?;
        }
        tracing::info!("Cleaned build and output directories for {}", project.name);
        Ok(())
    }
}

/// Derive a project name from the last path segment of a repository URL
///
/// Handles `https://host/org/repo.git`, `git@host:org/repo.git`, trailing
/// slashes and local paths.
pub fn project_name_from_url(url: &str) -> Option<String> {
    let trimmed = url.trim().trim_end_matches(['/', '\\']);
    let last = trimmed
        .rsplit(['/', '\\', ':'])
        .next()
        .unwrap_or(trimmed);
    let name = last.strip_suffix(".git").unwrap_or(last);

    if name.is_empty() || name == "." || name == ".." {
        None
    } else {
        Some(name.to_string())
    }
}
