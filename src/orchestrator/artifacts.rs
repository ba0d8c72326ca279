//! Artifact collection
//!
//! After a successful build the artifact root (build directory for
//! out-of-tree builds, source directory otherwise) is scanned for
//! executables and libraries, which are copied into the output tier with
//! their relative paths preserved.
//!
//! Recognition per platform:
//! - Unix: `*.so`, `*.so.*`, `*.a`, `*.dylib`, and files with an execute bit
//!   whose first bytes are an ELF or Mach-O magic number
//! - Windows: `*.exe`, `*.dll`, `*.lib`

use std::collections::HashMap;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use walkdir::{DirEntry, WalkDir};

use crate::platform::PlatformCapabilities;

/// Directories never descended into
const SKIPPED_DIRS: &[&str] = &["CMakeFiles", ".git", ".deps", "autom4te.cache"];

/// Intermediate objects that are never artifacts
const OBJECT_EXTENSIONS: &[&str] = &["o", "obj", "lo", "la"];

const BINARY_MAGICS: &[[u8; 4]] = &[
    [0x7f, b'E', b'L', b'F'],
    [0xfe, 0xed, 0xfa, 0xce],
    [0xfe, 0xed, 0xfa, 0xcf],
    [0xce, 0xfa, 0xed, 0xfe],
    [0xcf, 0xfa, 0xed, 0xfe],
    [0xca, 0xfe, 0xba, 0xbe],
];

/// Kind of collected artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    Executable,
    Library,
}

/// An artifact copied into the output tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectedArtifact {
    /// Path relative to both the artifact root and the output directory
    pub relative_path: PathBuf,
    pub kind: ArtifactKind,
    pub size: u64,
}

/// Result of a collection pass
#[derive(Debug, Clone, Default)]
pub struct CollectionReport {
    pub artifacts: Vec<CollectedArtifact>,
    /// Copy or scan failures, reported as warnings
    pub failures: Vec<String>,
}

/// File modification times taken before an in-source build
#[derive(Debug, Clone, Default)]
pub struct ArtifactSnapshot {
    files: HashMap<PathBuf, Option<SystemTime>>,
}

impl ArtifactSnapshot {
    /// Record every file under `root`
    pub fn capture(root: &Path) -> Self {
        let files = walk(root)
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let relative = entry.path().strip_prefix(root).ok()?.to_path_buf();
                let modified = entry.metadata().ok().and_then(|m| m.modified().ok());
                Some((relative, modified))
            })
            .collect();
        Self { files }
    }

    /// Whether a file existed before the build with the same modification time
    pub fn is_unchanged(&self, relative: &Path, modified: Option<SystemTime>) -> bool {
        matches!(self.files.get(relative), Some(before) if *before == modified)
    }

    pub(crate) fn len(&self) -> usize {
        self.files.len()
    }
}

/// Classify a file as an artifact for the given platform
pub fn classify(path: &Path, platform: &PlatformCapabilities) -> Option<ArtifactKind> {
    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    let has_ext = |list: &[String]| list.iter().any(|e| *e == ext);

    if OBJECT_EXTENSIONS.contains(&ext.as_str()) {
        return None;
    }

    if platform.is_windows() {
        if has_ext(&platform.executable_extensions) {
            return Some(ArtifactKind::Executable);
        }
        if has_ext(&platform.library_extensions) {
            return Some(ArtifactKind::Library);
        }
        return None;
    }

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default();
    if has_ext(&platform.library_extensions) || name.contains(".so.") {
        return Some(ArtifactKind::Library);
    }

    if is_executable_file(path) && has_binary_magic(path) {
        return Some(ArtifactKind::Executable);
    }

    None
}

/// Scan `root` and copy artifacts into `output`
///
/// With a snapshot, files that are unchanged since the snapshot are skipped,
/// so prebuilt binaries shipped in a source tree are not collected.
pub fn collect_artifacts(
    root: &Path,
    output: &Path,
    platform: &PlatformCapabilities,
    snapshot: Option<&ArtifactSnapshot>,
) -> CollectionReport {
    let mut report = CollectionReport::default();

    for entry in walk(root) {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                report.failures.push(format!("Failed to scan build tree: {}", e));
                continue;
            }
        };

        if !entry.file_type().is_file() || entry.path().starts_with(output) {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let metadata = match entry.metadata() {
            Ok(m) => m,
            Err(e) => {
                report
                    .failures
                    .push(format!("Failed to read {}: {}", relative.display(), e));
                continue;
            }
        };

        if let Some(snapshot) = snapshot {
            if snapshot.is_unchanged(relative, metadata.modified().ok()) {
                continue;
            }
        }

        let Some(kind) = classify(entry.path(), platform) else {
            continue;
        };

        match copy_preserving(entry.path(), &output.join(relative)) {
            Ok(()) => {
                tracing::debug!("Collected {} artifact {}", kind_name(kind), relative.display());
                report.artifacts.push(CollectedArtifact {
                    relative_path: relative.to_path_buf(),
                    kind,
                    size: metadata.len(),
                });
            }
            Err(e) => {
                tracing::warn!("Failed to copy artifact {}: {}", relative.display(), e);
                report
                    .failures
                    .push(format!("Failed to copy {}: {}", relative.display(), e));
            }
        }
    }

    report.artifacts.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    report
}

fn walk(root: &Path) -> impl Iterator<Item = walkdir::Result<DirEntry>> {
    WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !is_skipped_dir(e))
}

fn is_skipped_dir(entry: &DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| SKIPPED_DIRS.contains(&name))
            .unwrap_or(false)
}

fn copy_preserving(from: &Path, to: &Path) -> std::io::Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::copy(from, to)?;
    Ok(())
}

fn kind_name(kind: ArtifactKind) -> &'static str {
    match kind {
        ArtifactKind::Executable => "executable",
        ArtifactKind::Library => "library",
    }
}

#[cfg(unix)]
fn is_executable_file(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable_file(_path: &Path) -> bool {
    true
}

fn has_binary_magic(path: &Path) -> bool {
    let mut magic = [0u8; 4];
    match fs::File::open(path).and_then(|mut f| f.read_exact(&mut magic)) {
        Ok(()) => BINARY_MAGICS.contains(&magic),
        Err(_) => false,
    }
}

/// Relative paths of collected artifacts, for display
pub fn artifact_paths(artifacts: &[CollectedArtifact]) -> Vec<PathBuf> {
    artifacts.iter().map(|a| a.relative_path.clone()).collect()
}
