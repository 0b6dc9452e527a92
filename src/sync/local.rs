//! Local file index.
//!
//! Scans an output directory for resource files and their `.meta` sidecars.
//! Flat resource types live directly in the directory; tree types (theme
//! assets) are walked recursively below a fixed set of subdirectories.

use crate::error::{Result, SyncError};
use ignore::WalkBuilder;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

/// Suffix appended to a resource file's full name for its metadata sidecar.
pub const SIDECAR_SUFFIX: &str = ".meta";

/// How a resource type is laid out on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// `<dir>/<handle><ext>`
    Flat,
    /// `<dir>/<subdir>/.../<file>`, handle is the `/`-joined relative path
    Tree { subdirs: &'static [&'static str] },
}

/// One resource materialized on disk.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalFile<M> {
    pub handle: String,
    pub file_path: PathBuf,
    pub metadata: Option<M>,
}

impl<M> LocalFile<M> {
    pub fn sidecar_path(&self) -> PathBuf {
        sidecar_path(&self.file_path)
    }
}

/// `<file>.meta`
pub fn sidecar_path(file_path: &Path) -> PathBuf {
    let mut name: OsString = file_path.as_os_str().to_owned();
    name.push(SIDECAR_SUFFIX);
    PathBuf::from(name)
}

/// Local path for a handle under `dir`.
///
/// Handles come from the remote store, so anything that would resolve
/// outside `dir` is rejected with [`SyncError::InvalidResource`].
pub fn resource_path(dir: &Path, layout: Layout, handle: &str, extension: &str) -> Result<PathBuf> {
    validate_handle(handle, layout)?;
    Ok(match layout {
        Layout::Flat => dir.join(format!("{}{}", handle, extension)),
        Layout::Tree { .. } => handle.split('/').fold(dir.to_path_buf(), |p, c| p.join(c)),
    })
}

/// A handle must name a path strictly below the resource directory.
///
/// Flat handles are a single file name. Tree handles are `/`-separated
/// relative paths without empty, `.` or `..` segments.
pub fn validate_handle(handle: &str, layout: Layout) -> Result<()> {
    let invalid = |reason: &str| SyncError::InvalidResource {
        handle: handle.to_string(),
        reason: reason.to_string(),
    };

    if handle.is_empty() {
        return Err(invalid("empty handle"));
    }
    if handle.contains('\\') || handle.contains('\0') {
        return Err(invalid("handle contains a backslash or NUL"));
    }
    if matches!(layout, Layout::Flat) && handle.contains('/') {
        return Err(invalid("handle contains a path separator"));
    }
    for segment in handle.split('/') {
        match segment {
            "" => return Err(invalid("handle has an empty path segment")),
            "." | ".." => return Err(invalid("handle escapes the output directory")),
            _ => {}
        }
    }
    let only_normal = Path::new(handle)
        .components()
        .all(|c| matches!(c, Component::Normal(_)));
    if !only_normal {
        return Err(invalid("handle is not a relative path"));
    }
    Ok(())
}

/// Collect resource files below `dir`, sorted by handle.
///
/// A missing directory yields an empty list. Unreadable or malformed
/// sidecars are logged and reported as `metadata: None`.
pub fn collect_local_files<M>(
    dir: &Path,
    layout: Layout,
    extension: &str,
) -> Result<Vec<LocalFile<M>>>
where
    M: DeserializeOwned,
{
    Ok(list_local_handles(dir, layout, extension)?
        .into_iter()
        .map(|(handle, file_path)| {
            let metadata = read_sidecar(&file_path);
            LocalFile {
                handle,
                file_path,
                metadata,
            }
        })
        .collect())
}

/// `(handle, path)` pairs below `dir`, sorted by handle, without reading sidecars.
pub fn list_local_handles(
    dir: &Path,
    layout: Layout,
    extension: &str,
) -> Result<Vec<(String, PathBuf)>> {
    if !dir.is_dir() {
        tracing::debug!("{} does not exist, nothing to collect", dir.display());
        return Ok(Vec::new());
    }

    let mut found = match layout {
        Layout::Flat => scan_flat(dir, extension)?,
        Layout::Tree { subdirs } => scan_tree(dir, subdirs)?,
    };
    found.sort_by(|a, b| a.0.cmp(&b.0));
    Ok(found)
}

fn scan_flat(dir: &Path, extension: &str) -> Result<Vec<(String, PathBuf)>> {
    let entries = std::fs::read_dir(dir).map_err(|e| SyncError::io(dir, e))?;
    let mut found = Vec::new();

    for entry in entries {
        let entry = entry.map_err(|e| SyncError::io(dir, e))?;
        let file_type = entry.file_type().map_err(|e| SyncError::io(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            tracing::warn!("Skipping non UTF-8 file name {:?}", entry.path());
            continue;
        };
        if name.ends_with(SIDECAR_SUFFIX) {
            continue;
        }
        let Some(handle) = name.strip_suffix(extension) else {
            continue;
        };
        if handle.is_empty() {
            continue;
        }
        found.push((handle.to_string(), entry.path()));
    }

    Ok(found)
}

fn scan_tree(dir: &Path, subdirs: &[&str]) -> Result<Vec<(String, PathBuf)>> {
    let mut found = Vec::new();

    for subdir in subdirs {
        let root = dir.join(subdir);
        if !root.is_dir() {
            continue;
        }

        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .ignore(false)
            .git_ignore(false)
            .git_global(false)
            .git_exclude(false)
            .parents(false)
            .follow_links(false)
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| SyncError::io(&root, std::io::Error::other(e)))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let path = entry.path();
            if path.to_string_lossy().ends_with(SIDECAR_SUFFIX) {
                continue;
            }
            let Ok(relative) = path.strip_prefix(dir) else {
                continue;
            };
            let parts: Option<Vec<&str>> = relative
                .components()
                .map(|c| c.as_os_str().to_str())
                .collect();
            let Some(parts) = parts else {
                tracing::warn!("Skipping non UTF-8 path {}", path.display());
                continue;
            };
            found.push((parts.join("/"), path.to_path_buf()));
        }
    }

    Ok(found)
}

/// Load a sidecar, or `None` with a warning when absent or malformed.
pub fn read_sidecar<M: DeserializeOwned>(file_path: &Path) -> Option<M> {
    let path = sidecar_path(file_path);
    let text = match std::fs::read_to_string(&path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("No metadata sidecar for {}, using defaults", file_path.display());
            return None;
        }
        Err(e) => {
            tracing::warn!("Cannot read {}: {}", path.display(), e);
            return None;
        }
    };
    match serde_json::from_str(&text) {
        Ok(metadata) => Some(metadata),
        Err(e) => {
            tracing::warn!("Ignoring malformed sidecar {}: {}", path.display(), e);
            None
        }
    }
}

/// Atomically write `contents` to `path`, creating parent directories.
pub fn write_atomic(path: &Path, contents: &[u8]) -> Result<()> {
    use std::io::Write;

    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent).map_err(|e| SyncError::io(parent, e))?;

    let mut temp = tempfile::NamedTempFile::new_in(parent).map_err(|e| SyncError::io(parent, e))?;
    temp.write_all(contents).map_err(|e| SyncError::io(temp.path(), e))?;
    temp.persist(path).map_err(|e| SyncError::io(path, e.error))?;
    Ok(())
}

/// Serialize `metadata` as pretty JSON next to `file_path`.
pub fn write_sidecar<M: Serialize>(file_path: &Path, metadata: &M) -> Result<()> {
    let mut json = serde_json::to_vec_pretty(metadata)?;
    json.push(b'\n');
    write_atomic(&sidecar_path(file_path), &json)
}

/// Remove a resource file and its sidecar. Already-absent files are fine.
pub fn remove_with_sidecar(file_path: &Path) -> Result<()> {
    for path in [file_path.to_path_buf(), sidecar_path(file_path)] {
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(SyncError::io(path, e)),
        }
    }
    Ok(())
}
