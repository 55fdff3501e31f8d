//! Filesystem primitives used by directory views.
//!
//! Everything here is synchronous; callers running on the async runtime
//! are expected to hop onto a blocking thread first.

use std::fs::Metadata;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use walkdir::WalkDir;

use crate::error::{DirTunnelError, EntityAccessError, NavigationError};
use crate::Result;

/// Kind of a listed or walked filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntityKind {
    File,
    Directory,
}

impl EntityKind {
    fn of(metadata: &Metadata) -> Self {
        if metadata.is_dir() {
            EntityKind::Directory
        } else {
            EntityKind::File
        }
    }

    /// Lowercase name used in stat output.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::File => "file",
            EntityKind::Directory => "directory",
        }
    }
}

/// An immediate child of a directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildEntry {
    pub kind: EntityKind,
    pub path: PathBuf,
}

/// A descendant found by [`walk`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalkedEntry {
    pub kind: EntityKind,
    /// Path relative to the base passed to [`walk`].
    pub relative_path: String,
    pub size: u64,
    /// Depth below the walked directory; immediate children have depth 1.
    pub depth: usize,
}

/// Metadata snapshot of a single entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityStat {
    pub kind: EntityKind,
    pub name: String,
    pub size: u64,
    pub modified: Option<DateTime<Utc>>,
    pub mode: String,
}

impl EntityStat {
    /// Render as `key: value;` lines.
    pub fn render(&self) -> String {
        let modified = self
            .modified
            .map(|t| t.to_rfc3339_opts(SecondsFormat::Secs, true))
            .unwrap_or_else(|| "unknown".to_string());

        format!(
            "kind: {};\nname: {};\nsize: {};\nmodified: {};\nmode: {};",
            self.kind.as_str(),
            self.name,
            self.size,
            modified,
            self.mode
        )
    }
}

/// Check that `path` exists and is a directory.
pub fn probe_dir(path: &Path) -> std::result::Result<(), NavigationError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(NavigationError::NotADirectory),
        Err(_) => Err(NavigationError::DoesNotExist),
    }
}

/// List the immediate children of `dir`, sorted by file name.
pub fn list_children(dir: &Path) -> Result<Vec<ChildEntry>> {
    probe_dir(dir)?;

    let mut children = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(listing_error)? {
        let entry = entry.map_err(listing_error)?;
        let kind = match entry.file_type() {
            Ok(ft) if ft.is_dir() => EntityKind::Directory,
            Ok(ft) if ft.is_symlink() => std::fs::metadata(entry.path())
                .map(|m| EntityKind::of(&m))
                .unwrap_or(EntityKind::File),
            _ => EntityKind::File,
        };
        children.push(ChildEntry {
            kind,
            path: entry.path(),
        });
    }

    children.sort_by(|a, b| a.path.file_name().cmp(&b.path.file_name()));
    Ok(children)
}

fn listing_error(e: std::io::Error) -> NavigationError {
    match e.kind() {
        ErrorKind::NotFound => NavigationError::DoesNotExist,
        _ => NavigationError::Unreadable,
    }
}

/// Read the whole file at `path`.
pub fn read_file(path: &Path) -> Result<Vec<u8>> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_dir() => return Err(EntityAccessError::IsNotAFile.into()),
        Ok(_) => {}
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(EntityAccessError::DoesNotExist.into())
        }
        Err(e) => return Err(e.into()),
    }

    std::fs::read(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => EntityAccessError::DoesNotExist.into(),
        _ => DirTunnelError::Io(e),
    })
}

/// Stat the entry at `path`.
pub fn stat(path: &Path) -> Result<EntityStat> {
    let metadata = std::fs::metadata(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => DirTunnelError::EntityAccess(EntityAccessError::DoesNotExist),
        _ => DirTunnelError::StatFailed(e.to_string()),
    })?;

    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned());

    Ok(EntityStat {
        kind: EntityKind::of(&metadata),
        name,
        size: metadata.len(),
        modified: metadata.modified().ok().map(DateTime::<Utc>::from),
        mode: mode_string(&metadata),
    })
}

/// Recursively enumerate everything beneath `dir`.
///
/// Relative paths are computed against `base`, which must be `dir` or one
/// of its ancestors. Entries are yielded in pre-order, sorted by file name.
pub fn walk(dir: &Path, base: &Path) -> Result<Vec<WalkedEntry>> {
    probe_dir(dir)?;

    let mut entries = Vec::new();
    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| DirTunnelError::WalkFailed(e.to_string()))?;
        let metadata = entry
            .metadata()
            .map_err(|e| DirTunnelError::WalkFailed(e.to_string()))?;

        entries.push(WalkedEntry {
            kind: EntityKind::of(&metadata),
            relative_path: relative_to(base, entry.path()),
            size: metadata.len(),
            depth: entry.depth(),
        });
    }

    Ok(entries)
}

/// Express `path` relative to `base` using `/` separators.
pub fn relative_to(base: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(base).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(unix)]
fn mode_string(metadata: &Metadata) -> String {
    use std::os::unix::fs::PermissionsExt;

    let mode = metadata.permissions().mode();
    let file_type = if metadata.is_dir() { 'd' } else { '-' };
    let bits = [
        (0o400, 'r'),
        (0o200, 'w'),
        (0o100, 'x'),
        (0o040, 'r'),
        (0o020, 'w'),
        (0o010, 'x'),
        (0o004, 'r'),
        (0o002, 'w'),
        (0o001, 'x'),
    ];

    std::iter::once(file_type)
        .chain(
            bits.iter()
                .map(|&(bit, c)| if mode & bit != 0 { c } else { '-' }),
        )
        .collect()
}

#[cfg(not(unix))]
fn mode_string(metadata: &Metadata) -> String {
    let file_type = if metadata.is_dir() { 'd' } else { '-' };
    if metadata.permissions().readonly() {
        format!("{}r--r--r--", file_type)
    } else {
        format!("{}rw-rw-rw-", file_type)
    }
}
