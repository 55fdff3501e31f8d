//! Directory view: the navigable state held by each session.

use std::fmt;
use std::path::{Path, PathBuf};

use super::Identifier;
use crate::error::{EntityAccessError, NavigationError};
use crate::fs::{self, EntityKind, WalkedEntry};
use crate::Result;

/// Marker rendered in place of an empty listing.
pub const EMPTY_MARKER: &str = "NONE";

/// Separator line between subdirectories and files in a combined listing.
pub const LISTING_SEPARATOR: &str = "=========";

/// A listed file or directory.
///
/// The identifier is generated fresh on every listing, so clients must
/// always use the one from the most recent response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entity {
    pub kind: EntityKind,
    /// Path relative to the session root, `/`-separated.
    pub relative_path: String,
    pub id: Identifier,
}

impl Entity {
    pub fn new(kind: EntityKind, relative_path: impl Into<String>) -> Self {
        let relative_path = relative_path.into();
        let id = Identifier::generate(&relative_path);
        Self {
            kind,
            relative_path,
            id,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            EntityKind::Directory => write!(f, "+d+path={}+id={}", self.relative_path, self.id),
            EntityKind::File => write!(f, "*f*path={}*id={}", self.relative_path, self.id),
        }
    }
}

fn render_walked(entry: &WalkedEntry) -> String {
    match entry.kind {
        EntityKind::Directory => format!("+d+path={}+size={}", entry.relative_path, entry.size),
        EntityKind::File => format!("*f*path={}*size={}", entry.relative_path, entry.size),
    }
}

fn render_entities(entities: &[Entity]) -> String {
    if entities.is_empty() {
        return EMPTY_MARKER.to_string();
    }
    entities
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Root path, current path and the most recent listing of a session.
#[derive(Debug, Clone)]
pub struct DirectoryView {
    root: PathBuf,
    current: Option<PathBuf>,
    subdirectories: Vec<Entity>,
    files: Vec<Entity>,
}

impl DirectoryView {
    /// Create a view rooted at `root`. Nothing is listed until the first
    /// navigation.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            current: None,
            subdirectories: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Current directory, unset before the first navigation.
    pub fn current(&self) -> Option<&Path> {
        self.current.as_deref()
    }

    /// Current directory, falling back to the root.
    pub fn working_dir(&self) -> &Path {
        self.current.as_deref().unwrap_or(&self.root)
    }

    pub fn subdirectories(&self) -> &[Entity] {
        &self.subdirectories
    }

    pub fn files(&self) -> &[Entity] {
        &self.files
    }

    /// Navigate back to the root and refresh the listing.
    pub fn change_to_root(&mut self) -> Result<PathBuf> {
        let root = self.root.clone();
        self.navigate(root)
    }

    /// Navigate into a subdirectory from the current listing.
    pub fn change_to_subdirectory(&mut self, id: &str) -> Result<PathBuf> {
        let target = self
            .subdirectories
            .iter()
            .find(|e| e.id == *id)
            .ok_or(NavigationError::NoSuchEntity)?;

        let path = self.root.join(&target.relative_path);
        self.navigate(path)
    }

    /// Set the current directory to `path` and list its children.
    ///
    /// Nothing changes unless both the probe and the listing succeed.
    fn navigate(&mut self, path: PathBuf) -> Result<PathBuf> {
        fs::probe_dir(&path)?;
        let children = fs::list_children(&path)?;

        let mut subdirectories = Vec::new();
        let mut files = Vec::new();
        for child in children {
            let entity = Entity::new(child.kind, fs::relative_to(&self.root, &child.path));
            match child.kind {
                EntityKind::Directory => subdirectories.push(entity),
                EntityKind::File => files.push(entity),
            }
        }

        self.subdirectories = subdirectories;
        self.files = files;
        self.current = Some(path.clone());
        Ok(path)
    }

    pub fn render_files(&self) -> String {
        render_entities(&self.files)
    }

    pub fn render_subdirectories(&self) -> String {
        render_entities(&self.subdirectories)
    }

    /// Subdirectories, a separator line, then files.
    pub fn render_both(&self) -> String {
        format!(
            "{}\n{}\n{}",
            self.render_subdirectories(),
            LISTING_SEPARATOR,
            self.render_files()
        )
    }

    /// Recursively enumerate everything below the working directory.
    pub fn walk(&self) -> Result<Vec<WalkedEntry>> {
        fs::walk(self.working_dir(), &self.root)
    }

    /// Walk and render as text.
    pub fn render_walk(&self) -> Result<String> {
        let walked = self.walk()?;
        if walked.is_empty() {
            return Ok(EMPTY_MARKER.to_string());
        }
        Ok(walked
            .iter()
            .map(render_walked)
            .collect::<Vec<_>>()
            .join("\n"))
    }

    /// Read a file from the current listing, returning its absolute path
    /// and contents.
    pub fn read_file(&self, id: &str) -> Result<(PathBuf, Vec<u8>)> {
        let entity = self
            .files
            .iter()
            .find(|e| e.id == *id)
            .ok_or(EntityAccessError::NotFound)?;

        // A listed file replaced by a directory fails here with IsNotAFile
        let path = self.root.join(&entity.relative_path);
        let contents = fs::read_file(&path)?;
        Ok((path, contents))
    }

    /// Stat an entity from the current listing, files first.
    pub fn stat_entity(&self, id: &str) -> Result<(PathBuf, String)> {
        let entity = self
            .files
            .iter()
            .chain(self.subdirectories.iter())
            .find(|e| e.id == *id)
            .ok_or(EntityAccessError::NotFound)?;

        let path = self.root.join(&entity.relative_path);
        let stat = fs::stat(&path)?;
        Ok((path, stat.render()))
    }
}
