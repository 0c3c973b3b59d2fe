//! Locating animation sources: the bundled raw resource store first, then the
//! filesystem.

use crate::error::ResolveError;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Handle of a bundled resource, valid for the store that issued it.
pub type ResourceId = usize;

/// Name-indexed binary assets packaged with the application.
pub trait RawResources {
    /// Looks up a resource by its bare name (no directory, no extension).
    fn identifier(&self, name: &str) -> Option<ResourceId>;

    fn open_raw(&self, id: ResourceId) -> io::Result<Box<dyn Read>>;
}

/// A directory of bundled assets, indexed by file stem.
///
/// The index is taken once when the store is opened; files added later are
/// not visible.
#[derive(Debug, Clone)]
pub struct RawResourceDir {
    root: PathBuf,
    files: Vec<PathBuf>,
    by_name: HashMap<String, ResourceId>,
}

impl RawResourceDir {
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        let mut files = Vec::new();
        for entry in fs::read_dir(&root)? {
            let path = entry?.path();
            if path.is_file() {
                files.push(path);
            }
        }
        files.sort();

        let mut by_name = HashMap::new();
        for (id, path) in files.iter().enumerate() {
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if by_name.contains_key(stem) {
                debug!(path = %path.display(), "Raw resource name already taken, skipping");
                continue;
            }
            by_name.insert(stem.to_string(), id);
        }

        debug!(root = %root.display(), count = by_name.len(), "Indexed raw resources");
        Ok(Self {
            root,
            files,
            by_name,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.by_name.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_name.is_empty()
    }
}

impl RawResources for RawResourceDir {
    fn identifier(&self, name: &str) -> Option<ResourceId> {
        self.by_name.get(name).copied()
    }

    fn open_raw(&self, id: ResourceId) -> io::Result<Box<dyn Read>> {
        let path = self
            .files
            .get(id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown resource id"))?;
        Ok(Box::new(File::open(path)?))
    }
}

/// In-memory raw resources.
#[derive(Debug, Clone, Default)]
pub struct MemoryResources {
    entries: Vec<(String, Vec<u8>)>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces the resource called `name`.
    pub fn insert(&mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) {
        let name = name.into();
        let bytes = bytes.into();
        match self.entries.iter_mut().find(|(n, _)| *n == name) {
            Some(entry) => entry.1 = bytes,
            None => self.entries.push((name, bytes)),
        }
    }

    pub fn with(mut self, name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        self.insert(name, bytes);
        self
    }
}

impl RawResources for MemoryResources {
    fn identifier(&self, name: &str) -> Option<ResourceId> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    fn open_raw(&self, id: ResourceId) -> io::Result<Box<dyn Read>> {
        let (_, bytes) = self
            .entries
            .get(id)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "unknown resource id"))?;
        Ok(Box::new(Cursor::new(bytes.clone())))
    }
}

/// Opens the animation source called `file`.
///
/// The raw store is asked first, by the bare name of `file`; then `file` is
/// tried as a filesystem path. `Ok(None)` means neither had it.
pub fn open_file(
    raw: Option<&dyn RawResources>,
    file: &str,
) -> Result<Option<Box<dyn Read>>, ResolveError> {
    if file.trim().is_empty() {
        return Err(ResolveError::BlankFileName);
    }

    let io_error = |source| ResolveError::Io {
        file_name: file.to_string(),
        source,
    };

    if let Some(raw) = raw {
        let name = Path::new(file)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(file);
        if let Some(id) = raw.identifier(name) {
            debug!(file, name, "Opening raw resource");
            return raw.open_raw(id).map(Some).map_err(io_error);
        }
    }

    let path = Path::new(file);
    if path.is_file() {
        debug!(file, "Opening file from filesystem");
        let reader: Box<dyn Read> = Box::new(File::open(path).map_err(io_error)?);
        return Ok(Some(reader));
    }

    Ok(None)
}
