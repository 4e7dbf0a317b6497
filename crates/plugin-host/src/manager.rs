//! Index of loaded plugin libraries.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::default_extension;
use crate::error::PluginError;
use crate::library::PluginLibrary;

/// Loads shared objects and indexes them by absolute path.
///
/// The index itself is not synchronized; callers that load and unload from
/// several threads must serialize externally. Library handles are shared,
/// so an unloaded library stays open until its last user lets go.
#[derive(Debug, Default)]
pub struct PluginManager {
    loaded: HashMap<PathBuf, Arc<PluginLibrary>>,
}

impl PluginManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Opens the library at `path` and registers it under its absolute
    /// path. Loading the same path twice is refused.
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<Arc<PluginLibrary>, PluginError> {
        let abs = std::path::absolute(path.as_ref())?;
        if self.loaded.contains_key(&abs) {
            return Err(PluginError::AlreadyLoaded { path: abs });
        }
        let library = Arc::new(PluginLibrary::open(&abs)?);
        self.loaded.insert(abs, Arc::clone(&library));
        Ok(library)
    }

    /// Drops the index entry for `path`, returning whether one existed.
    /// The OS handle closes once every outstanding reference (including
    /// live instances) is gone.
    pub fn unload(&mut self, path: impl AsRef<Path>) -> Result<bool, PluginError> {
        let abs = std::path::absolute(path.as_ref())?;
        Ok(self.loaded.remove(&abs).is_some())
    }

    /// Empties the index.
    pub fn unload_all(&mut self) {
        self.loaded.clear();
    }

    /// Whether `path` is currently registered.
    pub fn is_loaded(&self, path: impl AsRef<Path>) -> Result<bool, PluginError> {
        let abs = std::path::absolute(path.as_ref())?;
        Ok(self.loaded.contains_key(&abs))
    }

    /// Currently registered libraries, keyed by absolute path.
    #[must_use]
    pub fn loaded(&self) -> &HashMap<PathBuf, Arc<PluginLibrary>> {
        &self.loaded
    }

    /// Loads every regular file in `dir` whose file name contains
    /// `pattern`, returning the libraries that loaded.
    ///
    /// Files that fail to load (including ones already registered) are
    /// skipped. A missing or non-directory `dir` yields an empty list;
    /// errors from the directory iteration itself propagate.
    pub fn discover(
        &mut self,
        dir: impl AsRef<Path>,
        pattern: &str,
    ) -> Result<Vec<Arc<PluginLibrary>>, PluginError> {
        let dir = dir.as_ref();
        let mut found = Vec::new();
        if !dir.is_dir() {
            return Ok(found);
        }

        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_file() {
                continue;
            }
            if !entry.file_name().to_string_lossy().contains(pattern) {
                continue;
            }
            match self.load(entry.path()) {
                Ok(library) => found.push(library),
                Err(err) => {
                    log::debug!("skipping {}: {err}", entry.path().display());
                }
            }
        }

        Ok(found)
    }

    /// [`discover`](Self::discover) with this platform's default
    /// shared-library suffix.
    pub fn discover_default(
        &mut self,
        dir: impl AsRef<Path>,
    ) -> Result<Vec<Arc<PluginLibrary>>, PluginError> {
        self.discover(dir, default_extension())
    }
}
