//! Package cache management.
//!
//! Each package gets one working clone under the cache root, at
//! `<root>/<canonical name>`. Access to a package's directory is serialised
//! through a per-name lock.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

/// Package cache manager.
#[derive(Debug)]
pub struct PackageCache {
    /// Root directory for the package cache.
    root: PathBuf,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl PackageCache {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Get the cache root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Get the working clone directory for a package.
    ///
    /// Returns `None` unless every `/`-separated segment of `name` is a plain
    /// path component, so the result always lies below the cache root.
    #[must_use]
    pub fn package_dir(&self, name: &str) -> Option<PathBuf> {
        let mut dir = self.root.clone();
        for segment in name.split('/') {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(part)), None) if part == segment => dir.push(part),
                _ => return None,
            }
        }
        Some(dir)
    }

    /// Check if a package has a clone in the cache.
    #[must_use]
    pub fn is_cached(&self, name: &str) -> bool {
        self.package_dir(name)
            .is_some_and(|dir| dir.join(".git").exists())
    }

    /// The lock guarding a package's directory.
    ///
    /// Callers hold the returned mutex for the whole of any git operation on
    /// that package.
    pub fn lock(&self, name: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(locks.entry(name.to_string()).or_default())
    }

    /// Remove the whole cache.
    ///
    /// # Errors
    /// Returns an error if the directory exists but cannot be removed.
    pub fn clear(&self) -> io::Result<()> {
        match fs::remove_dir_all(&self.root) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e),
        }
    }
}
