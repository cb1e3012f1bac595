//! The lockfile, `ahkpm.lock`.
//!
//! Records the direct dependencies it was produced from and the resolved
//! tree flattened in pre-order. Each entry's `installPath` encodes its
//! position, which is how the tree is rebuilt on read.

use super::dependency::DependencySet;
use super::error::PkgError;
use super::resolved::ResolvedDependency;
use super::tree::ResolvedDependencyTree;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::Path;

/// Lockfile name.
pub const LOCKFILE_NAME: &str = "ahkpm.lock";

/// Current lockfile format version.
pub const LOCKFILE_VERSION: &str = "1";

/// Contents of `ahkpm.lock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lockfile {
    pub lockfile_version: String,
    #[serde(default)]
    pub dependencies: DependencySet,
    #[serde(default)]
    pub resolved: Vec<ResolvedDependency>,
}

impl Default for Lockfile {
    fn default() -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION.to_string(),
            dependencies: DependencySet::new(),
            resolved: Vec::new(),
        }
    }
}

impl Lockfile {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a lockfile for `dependencies` from a resolved tree.
    #[must_use]
    pub fn from_tree(dependencies: DependencySet, tree: &ResolvedDependencyTree) -> Self {
        Self {
            lockfile_version: LOCKFILE_VERSION.to_string(),
            dependencies,
            resolved: tree.flatten(),
        }
    }

    /// Rebuild the resolved tree.
    ///
    /// # Errors
    /// Returns `MalformedLockTree` if an entry cannot be placed.
    pub fn tree(&self) -> Result<ResolvedDependencyTree, PkgError> {
        ResolvedDependencyTree::from_flat_array(&self.resolved)
    }

    /// Read a lockfile. A missing file is `Ok(None)`.
    ///
    /// # Errors
    /// `LockfileInvalid` for unreadable or malformed JSON,
    /// `LockfileVersionMismatch` for an unsupported `lockfileVersion`.
    pub fn read_from(path: &Path) -> Result<Option<Self>, PkgError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(PkgError::LockfileInvalid {
                    path: path.to_path_buf(),
                    message: format!("Failed to read lockfile: {e}"),
                })
            }
        };

        // Check the version before the body so an old format reports as such
        let header: LockfileHeader =
            serde_json::from_str(&content).map_err(|e| PkgError::LockfileInvalid {
                path: path.to_path_buf(),
                message: format!("Invalid lockfile JSON: {e}"),
            })?;
        if header.lockfile_version != LOCKFILE_VERSION {
            return Err(PkgError::LockfileVersionMismatch {
                found: header.lockfile_version,
                expected: LOCKFILE_VERSION.to_string(),
            });
        }

        let lockfile: Self =
            serde_json::from_str(&content).map_err(|e| PkgError::LockfileInvalid {
                path: path.to_path_buf(),
                message: format!("Invalid lockfile JSON: {e}"),
            })?;
        Ok(Some(lockfile))
    }

    /// Write the lockfile atomically.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), PkgError> {
        let content = self.to_json().map_err(|e| PkgError::LockfileInvalid {
            path: path.to_path_buf(),
            message: format!("Failed to serialize lockfile: {e}"),
        })?;
        ahkpm_util::fs::atomic_write(path, content.as_bytes())?;
        Ok(())
    }

    /// Serialize to two-space indented JSON with a trailing newline.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        let mut json = serde_json::to_string_pretty(self)?;
        json.push('\n');
        Ok(json)
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LockfileHeader {
    lockfile_version: String,
}
