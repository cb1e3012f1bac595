//! The project manifest, `ahkpm.json`.

use super::dependency::{canonicalize_name, Dependency, DependencySet};
use super::error::PkgError;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::Path;

/// Manifest file name.
pub const MANIFEST_NAME: &str = "ahkpm.json";

/// Package author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub website: String,
}

/// Contents of `ahkpm.json`.
///
/// Fields this type does not know about are kept in `extra` and written back
/// unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub repository: String,
    #[serde(default)]
    pub website: String,
    #[serde(default)]
    pub license: String,
    #[serde(default)]
    pub issue_tracker: String,
    /// Script other projects should `#Include` to use this package.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub include: String,
    #[serde(default)]
    pub author: Person,
    #[serde(default)]
    dependencies: BTreeMap<String, String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Manifest {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a manifest from disk.
    ///
    /// # Errors
    /// `ManifestNotFound` if the file does not exist, `ManifestInvalid` if it
    /// cannot be read or parsed.
    pub fn read_from(path: &Path) -> Result<Self, PkgError> {
        let content = fs::read_to_string(path).map_err(|e| {
            if e.kind() == io::ErrorKind::NotFound {
                PkgError::ManifestNotFound {
                    path: path.to_path_buf(),
                }
            } else {
                PkgError::ManifestInvalid {
                    path: path.to_path_buf(),
                    message: format!("Failed to read manifest: {e}"),
                }
            }
        })?;

        Self::from_json(&content).map_err(|e| PkgError::ManifestInvalid {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Parse manifest JSON. Dependency names are stored canonicalized.
    ///
    /// # Errors
    /// Returns an error if the JSON is invalid.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let mut manifest: Self = serde_json::from_str(json)?;
        manifest.dependencies = std::mem::take(&mut manifest.dependencies)
            .into_iter()
            .map(|(name, version)| (canonicalize_name(&name), version))
            .collect();
        Ok(manifest)
    }

    /// Write the manifest atomically as two-space indented JSON.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_to(&self, path: &Path) -> Result<(), PkgError> {
        let mut content =
            serde_json::to_string_pretty(self).map_err(|e| PkgError::ManifestInvalid {
                path: path.to_path_buf(),
                message: format!("Failed to serialize manifest: {e}"),
            })?;
        content.push('\n');
        ahkpm_util::fs::atomic_write(path, content.as_bytes())?;
        Ok(())
    }

    /// The declared dependencies, each name and specifier validated.
    ///
    /// # Errors
    /// Returns the first `InvalidName` or `InvalidVersionSpecifier`.
    pub fn dependencies(&self) -> Result<DependencySet, PkgError> {
        let mut set = DependencySet::new();
        for (name, version) in &self.dependencies {
            set.add(Dependency::from_specifiers(name, version)?);
        }
        Ok(set)
    }

    /// Whether `name` (shorthand allowed) is declared.
    #[must_use]
    pub fn has_dependency(&self, name: &str) -> bool {
        self.dependencies.contains_key(&canonicalize_name(name))
    }

    /// Add or replace dependencies.
    pub fn add_dependencies(&mut self, dependencies: &DependencySet) {
        for dep in dependencies {
            self.dependencies
                .insert(dep.name().to_string(), dep.version().to_string());
        }
    }

    /// Remove dependencies by name. Unknown names are ignored.
    pub fn remove_dependencies<S: AsRef<str>>(&mut self, names: &[S]) {
        for name in names {
            self.dependencies.remove(&canonicalize_name(name.as_ref()));
        }
    }

    /// Raw name to specifier pairs, for display.
    #[must_use]
    pub fn raw_dependencies(&self) -> &BTreeMap<String, String> {
        &self.dependencies
    }
}
