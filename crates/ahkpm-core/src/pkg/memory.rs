//! An in-memory package source.
//!
//! Packages, their commits, tags and branches are registered up front.
//! Copies write a small `PACKAGE` marker file instead of real sources and
//! are recorded so callers can inspect what was materialised.

use super::dependency::{Dependency, DependencySet};
use super::error::PkgError;
use super::resolved::ResolvedDependency;
use super::source::PackageSource;
use super::version::{highest_matching_tag, highest_tag, Version, VersionKind};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError, RwLock};

/// Marker file written by [`MemorySource::copy`].
pub const MARKER_FILE: &str = "PACKAGE";

#[derive(Debug, Default)]
struct Package {
    revisions: BTreeMap<String, DependencySet>,
    tags: BTreeMap<String, String>,
    branches: BTreeMap<String, String>,
}

/// A recorded call to [`MemorySource::copy`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRecord {
    pub name: String,
    pub sha: String,
    pub destination: PathBuf,
}

#[derive(Debug, Default)]
pub struct MemorySource {
    packages: RwLock<BTreeMap<String, Package>>,
    copies: Mutex<Vec<CopyRecord>>,
    failing: Mutex<HashSet<String>>,
}

impl MemorySource {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a commit of a package and the dependencies it declares.
    pub fn add_revision(&self, name: &str, sha: &str, dependencies: DependencySet) -> &Self {
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        packages
            .entry(name.to_string())
            .or_default()
            .revisions
            .insert(sha.to_string(), dependencies);
        self
    }

    /// Point a tag at a commit, moving it if it already exists.
    pub fn tag(&self, name: &str, tag: &str, sha: &str) -> &Self {
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        packages
            .entry(name.to_string())
            .or_default()
            .tags
            .insert(tag.to_string(), sha.to_string());
        self
    }

    /// Point a branch head at a commit.
    pub fn branch(&self, name: &str, branch: &str, sha: &str) -> &Self {
        let mut packages = self.packages.write().unwrap_or_else(PoisonError::into_inner);
        packages
            .entry(name.to_string())
            .or_default()
            .branches
            .insert(branch.to_string(), sha.to_string());
        self
    }

    /// Make every later copy of `name` fail.
    pub fn fail_copies_of(&self, name: &str) -> &Self {
        self.failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.to_string());
        self
    }

    /// Every copy performed so far, in call order.
    #[must_use]
    pub fn copies(&self) -> Vec<CopyRecord> {
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn clear_copies(&self) {
        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    fn with_package<R>(
        &self,
        name: &str,
        f: impl FnOnce(&Package) -> Result<R, PkgError>,
    ) -> Result<R, PkgError> {
        let packages = self.packages.read().unwrap_or_else(PoisonError::into_inner);
        let package = packages.get(name).ok_or_else(|| PkgError::PackageNotFound {
            name: name.to_string(),
        })?;
        f(package)
    }
}

impl PackageSource for MemorySource {
    fn resolve_sha(&self, dependency: &Dependency) -> Result<String, PkgError> {
        let name = dependency.name();
        let version = dependency.version();

        self.with_package(name, |package| {
            let sha = match version.kind() {
                VersionKind::SemVerRange => {
                    let range = version.range()?;
                    highest_matching_tag(package.tags.keys().map(String::as_str), &range)
                        .and_then(|tag| package.tags.get(tag))
                }
                VersionKind::SemVerExact | VersionKind::Tag => package.tags.get(version.value()),
                VersionKind::Branch => package.branches.get(version.value()),
                VersionKind::Commit => package
                    .revisions
                    .keys()
                    .find(|sha| sha.starts_with(version.value())),
            };
            sha.cloned()
                .ok_or_else(|| PkgError::revision_not_found(name, &version.to_string()))
        })
    }

    /// Highest semantic version tag, else `main`, `master` or the first
    /// registered branch.
    fn latest_version(&self, name: &str) -> Result<Version, PkgError> {
        self.with_package(name, |package| {
            if let Some(tag) = highest_tag(package.tags.keys().map(String::as_str)) {
                return Version::parse(tag);
            }
            let branch = ["main", "master"]
                .into_iter()
                .find(|b| package.branches.contains_key(*b))
                .or_else(|| package.branches.keys().next().map(String::as_str))
                .ok_or_else(|| PkgError::revision_not_found(name, "latest"))?;
            Version::parse(&format!("branch:{branch}"))
        })
    }

    fn declared_dependencies(&self, resolved: &ResolvedDependency) -> Result<DependencySet, PkgError> {
        self.with_package(&resolved.name, |package| {
            package
                .revisions
                .get(&resolved.sha)
                .cloned()
                .ok_or_else(|| PkgError::revision_not_found(&resolved.name, &resolved.sha))
        })
    }

    fn copy(&self, resolved: &ResolvedDependency, destination: &Path) -> Result<(), PkgError> {
        let failing = self
            .failing
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(&resolved.name);
        if failing {
            return Err(PkgError::source_io(
                &resolved.name,
                "Error copying package to target module directory",
            ));
        }

        self.with_package(&resolved.name, |package| {
            if package.revisions.contains_key(&resolved.sha) {
                Ok(())
            } else {
                Err(PkgError::revision_not_found(&resolved.name, &resolved.sha))
            }
        })?;

        fs::create_dir_all(destination)?;
        fs::write(
            destination.join(MARKER_FILE),
            format!("{}\n{}\n", resolved.name, resolved.sha),
        )?;

        self.copies
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(CopyRecord {
                name: resolved.name.clone(),
                sha: resolved.sha.clone(),
                destination: destination.to_path_buf(),
            });
        Ok(())
    }
}
