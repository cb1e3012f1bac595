//! Where package revisions come from.

use super::dependency::{Dependency, DependencySet};
use super::error::PkgError;
use super::resolved::ResolvedDependency;
use super::version::Version;
use std::path::Path;

/// A source of package revisions.
///
/// Implementations must be safe to call from several threads at once; the
/// resolver may query different packages in parallel.
pub trait PackageSource: Send + Sync {
    /// Resolve a dependency's version specifier to an exact commit SHA.
    ///
    /// # Errors
    /// `PackageNotFound` if the package does not exist, `RevisionNotFound`
    /// if nothing matches the specifier.
    fn resolve_sha(&self, dependency: &Dependency) -> Result<String, PkgError>;

    /// The newest version of a package: its highest semantic version tag,
    /// or its default branch when it has no such tag.
    ///
    /// # Errors
    /// `PackageNotFound` if the package does not exist, `RevisionNotFound`
    /// if it has neither a semantic version tag nor a branch.
    fn latest_version(&self, name: &str) -> Result<Version, PkgError>;

    /// The dependencies a package declares at its resolved revision.
    /// A package without a manifest declares none.
    ///
    /// # Errors
    /// Returns an error if the revision cannot be read or its manifest is
    /// invalid.
    fn declared_dependencies(&self, resolved: &ResolvedDependency) -> Result<DependencySet, PkgError>;

    /// Write the files of a resolved revision into `destination`.
    ///
    /// # Errors
    /// Returns an error if the revision cannot be read or written.
    fn copy(&self, resolved: &ResolvedDependency, destination: &Path) -> Result<(), PkgError>;

    /// Drop any locally cached package data.
    ///
    /// # Errors
    /// Returns an error if the cache cannot be removed.
    fn clear_cache(&self) -> Result<(), PkgError> {
        Ok(())
    }
}
