//! Package manager error types.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Package manager error codes.
pub mod codes {
    pub const PKG_INVALID_NAME: &str = "PKG_INVALID_NAME";
    pub const PKG_INVALID_VERSION_SPECIFIER: &str = "PKG_INVALID_VERSION_SPECIFIER";
    pub const PKG_NOT_FOUND: &str = "PKG_NOT_FOUND";
    pub const PKG_REVISION_NOT_FOUND: &str = "PKG_REVISION_NOT_FOUND";
    pub const PKG_DEPENDENCY_CONFLICT: &str = "PKG_DEPENDENCY_CONFLICT";
    pub const PKG_CYCLIC_DEPENDENCY: &str = "PKG_CYCLIC_DEPENDENCY";
    pub const PKG_NOT_A_DIRECT_DEPENDENCY: &str = "PKG_NOT_A_DIRECT_DEPENDENCY";
    pub const PKG_AMBIGUOUS_UPDATE_TARGET: &str = "PKG_AMBIGUOUS_UPDATE_TARGET";
    pub const PKG_INCLUDE_NOT_DECLARED: &str = "PKG_INCLUDE_NOT_DECLARED";
    pub const PKG_SOURCE_IO: &str = "PKG_SOURCE_IO";
    pub const PKG_GIT_UNAVAILABLE: &str = "PKG_GIT_UNAVAILABLE";
    pub const PKG_MANIFEST_NOT_FOUND: &str = "PKG_MANIFEST_NOT_FOUND";
    pub const PKG_MANIFEST_INVALID: &str = "PKG_MANIFEST_INVALID";
    pub const PKG_LOCK_INVALID: &str = "PKG_LOCK_INVALID";
    pub const PKG_LOCK_VERSION_MISMATCH: &str = "PKG_LOCK_VERSION_MISMATCH";
    pub const PKG_LOCK_MALFORMED_TREE: &str = "PKG_LOCK_MALFORMED_TREE";
    pub const PKG_IO_ERROR: &str = "PKG_IO_ERROR";
}

/// Package manager error.
#[derive(Debug, Error)]
pub enum PkgError {
    #[error("Invalid dependency name {name}")]
    InvalidName { name: String },

    #[error("Invalid version specifier {specifier}")]
    InvalidVersionSpecifier { specifier: String },

    #[error("Error downloading package {name}. Are you sure that package exists?")]
    PackageNotFound { name: String },

    #[error("Could not find version {version} for package {name}. Are you sure that version exists?")]
    RevisionNotFound { name: String, version: String },

    #[error(
        "Conflicting versions for dependency {name}: {first_version} ({first_sha}) and {second_version} ({second_sha})"
    )]
    DependencyConflict {
        name: String,
        first_version: String,
        first_sha: String,
        second_version: String,
        second_sha: String,
    },

    #[error("Cyclic dependency detected: {}", .cycle.join(" -> "))]
    CyclicDependency { cycle: Vec<String> },

    #[error("{name} is not a direct dependency in ahkpm.json")]
    NotADirectDependency { name: String },

    #[error("Cannot update multiple versions of the same package: {name}")]
    AmbiguousUpdateTarget { name: String },

    #[error("Package {name} does not specify which file to \"Include\"")]
    IncludeNotDeclared { name: String },

    #[error("{message}")]
    SourceIo { name: String, message: String },

    #[error("git was not found, confirm you have git installed and it is on your PATH")]
    GitUnavailable,

    #[error("ahkpm.json not found: {}", .path.display())]
    ManifestNotFound { path: PathBuf },

    #[error("Invalid manifest {}: {message}", .path.display())]
    ManifestInvalid { path: PathBuf, message: String },

    #[error("Invalid lockfile {}: {message}", .path.display())]
    LockfileInvalid { path: PathBuf, message: String },

    #[error("Lockfile version {found} not supported (expected {expected})")]
    LockfileVersionMismatch { found: String, expected: String },

    #[error("Malformed lockfile: cannot place {name} at {install_path}")]
    MalformedLockTree { name: String, install_path: String },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl PkgError {
    /// Get the stable error code.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidName { .. } => codes::PKG_INVALID_NAME,
            Self::InvalidVersionSpecifier { .. } => codes::PKG_INVALID_VERSION_SPECIFIER,
            Self::PackageNotFound { .. } => codes::PKG_NOT_FOUND,
            Self::RevisionNotFound { .. } => codes::PKG_REVISION_NOT_FOUND,
            Self::DependencyConflict { .. } => codes::PKG_DEPENDENCY_CONFLICT,
            Self::CyclicDependency { .. } => codes::PKG_CYCLIC_DEPENDENCY,
            Self::NotADirectDependency { .. } => codes::PKG_NOT_A_DIRECT_DEPENDENCY,
            Self::AmbiguousUpdateTarget { .. } => codes::PKG_AMBIGUOUS_UPDATE_TARGET,
            Self::IncludeNotDeclared { .. } => codes::PKG_INCLUDE_NOT_DECLARED,
            Self::SourceIo { .. } => codes::PKG_SOURCE_IO,
            Self::GitUnavailable => codes::PKG_GIT_UNAVAILABLE,
            Self::ManifestNotFound { .. } => codes::PKG_MANIFEST_NOT_FOUND,
            Self::ManifestInvalid { .. } => codes::PKG_MANIFEST_INVALID,
            Self::LockfileInvalid { .. } => codes::PKG_LOCK_INVALID,
            Self::LockfileVersionMismatch { .. } => codes::PKG_LOCK_VERSION_MISMATCH,
            Self::MalformedLockTree { .. } => codes::PKG_LOCK_MALFORMED_TREE,
            Self::Io(_) => codes::PKG_IO_ERROR,
        }
    }

    /// Create a source I/O error for a package.
    pub fn source_io(name: &str, message: impl Into<String>) -> Self {
        Self::SourceIo {
            name: name.to_string(),
            message: message.into(),
        }
    }

    /// Create a revision not found error.
    #[must_use]
    pub fn revision_not_found(name: &str, version: &str) -> Self {
        Self::RevisionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        }
    }

    /// True for errors caught before any network or filesystem work.
    #[must_use]
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidName { .. } | Self::InvalidVersionSpecifier { .. }
        )
    }
}
