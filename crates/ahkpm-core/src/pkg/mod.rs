//! Package manager functionality.
//!
//! Provides utilities for:
//! - Parsing version specifiers and `name@version` dependencies
//! - Resolving dependency sets into pinned trees
//! - Rebuilding, merging and conflict-checking resolved trees
//! - Fetching packages from git into a local cache
//! - Reading and writing `ahkpm.json` and `ahkpm.lock`
//! - Installing, updating and uninstalling into `ahkpm-modules`

pub mod cache;
pub mod dependency;
pub mod error;
pub mod git;
pub mod include;
pub mod install;
pub mod lockfile;
pub mod manifest;
#[cfg(any(test, feature = "test-support"))]
pub mod memory;
pub mod resolve;
pub mod resolved;
pub mod source;
pub mod tree;
pub mod version;

pub use cache::PackageCache;
pub use dependency::{canonicalize_name, is_valid_name, Dependency, DependencySet};
pub use error::{codes as pkg_codes, PkgError};
pub use git::{GitPackageSource, REMOTE_BASE_ENV};
pub use include::{include_statement, prepend_include};
pub use install::{InstallMode, InstallSummary, Installer};
pub use lockfile::{Lockfile, LOCKFILE_NAME, LOCKFILE_VERSION};
pub use manifest::{Manifest, Person, MANIFEST_NAME};
#[cfg(any(test, feature = "test-support"))]
pub use memory::MemorySource;
pub use resolve::{ResolveOptions, Resolver};
pub use resolved::ResolvedDependency;
pub use source::PackageSource;
pub use tree::{NodeId, ResolvedDependencyTree, Tree, MODULES_DIR};
pub use version::{Version, VersionKind, VersionRange};
