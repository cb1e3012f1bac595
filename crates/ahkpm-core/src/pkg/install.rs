//! Install, update and uninstall.
//!
//! Each command reads the manifest and lockfile, works out the new resolved
//! tree, materialises it, and only then persists the manifest and lockfile.
//! Materialisation builds the whole module directory in a staging directory
//! and swaps it into place, so a failed copy leaves the previous
//! `ahkpm-modules` untouched.

use super::dependency::{canonicalize_name, Dependency, DependencySet};
use super::error::PkgError;
use super::lockfile::{Lockfile, LOCKFILE_NAME};
use super::manifest::{Manifest, MANIFEST_NAME};
use super::resolve::{ResolveOptions, Resolver};
use super::resolved::ResolvedDependency;
use super::source::PackageSource;
use super::tree::MODULES_DIR;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

/// How the tree for a command was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum InstallMode {
    /// Copied straight from the lockfile without resolving.
    Lockfile,
    /// Resolved against the package source.
    Resolved,
}

/// Outcome of an installer command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallSummary {
    pub mode: InstallMode,
    /// Packages copied into the module directory, at every depth.
    pub materialized: usize,
    pub added: Vec<String>,
    pub updated: Vec<String>,
    pub removed: Vec<String>,
}

impl InstallSummary {
    fn new(mode: InstallMode, materialized: usize) -> Self {
        Self {
            mode,
            materialized,
            added: Vec::new(),
            updated: Vec::new(),
            removed: Vec::new(),
        }
    }
}

/// Runs install commands for one project.
pub struct Installer<S> {
    source: S,
    root: PathBuf,
    options: ResolveOptions,
}

impl<S: PackageSource> Installer<S> {
    /// Create an installer for the project at `root`.
    pub fn new(source: S, root: impl Into<PathBuf>) -> Self {
        Self {
            source,
            root: root.into(),
            options: ResolveOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn manifest_path(&self) -> PathBuf {
        self.root.join(MANIFEST_NAME)
    }

    #[must_use]
    pub fn lockfile_path(&self) -> PathBuf {
        self.root.join(LOCKFILE_NAME)
    }

    #[must_use]
    pub fn modules_dir(&self) -> PathBuf {
        self.root.join(MODULES_DIR)
    }

    fn resolver(&self) -> Resolver<'_, S> {
        Resolver::new(&self.source).with_options(self.options)
    }

    /// Parse `name[@version]` specifiers for [`Installer::install`].
    ///
    /// A specifier without a version gets the package's latest version. A
    /// semantic version tag becomes a caret range so later updates can move
    /// within it. Every specifier is validated before the source is queried.
    ///
    /// # Errors
    /// A validation error for any specifier, or the source's error while
    /// looking up a latest version.
    pub fn dependencies_from_specifiers<I, T>(&self, specifiers: I) -> Result<DependencySet, PkgError>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        let parsed = specifiers
            .into_iter()
            .map(|spec| Dependency::parse_specifier(spec.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;

        let mut set = DependencySet::new();
        for (name, version) in parsed {
            let version = match version {
                Some(version) => version,
                None => {
                    let latest = self.source.latest_version(&name)?.caret_range();
                    debug!(package = %name, version = %latest, "using latest version");
                    latest
                }
            };
            set.add(Dependency::new(name, version));
        }
        Ok(set)
    }

    /// Install `new_dependencies`, or everything in the lockfile when empty.
    ///
    /// # Errors
    /// Any validation, resolution, conflict, source or persistence error.
    /// Nothing is written when an error is returned.
    pub fn install(&self, new_dependencies: &DependencySet) -> Result<InstallSummary, PkgError> {
        let mut manifest = Manifest::read_from(&self.manifest_path())?;
        let current = manifest.dependencies()?;
        let lockfile = Lockfile::read_from(&self.lockfile_path())?;

        let tree = match lockfile {
            Some(lockfile) if new_dependencies.is_empty() => {
                info!("No dependency changes found. Installing from lockfile.");
                if lockfile.dependencies != current {
                    warn!("ahkpm.json dependencies differ from ahkpm.lock; installing the locked tree");
                }
                let count = self.materialize(&lockfile.resolved)?;
                return Ok(InstallSummary::new(InstallMode::Lockfile, count));
            }
            Some(lockfile) => {
                let base = lockfile.tree()?;
                let incoming = self.resolver().resolve(new_dependencies)?;
                let mut merged = base.merge(&incoming);
                merged.ensure_install_paths();
                merged.check_for_conflicts()?;
                merged
            }
            None => {
                let mut all = current;
                all.add_all(new_dependencies);
                self.resolver().resolve(&all)?
            }
        };

        let count = self.materialize(&tree.flatten())?;

        manifest.add_dependencies(new_dependencies);
        let direct = manifest.dependencies()?;
        manifest.write_to(&self.manifest_path())?;
        Lockfile::from_tree(direct, &tree).write_to(&self.lockfile_path())?;

        let mut summary = InstallSummary::new(InstallMode::Resolved, count);
        summary.added = new_dependencies.names().map(str::to_string).collect();
        info!(packages = count, "Installed dependencies");
        Ok(summary)
    }

    /// Re-resolve the named direct dependencies, leaving every other locked
    /// root as it was.
    ///
    /// Ranges move to the highest matching tag, branches to their head.
    /// Exact versions, tags and commits are re-resolved too, which only
    /// changes anything if a tag was moved.
    ///
    /// # Errors
    /// `NotADirectDependency` for a name missing from the manifest,
    /// `AmbiguousUpdateTarget` when two names refer to the same package, and
    /// any resolution, conflict, source or persistence error.
    pub fn update<N: AsRef<str>>(&self, names: &[N]) -> Result<InstallSummary, PkgError> {
        let manifest = Manifest::read_from(&self.manifest_path())?;
        let current = manifest.dependencies()?;

        let mut targets = DependencySet::new();
        let mut seen = HashSet::new();
        for name in names {
            let name = canonicalize_name(name.as_ref());
            let dep = current
                .get(&name)
                .ok_or_else(|| PkgError::NotADirectDependency { name: name.clone() })?;
            if !seen.insert(name.clone()) {
                return Err(PkgError::AmbiguousUpdateTarget { name });
            }
            targets.add(dep.clone());
        }

        let tree = match Lockfile::read_from(&self.lockfile_path())? {
            Some(lockfile) => {
                let base = lockfile.tree()?;
                let incoming = self.resolver().resolve(&targets)?;
                let mut merged = base.merge(&incoming);
                merged.ensure_install_paths();
                merged.check_for_conflicts()?;
                merged
            }
            None => {
                debug!("no lockfile, resolving every direct dependency");
                self.resolver().resolve(&current)?
            }
        };

        let count = self.materialize(&tree.flatten())?;
        Lockfile::from_tree(current, &tree).write_to(&self.lockfile_path())?;

        let mut summary = InstallSummary::new(InstallMode::Resolved, count);
        summary.updated = targets.names().map(str::to_string).collect();
        info!(packages = count, "Updated dependencies");
        Ok(summary)
    }

    /// Remove direct dependencies along with their whole subtrees.
    ///
    /// # Errors
    /// `NotADirectDependency` for a name missing from the manifest (checked
    /// before anything is touched), and any source or persistence error.
    pub fn uninstall<N: AsRef<str>>(&self, names: &[N]) -> Result<InstallSummary, PkgError> {
        let mut manifest = Manifest::read_from(&self.manifest_path())?;
        let names: Vec<String> = names.iter().map(|n| canonicalize_name(n.as_ref())).collect();
        if let Some(missing) = names.iter().find(|n| !manifest.has_dependency(n)) {
            return Err(PkgError::NotADirectDependency {
                name: missing.clone(),
            });
        }

        manifest.remove_dependencies(&names);
        let remaining = manifest.dependencies()?;

        let tree = match Lockfile::read_from(&self.lockfile_path())? {
            Some(lockfile) => {
                let mut tree = lockfile.tree()?.without_roots(&names);
                tree.ensure_install_paths();
                tree
            }
            None => self.resolver().resolve(&remaining)?,
        };

        let count = self.materialize(&tree.flatten())?;
        manifest.write_to(&self.manifest_path())?;
        Lockfile::from_tree(remaining, &tree).write_to(&self.lockfile_path())?;

        let mut summary = InstallSummary::new(InstallMode::Resolved, count);
        summary.removed = names;
        info!(packages = count, "Uninstalled dependencies");
        Ok(summary)
    }

    /// Rebuild `ahkpm-modules` from `nodes`, each copied to its install path.
    fn materialize(&self, nodes: &[ResolvedDependency]) -> Result<usize, PkgError> {
        let relative: Vec<PathBuf> = nodes
            .iter()
            .map(|node| {
                module_relative_path(&node.install_path).ok_or_else(|| PkgError::MalformedLockTree {
                    name: node.name.clone(),
                    install_path: node.install_path.clone(),
                })
            })
            .collect::<Result<_, _>>()?;

        std::fs::create_dir_all(&self.root)?;
        let staging = tempfile::Builder::new()
            .prefix(".ahkpm-modules-staging")
            .tempdir_in(&self.root)?;

        for (node, path) in nodes.iter().zip(&relative) {
            debug!(package = %node, path = %path.display(), "copying package");
            self.source.copy(node, &staging.path().join(path))?;
        }

        ahkpm_util::fs::replace_dir(staging.path(), &self.modules_dir())?;
        Ok(nodes.len())
    }
}

/// Turn `ahkpm-modules/a/b/c` into `a/b/c`, rejecting anything that could
/// escape the module directory.
fn module_relative_path(install_path: &str) -> Option<PathBuf> {
    let rest = install_path.strip_prefix(MODULES_DIR)?.strip_prefix('/')?;
    let path: PathBuf = rest.split('/').collect();
    let safe = !rest.is_empty()
        && rest.split('/').all(|s| !s.is_empty())
        && path.components().all(|c| matches!(c, Component::Normal(_)));
    safe.then_some(path)
}
