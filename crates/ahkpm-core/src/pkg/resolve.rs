//! Dependency resolution.
//!
//! Turns a set of direct dependencies into a [`ResolvedDependencyTree`] by
//! asking a [`PackageSource`] for each node's SHA and declared dependencies,
//! depth first. Every occurrence of a package is resolved independently;
//! consistency across the tree is checked only once the whole forest exists.

use super::dependency::{Dependency, DependencySet};
use super::error::PkgError;
use super::resolved::ResolvedDependency;
use super::source::PackageSource;
use super::tree::{NodeId, ResolvedDependencyTree, Tree};
use rayon::prelude::*;
use std::io;
use tracing::debug;

/// Resolution options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveOptions {
    /// Worker threads for resolving sibling subtrees. `1` is sequential.
    pub jobs: usize,
}

impl Default for ResolveOptions {
    fn default() -> Self {
        Self { jobs: 1 }
    }
}

/// Resolves dependency sets against a package source.
pub struct Resolver<'a, S: ?Sized> {
    source: &'a S,
    options: ResolveOptions,
}

/// A resolved node with its resolved children, before it is placed in a tree.
struct Subtree {
    value: ResolvedDependency,
    children: Vec<Subtree>,
}

impl Subtree {
    fn attach(self, tree: &mut Tree<ResolvedDependency>, parent: Option<NodeId>) {
        let id = match parent {
            Some(parent) => tree.add_child(parent, self.value),
            None => tree.add_root(self.value),
        };
        for child in self.children {
            child.attach(tree, Some(id));
        }
    }
}

impl<'a, S: PackageSource + ?Sized> Resolver<'a, S> {
    #[must_use]
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            options: ResolveOptions::default(),
        }
    }

    #[must_use]
    pub fn with_options(mut self, options: ResolveOptions) -> Self {
        self.options = options;
        self
    }

    /// Resolve `dependencies` and everything they depend on.
    ///
    /// Roots follow the set's name order, children follow each parent's
    /// declared set. Install paths are filled in.
    ///
    /// # Errors
    /// Propagates the first source error, `CyclicDependency` if a package
    /// depends on itself through its own subtree, and `DependencyConflict`
    /// if the finished tree pins one package two different ways.
    pub fn resolve(&self, dependencies: &DependencySet) -> Result<ResolvedDependencyTree, PkgError> {
        let forest = if self.options.jobs > 1 {
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(self.options.jobs)
                .thread_name(|i| format!("ahkpm-resolve-{i}"))
                .build()
                .map_err(|e| PkgError::Io(io::Error::other(e)))?;
            pool.install(|| self.resolve_set(dependencies, &[]))?
        } else {
            self.resolve_set(dependencies, &[])?
        };

        let mut tree = Tree::new();
        for subtree in forest {
            subtree.attach(&mut tree, None);
        }

        let mut tree = ResolvedDependencyTree::from(tree);
        tree.ensure_install_paths();
        tree.check_for_conflicts()?;
        Ok(tree)
    }

    fn resolve_set(&self, dependencies: &DependencySet, ancestors: &[String]) -> Result<Vec<Subtree>, PkgError> {
        let dependencies: Vec<&Dependency> = dependencies.iter().collect();
        if self.options.jobs > 1 {
            // Collecting an indexed parallel iterator keeps input order
            dependencies
                .par_iter()
                .map(|dep| self.resolve_one(dep, ancestors))
                .collect()
        } else {
            dependencies
                .iter()
                .map(|dep| self.resolve_one(dep, ancestors))
                .collect()
        }
    }

    fn resolve_one(&self, dependency: &Dependency, ancestors: &[String]) -> Result<Subtree, PkgError> {
        let name = dependency.name();
        if let Some(start) = ancestors.iter().position(|a| a == name) {
            let mut cycle = ancestors[start..].to_vec();
            cycle.push(name.to_string());
            return Err(PkgError::CyclicDependency { cycle });
        }

        let sha = self.source.resolve_sha(dependency)?;
        let resolved = ResolvedDependency::new(name, dependency.version().to_string(), sha);
        let declared = self.source.declared_dependencies(&resolved)?;
        debug!(
            package = name,
            version = %dependency.version(),
            sha = %resolved.sha,
            depth = ancestors.len(),
            children = declared.len(),
            "resolved"
        );

        let mut path = ancestors.to_vec();
        path.push(name.to_string());
        let children = self.resolve_set(&declared, &path)?;

        Ok(Subtree {
            value: resolved.with_dependencies(declared),
            children,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pkg::memory::MemorySource;

    fn deps(specs: &[&str]) -> DependencySet {
        DependencySet::from_specifiers(specs).unwrap()
    }

    /// a@1.0.0 -> c@1.0.0 ; b@1.0.0 -> c@1.0.0
    fn diamond() -> MemorySource {
        let source = MemorySource::new();
        source
            .add_revision("github.com/x/a", "a1", deps(&["gh:x/c@1.0.0"]))
            .tag("github.com/x/a", "1.0.0", "a1")
            .add_revision("github.com/x/b", "b1", deps(&["gh:x/c@1.0.0"]))
            .tag("github.com/x/b", "1.0.0", "b1")
            .add_revision("github.com/x/c", "c1", DependencySet::new())
            .tag("github.com/x/c", "1.0.0", "c1");
        source
    }

    #[test]
    fn test_resolve_diamond() {
        let source = diamond();
        let tree = Resolver::new(&source)
            .resolve(&deps(&["gh:x/b@1.0.0", "gh:x/a@1.0.0"]))
            .unwrap();

        let flat = tree.flatten();
        let paths: Vec<_> = flat.iter().map(|d| d.install_path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "ahkpm-modules/github.com/x/a",
                "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/c",
                "ahkpm-modules/github.com/x/b",
                "ahkpm-modules/github.com/x/b/ahkpm-modules/github.com/x/c",
            ]
        );
        assert_eq!(flat[0].dependencies, deps(&["gh:x/c@1.0.0"]));
    }

    #[test]
    fn test_resolve_empty_set() {
        let source = MemorySource::new();
        let tree = Resolver::new(&source).resolve(&DependencySet::new()).unwrap();
        assert!(tree.is_empty());
    }

    #[test]
    fn test_conflict_detected_after_resolution() {
        let source = diamond();
        source
            .add_revision("github.com/x/c", "c2", DependencySet::new())
            .tag("github.com/x/c", "1.1.0", "c2")
            .add_revision("github.com/x/b", "b2", deps(&["gh:x/c@1.1.0"]))
            .tag("github.com/x/b", "2.0.0", "b2");

        let err = Resolver::new(&source)
            .resolve(&deps(&["gh:x/a@1.0.0", "gh:x/b@2.0.0"]))
            .unwrap_err();
        assert!(matches!(err, PkgError::DependencyConflict { ref name, .. } if name == "github.com/x/c"));
    }

    #[test]
    fn test_cycle_detected() {
        let source = MemorySource::new();
        source
            .add_revision("github.com/x/a", "a1", deps(&["gh:x/b@1.0.0"]))
            .tag("github.com/x/a", "1.0.0", "a1")
            .add_revision("github.com/x/b", "b1", deps(&["gh:x/a@1.0.0"]))
            .tag("github.com/x/b", "1.0.0", "b1");

        let err = Resolver::new(&source)
            .resolve(&deps(&["gh:x/a@1.0.0"]))
            .unwrap_err();
        match err {
            PkgError::CyclicDependency { cycle } => assert_eq!(
                cycle,
                ["github.com/x/a", "github.com/x/b", "github.com/x/a"]
            ),
            other => panic!("expected cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_source_errors_propagate() {
        let source = diamond();
        let err = Resolver::new(&source)
            .resolve(&deps(&["gh:x/a@9.9.9"]))
            .unwrap_err();
        assert!(matches!(err, PkgError::RevisionNotFound { .. }));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let source = diamond();
        let set = deps(&["gh:x/a@1.0.0", "gh:x/b@1.0.0", "gh:x/c@1.0.0"]);

        let sequential = Resolver::new(&source).resolve(&set).unwrap();
        let parallel = Resolver::new(&source)
            .with_options(ResolveOptions { jobs: 4 })
            .resolve(&set)
            .unwrap();

        assert_eq!(sequential.flatten(), parallel.flatten());
    }
}
