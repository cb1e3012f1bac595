//! Arena-backed trees and the resolved dependency tree.
//!
//! Nodes live in a single `Vec` and refer to each other by [`NodeId`], so
//! parent links never alias and subtrees can be copied between trees with
//! [`Tree::graft`].

use super::error::PkgError;
use super::resolved::ResolvedDependency;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};

/// Directory that holds installed packages, relative to its owner.
pub const MODULES_DIR: &str = "ahkpm-modules";

/// Index of a node inside one [`Tree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone)]
struct Node<T> {
    value: T,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// An ordered forest.
#[derive(Debug, Clone)]
pub struct Tree<T> {
    nodes: Vec<Node<T>>,
    roots: Vec<NodeId>,
}

impl<T> Default for Tree<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            roots: Vec::new(),
        }
    }
}

impl<T> Tree<T> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Total number of nodes at every depth.
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn add_root(&mut self, value: T) -> NodeId {
        let id = self.push(value, None);
        self.roots.push(id);
        id
    }

    pub fn add_child(&mut self, parent: NodeId, value: T) -> NodeId {
        let id = self.push(value, Some(parent));
        self.nodes[parent.0].children.push(id);
        id
    }

    fn push(&mut self, value: T, parent: Option<NodeId>) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            value,
            parent,
            children: Vec::new(),
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: NodeId) -> &T {
        &self.nodes[id.0].value
    }

    pub fn get_mut(&mut self, id: NodeId) -> &mut T {
        &mut self.nodes[id.0].value
    }

    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    #[must_use]
    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    /// Parent, grandparent and so on up to the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&p| self.parent(p))
    }

    /// Pre-order over the whole forest, roots in order.
    #[must_use]
    pub fn iter(&self) -> PreOrder<'_, T> {
        PreOrder {
            tree: self,
            stack: self.roots.iter().rev().copied().collect(),
        }
    }

    /// Pre-order over the subtree rooted at `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> PreOrder<'_, T> {
        PreOrder {
            tree: self,
            stack: vec![id],
        }
    }

    /// Values in pre-order.
    pub fn values(&self) -> impl Iterator<Item = &T> + '_ {
        self.iter().map(move |id| self.get(id))
    }

    /// Visit every node in pre-order, stopping at the first error.
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn try_for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(NodeId, &T) -> Result<(), E>,
    {
        for id in self.iter() {
            f(id, self.get(id))?;
        }
        Ok(())
    }

    /// Build a tree of the same shape with every value transformed.
    ///
    /// `f` sees the source tree so it can look at a node's ancestors.
    pub fn map<U, F>(&self, mut f: F) -> Tree<U>
    where
        F: FnMut(&Self, NodeId) -> U,
    {
        let nodes = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, node)| Node {
                value: f(self, NodeId(i)),
                parent: node.parent,
                children: node.children.clone(),
            })
            .collect();
        Tree {
            nodes,
            roots: self.roots.clone(),
        }
    }

    /// Sort roots and every child list, keeping equal elements in order.
    pub fn sort_by<F>(&mut self, mut cmp: F)
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let nodes = &self.nodes;
        self.roots
            .sort_by(|a, b| cmp(&nodes[a.0].value, &nodes[b.0].value));

        for i in 0..self.nodes.len() {
            let mut children = std::mem::take(&mut self.nodes[i].children);
            children.sort_by(|a, b| cmp(&self.nodes[a.0].value, &self.nodes[b.0].value));
            self.nodes[i].children = children;
        }
    }
}

impl<T: Clone> Tree<T> {
    /// Deep-copy the subtree at `source_id` in `source` into this tree,
    /// under `parent` or as a new root.
    pub fn graft(&mut self, parent: Option<NodeId>, source: &Tree<T>, source_id: NodeId) -> NodeId {
        let value = source.get(source_id).clone();
        let id = match parent {
            Some(parent) => self.add_child(parent, value),
            None => self.add_root(value),
        };
        for &child in source.children(source_id) {
            self.graft(Some(id), source, child);
        }
        id
    }
}

/// Pre-order node iterator.
pub struct PreOrder<'a, T> {
    tree: &'a Tree<T>,
    stack: Vec<NodeId>,
}

impl<T> Iterator for PreOrder<'_, T> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.tree.children(id).iter().rev().copied());
        Some(id)
    }
}

/// The fully resolved dependency forest of a project.
#[derive(Debug, Clone, Default)]
pub struct ResolvedDependencyTree {
    tree: Tree<ResolvedDependency>,
}

impl From<Tree<ResolvedDependency>> for ResolvedDependencyTree {
    fn from(tree: Tree<ResolvedDependency>) -> Self {
        Self { tree }
    }
}

impl ResolvedDependencyTree {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn as_tree(&self) -> &Tree<ResolvedDependency> {
        &self.tree
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tree.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tree.is_empty()
    }

    pub fn roots(&self) -> impl Iterator<Item = &ResolvedDependency> + '_ {
        self.tree.roots().iter().map(move |&id| self.tree.get(id))
    }

    #[must_use]
    pub fn root_names(&self) -> Vec<&str> {
        self.roots().map(|dep| dep.name.as_str()).collect()
    }

    /// Every node in pre-order.
    #[must_use]
    pub fn flatten(&self) -> Vec<ResolvedDependency> {
        self.tree.values().cloned().collect()
    }

    /// Visit every node in pre-order, stopping at the first error.
    ///
    /// # Errors
    /// Returns the first error produced by `f`.
    pub fn for_each<E, F>(&self, mut f: F) -> Result<(), E>
    where
        F: FnMut(&ResolvedDependency) -> Result<(), E>,
    {
        self.tree.try_for_each(|_, dep| f(dep))
    }

    /// Same shape, every node transformed.
    #[must_use]
    pub fn map<F>(&self, f: F) -> Self
    where
        F: FnMut(&Tree<ResolvedDependency>, NodeId) -> ResolvedDependency,
    {
        Self {
            tree: self.tree.map(f),
        }
    }

    /// The install path of a node derived from its ancestry, e.g.
    /// `ahkpm-modules/A/ahkpm-modules/C` for `C` under root `A`.
    #[must_use]
    pub fn install_path_of(&self, id: NodeId) -> String {
        install_path(&self.tree, id)
    }

    /// Recompute every node's install path from its position.
    pub fn ensure_install_paths(&mut self) {
        self.tree = self.tree.map(|tree, id| {
            let mut dep = tree.get(id).clone();
            dep.install_path = install_path(tree, id);
            dep
        });
    }

    /// Replace roots of `self` with same-named roots of `incoming`, and
    /// append incoming roots with new names. Only root level is compared;
    /// a replaced root takes the incoming subtree whole.
    ///
    /// Install paths are not recomputed.
    #[must_use]
    pub fn merge(&self, incoming: &ResolvedDependencyTree) -> Self {
        let mut by_name: HashMap<&str, NodeId> = HashMap::new();
        for &id in incoming.tree.roots() {
            by_name.entry(incoming.tree.get(id).name.as_str()).or_insert(id);
        }

        let mut merged = Tree::new();
        let mut placed: HashSet<&str> = HashSet::new();

        for &id in self.tree.roots() {
            let name = self.tree.get(id).name.as_str();
            match by_name.get(name) {
                Some(&replacement) => {
                    merged.graft(None, &incoming.tree, replacement);
                    placed.insert(name);
                }
                None => {
                    merged.graft(None, &self.tree, id);
                }
            }
        }

        for &id in incoming.tree.roots() {
            let name = incoming.tree.get(id).name.as_str();
            if placed.insert(name) {
                merged.graft(None, &incoming.tree, id);
            }
        }

        Self { tree: merged }
    }

    /// Drop the named roots together with their subtrees.
    #[must_use]
    pub fn without_roots<S: AsRef<str>>(&self, names: &[S]) -> Self {
        let mut kept = Tree::new();
        for &id in self.tree.roots() {
            let name = &self.tree.get(id).name;
            if !names.iter().any(|n| n.as_ref() == name) {
                kept.graft(None, &self.tree, id);
            }
        }
        Self { tree: kept }
    }

    /// Follow a path of names from the roots down.
    #[must_use]
    pub fn find_by_names_path<S: AsRef<str>>(&self, names: &[S]) -> Option<NodeId> {
        let (first, rest) = names.split_first()?;
        let mut current = self.find_in(self.tree.roots(), first.as_ref())?;
        for name in rest {
            current = self.find_in(self.tree.children(current), name.as_ref())?;
        }
        Some(current)
    }

    fn find_in(&self, level: &[NodeId], name: &str) -> Option<NodeId> {
        level
            .iter()
            .copied()
            .find(|&id| self.tree.get(id).name == name)
    }

    /// Rebuild a tree from its pre-order flattening, using each entry's
    /// install path to find its parent. Siblings end up sorted by name.
    ///
    /// # Errors
    /// Returns `MalformedLockTree` if an entry's install path does not end in
    /// its own name or names a parent that is not in the array.
    pub fn from_flat_array(entries: &[ResolvedDependency]) -> Result<Self, PkgError> {
        let mut pending = Vec::with_capacity(entries.len());
        for dep in entries {
            let ancestors = ancestor_names(dep).ok_or_else(|| malformed(dep))?;
            pending.push((dep, ancestors));
        }

        let mut result = Self::new();
        while !pending.is_empty() {
            let before = pending.len();
            pending.retain(|(dep, ancestors)| {
                if ancestors.is_empty() {
                    result.tree.add_root((*dep).clone());
                    return false;
                }
                match result.find_by_names_path(ancestors) {
                    Some(parent) => {
                        result.tree.add_child(parent, (*dep).clone());
                        false
                    }
                    None => true,
                }
            });

            if pending.len() == before {
                return Err(malformed(pending[0].0));
            }
        }

        result.tree.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(result)
    }

    /// Check that every name in the tree is pinned to one version string and
    /// one SHA.
    ///
    /// # Errors
    /// Returns `DependencyConflict` for the first disagreement found in
    /// pre-order.
    pub fn check_for_conflicts(&self) -> Result<(), PkgError> {
        let mut seen: HashMap<&str, &ResolvedDependency> = HashMap::new();
        for dep in self.tree.values() {
            match seen.get(dep.name.as_str()) {
                Some(first) if first.version != dep.version || first.sha != dep.sha => {
                    return Err(PkgError::DependencyConflict {
                        name: dep.name.clone(),
                        first_version: first.version.clone(),
                        first_sha: first.sha.clone(),
                        second_version: dep.version.clone(),
                        second_sha: dep.sha.clone(),
                    });
                }
                Some(_) => {}
                None => {
                    seen.insert(dep.name.as_str(), dep);
                }
            }
        }
        Ok(())
    }
}

fn install_path(tree: &Tree<ResolvedDependency>, id: NodeId) -> String {
    let mut names: Vec<&str> = tree
        .ancestors(id)
        .map(|a| tree.get(a).name.as_str())
        .collect();
    names.reverse();
    names.push(tree.get(id).name.as_str());

    let mut path = String::new();
    for name in names {
        if !path.is_empty() {
            path.push('/');
        }
        path.push_str(MODULES_DIR);
        path.push('/');
        path.push_str(name);
    }
    path
}

/// Names of the ancestors encoded in an install path, outermost first.
fn ancestor_names(dep: &ResolvedDependency) -> Option<Vec<String>> {
    let own = format!("{MODULES_DIR}/{}", dep.name);
    let rest = dep.install_path.strip_suffix(&own)?;
    if rest.is_empty() {
        return Some(Vec::new());
    }

    let rest = rest.strip_prefix(MODULES_DIR)?.strip_prefix('/')?;
    let rest = rest.strip_suffix('/')?;
    let separator = format!("/{MODULES_DIR}/");
    Some(rest.split(separator.as_str()).map(str::to_string).collect())
}

fn malformed(dep: &ResolvedDependency) -> PkgError {
    PkgError::MalformedLockTree {
        name: dep.name.clone(),
        install_path: dep.install_path.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(name: &str, version: &str, sha: &str) -> ResolvedDependency {
        ResolvedDependency::new(name, version, sha)
    }

    /// a -> (c, b -> c), d
    fn sample() -> ResolvedDependencyTree {
        let mut tree = Tree::new();
        let a = tree.add_root(node("github.com/x/a", "1.0.0", "a1"));
        tree.add_child(a, node("github.com/x/c", "1.0.0", "c1"));
        let b = tree.add_child(a, node("github.com/x/b", "^1.0.0", "b1"));
        tree.add_child(b, node("github.com/x/c", "1.0.0", "c1"));
        tree.add_root(node("github.com/x/d", "branch:main", "d1"));
        let mut tree = ResolvedDependencyTree::from(tree);
        tree.ensure_install_paths();
        tree
    }

    #[test]
    fn test_preorder_iteration() {
        let tree = sample();
        let names: Vec<_> = tree.flatten().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "github.com/x/a",
                "github.com/x/c",
                "github.com/x/b",
                "github.com/x/c",
                "github.com/x/d"
            ]
        );
    }

    #[test]
    fn test_ancestors_and_descendants() {
        let tree = sample();
        let raw = tree.as_tree();
        let a = raw.roots()[0];
        let b = raw.children(a)[1];
        let c = raw.children(b)[0];

        assert_eq!(raw.ancestors(c).collect::<Vec<_>>(), [b, a]);
        assert_eq!(raw.descendants(b).collect::<Vec<_>>(), [b, c]);
        assert!(raw.is_leaf(c));
        assert_eq!(raw.parent(a), None);
    }

    #[test]
    fn test_install_paths() {
        let tree = sample();
        let paths: Vec<_> = tree.flatten().into_iter().map(|d| d.install_path).collect();
        assert_eq!(
            paths,
            [
                "ahkpm-modules/github.com/x/a",
                "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/c",
                "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/b",
                "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/b/ahkpm-modules/github.com/x/c",
                "ahkpm-modules/github.com/x/d",
            ]
        );
    }

    #[test]
    fn test_for_each_stops_at_first_error() {
        let tree = sample();
        let mut visited = 0;
        let result = tree.for_each(|dep| {
            visited += 1;
            if dep.name == "github.com/x/b" {
                Err("stop")
            } else {
                Ok(())
            }
        });
        assert_eq!(result, Err("stop"));
        assert_eq!(visited, 3);
    }

    #[test]
    fn test_map_preserves_shape() {
        let tree = sample();
        let upper = tree.map(|t, id| {
            let mut dep = t.get(id).clone();
            dep.sha = dep.sha.to_uppercase();
            dep
        });
        assert_eq!(upper.len(), tree.len());
        assert_eq!(upper.flatten()[3].sha, "C1");
        assert_eq!(upper.flatten()[3].install_path, tree.flatten()[3].install_path);
    }

    #[test]
    fn test_flat_array_round_trip() {
        let tree = sample();
        let flat = tree.flatten();
        let rebuilt = ResolvedDependencyTree::from_flat_array(&flat).unwrap();

        // Children of `a` come back sorted by name (b before c)
        let names: Vec<_> = rebuilt.flatten().into_iter().map(|d| d.name).collect();
        assert_eq!(
            names,
            [
                "github.com/x/a",
                "github.com/x/b",
                "github.com/x/c",
                "github.com/x/c",
                "github.com/x/d"
            ]
        );

        let mut sorted_input = flat.clone();
        sorted_input.sort_by(|a, b| a.install_path.cmp(&b.install_path));
        let mut sorted_output = rebuilt.flatten();
        sorted_output.sort_by(|a, b| a.install_path.cmp(&b.install_path));
        assert_eq!(sorted_input, sorted_output);
    }

    #[test]
    fn test_from_flat_array_child_before_parent() {
        let mut flat = sample().flatten();
        flat.reverse();
        let rebuilt = ResolvedDependencyTree::from_flat_array(&flat).unwrap();
        assert_eq!(rebuilt.len(), 5);
        assert_eq!(rebuilt.root_names(), ["github.com/x/a", "github.com/x/d"]);
    }

    #[test]
    fn test_from_flat_array_orphan_is_malformed() {
        let mut orphan = node("github.com/x/c", "1.0.0", "c1");
        orphan.install_path =
            "ahkpm-modules/github.com/x/missing/ahkpm-modules/github.com/x/c".to_string();
        let err = ResolvedDependencyTree::from_flat_array(&[orphan]).unwrap_err();
        assert!(matches!(err, PkgError::MalformedLockTree { .. }));
    }

    #[test]
    fn test_from_flat_array_path_must_end_in_name() {
        let mut dep = node("github.com/x/a", "1.0.0", "a1");
        dep.install_path = "ahkpm-modules/github.com/x/other".to_string();
        let err = ResolvedDependencyTree::from_flat_array(&[dep]).unwrap_err();
        assert!(matches!(err, PkgError::MalformedLockTree { .. }));
    }

    #[test]
    fn test_merge_replaces_and_appends() {
        let base = sample();

        let mut incoming = Tree::new();
        incoming.add_root(node("github.com/x/a", "2.0.0", "a2"));
        incoming.add_root(node("github.com/x/e", "1.0.0", "e1"));
        let incoming = ResolvedDependencyTree::from(incoming);

        let mut merged = base.merge(&incoming);
        merged.ensure_install_paths();

        assert_eq!(
            merged.root_names(),
            ["github.com/x/a", "github.com/x/d", "github.com/x/e"]
        );
        let a = merged.roots().next().unwrap();
        assert_eq!(a.sha, "a2");
        // The replaced root brings its own (empty) subtree
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_merge_keeps_untouched_subtrees() {
        let base = sample();
        let mut incoming = Tree::new();
        incoming.add_root(node("github.com/x/d", "branch:main", "d2"));
        let merged = base.merge(&ResolvedDependencyTree::from(incoming));

        let flat = merged.flatten();
        assert_eq!(flat.len(), 5);
        assert_eq!(flat[3].sha, "c1");
        assert_eq!(flat[4].sha, "d2");
    }

    #[test]
    fn test_without_roots() {
        let tree = sample().without_roots(&["github.com/x/a"]);
        assert_eq!(tree.root_names(), ["github.com/x/d"]);
        assert_eq!(tree.len(), 1);
    }

    #[test]
    fn test_conflicts() {
        assert!(sample().check_for_conflicts().is_ok());

        let mut tree = Tree::new();
        let a = tree.add_root(node("github.com/x/a", "1.0.0", "a1"));
        tree.add_child(a, node("github.com/x/c", "1.2.3", "c1"));
        tree.add_root(node("github.com/x/c", "1.2.4", "c2"));
        let err = ResolvedDependencyTree::from(tree)
            .check_for_conflicts()
            .unwrap_err();
        assert!(matches!(
            err,
            PkgError::DependencyConflict { ref name, .. } if name == "github.com/x/c"
        ));
    }

    #[test]
    fn test_same_version_different_sha_conflicts() {
        let mut tree = Tree::new();
        tree.add_root(node("github.com/x/a", "branch:main", "a1"));
        let b = tree.add_root(node("github.com/x/b", "1.0.0", "b1"));
        tree.add_child(b, node("github.com/x/a", "branch:main", "a2"));
        assert!(ResolvedDependencyTree::from(tree).check_for_conflicts().is_err());
    }

    #[test]
    fn test_find_by_names_path() {
        let tree = sample();
        let found = tree
            .find_by_names_path(&["github.com/x/a", "github.com/x/b", "github.com/x/c"])
            .unwrap();
        assert_eq!(
            tree.install_path_of(found),
            "ahkpm-modules/github.com/x/a/ahkpm-modules/github.com/x/b/ahkpm-modules/github.com/x/c"
        );
        assert!(tree.find_by_names_path::<&str>(&[]).is_none());
        assert!(tree.find_by_names_path(&["github.com/x/b"]).is_none());
    }
}
