//! Dependency names and dependency sets.

use super::error::PkgError;
use super::version::Version;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::OnceLock;

/// Shorthand prefix for GitHub hosted packages.
const GITHUB_SHORTHAND: &str = "gh:";
const GITHUB_HOST: &str = "github.com/";

fn name_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"^github\.com/[\w\-.]+/[\w\-.]+$").ok())
        .as_ref()
}

/// Expand the `gh:` shorthand. Other names are returned unchanged.
#[must_use]
pub fn canonicalize_name(name: &str) -> String {
    match name.strip_prefix(GITHUB_SHORTHAND) {
        Some(rest) => format!("{GITHUB_HOST}{rest}"),
        None => name.to_string(),
    }
}

/// Check that a canonical name is `github.com/<owner>/<repo>`.
///
/// Owner and repo may contain dots but may not consist only of dots, so a
/// name never walks out of the directory it is joined onto.
#[must_use]
pub fn is_valid_name(name: &str) -> bool {
    name_pattern().is_some_and(|re| re.is_match(name))
        && name
            .split('/')
            .skip(1)
            .all(|segment| segment.chars().any(|c| c != '.'))
}

/// A direct dependency: a canonical package name and a version specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency {
    name: String,
    version: Version,
}

impl Dependency {
    #[must_use]
    pub fn new(name: impl Into<String>, version: Version) -> Self {
        Self {
            name: name.into(),
            version,
        }
    }

    /// Build a dependency from a raw name and version specifier.
    ///
    /// The name is canonicalized first. A bad name is reported before a bad
    /// version.
    ///
    /// # Errors
    /// Returns `InvalidName` or `InvalidVersionSpecifier`.
    pub fn from_specifiers(name: &str, version: &str) -> Result<Self, PkgError> {
        let name = canonicalize_name(name);
        if !is_valid_name(&name) {
            return Err(PkgError::InvalidName { name });
        }
        let version = Version::parse(version)?;
        Ok(Self { name, version })
    }

    /// Parse a `name@version` specifier, splitting on the first `@`.
    ///
    /// A specifier without `@` has an empty, and therefore invalid, version.
    ///
    /// # Errors
    /// Returns `InvalidName` or `InvalidVersionSpecifier`.
    pub fn from_specifier(specifier: &str) -> Result<Self, PkgError> {
        let (name, version) = specifier.split_once('@').unwrap_or((specifier, ""));
        Self::from_specifiers(name, version)
    }

    /// Like [`Dependency::from_specifier`], but a missing or empty version
    /// is returned as `None` for the caller to fill in.
    ///
    /// # Errors
    /// Returns `InvalidName`, or `InvalidVersionSpecifier` for a version that
    /// is present but malformed.
    pub fn parse_specifier(specifier: &str) -> Result<(String, Option<Version>), PkgError> {
        let (name, version) = specifier.split_once('@').unwrap_or((specifier, ""));
        let name = canonicalize_name(name);
        if !is_valid_name(&name) {
            return Err(PkgError::InvalidName { name });
        }
        if version.is_empty() {
            return Ok((name, None));
        }
        Ok((name, Some(Version::parse(version)?)))
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// A set of dependencies keyed by canonical name.
///
/// At most one entry per name; adding an existing name replaces it.
/// Iteration is in ascending name order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct DependencySet {
    entries: BTreeMap<String, Dependency>,
}

impl DependencySet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a list of `name@version` specifiers.
    ///
    /// # Errors
    /// Returns the first validation error encountered.
    pub fn from_specifiers<I, S>(specifiers: I) -> Result<Self, PkgError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self::new();
        for specifier in specifiers {
            set.add(Dependency::from_specifier(specifier.as_ref())?);
        }
        Ok(set)
    }

    /// Insert a dependency, replacing any entry with the same name.
    pub fn add(&mut self, dependency: Dependency) -> &mut Self {
        self.entries.insert(dependency.name.clone(), dependency);
        self
    }

    /// Insert every dependency of `other`, later entries winning.
    pub fn add_all(&mut self, other: &DependencySet) -> &mut Self {
        for dep in other.iter() {
            self.add(dep.clone());
        }
        self
    }

    /// Remove dependencies by name. Unknown names are ignored.
    pub fn remove_by_name<S: AsRef<str>>(&mut self, names: &[S]) -> &mut Self {
        for name in names {
            self.entries.remove(&canonicalize_name(name.as_ref()));
        }
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(&canonicalize_name(name))
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Dependency> {
        self.entries.get(&canonicalize_name(name))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate in ascending name order.
    pub fn iter(&self) -> impl Iterator<Item = &Dependency> {
        self.entries.values()
    }

    /// The dependencies as a list sorted by name.
    #[must_use]
    pub fn to_sorted_vec(&self) -> Vec<Dependency> {
        self.entries.values().cloned().collect()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl FromIterator<Dependency> for DependencySet {
    fn from_iter<T: IntoIterator<Item = Dependency>>(iter: T) -> Self {
        let mut set = Self::new();
        for dep in iter {
            set.add(dep);
        }
        set
    }
}

impl<'a> IntoIterator for &'a DependencySet {
    type Item = &'a Dependency;
    type IntoIter = std::collections::btree_map::Values<'a, String, Dependency>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.values()
    }
}

impl TryFrom<BTreeMap<String, String>> for DependencySet {
    type Error = PkgError;

    fn try_from(map: BTreeMap<String, String>) -> Result<Self, Self::Error> {
        let mut set = Self::new();
        for (name, version) in &map {
            set.add(Dependency::from_specifiers(name, version)?);
        }
        Ok(set)
    }
}

impl From<DependencySet> for BTreeMap<String, String> {
    fn from(set: DependencySet) -> Self {
        set.entries
            .into_iter()
            .map(|(name, dep)| (name, dep.version.to_string()))
            .collect()
    }
}
