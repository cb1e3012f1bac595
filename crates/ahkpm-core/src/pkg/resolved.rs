//! A dependency pinned to an exact revision.

use super::dependency::DependencySet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One node of a resolution: the pinned revision of a package plus the
/// dependencies it declares at that revision.
///
/// `version` is the specifier text the package was requested with, not the
/// tag it resolved to. `install_path` is relative to the project root and
/// uses `/` separators on every platform.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDependency {
    pub name: String,
    pub version: String,
    pub sha: String,
    #[serde(default)]
    pub install_path: String,
    #[serde(default)]
    pub dependencies: DependencySet,
}

impl ResolvedDependency {
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, sha: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            sha: sha.into(),
            install_path: String::new(),
            dependencies: DependencySet::new(),
        }
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: DependencySet) -> Self {
        self.dependencies = dependencies;
        self
    }

    /// The first seven characters of the SHA.
    #[must_use]
    pub fn short_sha(&self) -> &str {
        self.sha.get(..7).unwrap_or(&self.sha)
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{} ({})", self.name, self.version, self.short_sha())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_field_names() {
        let mut dep = ResolvedDependency::new("github.com/a/a", "^1.0.0", "abc123");
        dep.install_path = "ahkpm-modules/github.com/a/a".to_string();
        dep.dependencies = DependencySet::from_specifiers(["gh:c/c@1.2.3"]).unwrap();

        let json = serde_json::to_value(&dep).unwrap();
        assert_eq!(json["name"], "github.com/a/a");
        assert_eq!(json["version"], "^1.0.0");
        assert_eq!(json["sha"], "abc123");
        assert_eq!(json["installPath"], "ahkpm-modules/github.com/a/a");
        assert_eq!(json["dependencies"]["github.com/c/c"], "1.2.3");
    }

    #[test]
    fn test_missing_dependencies_default_to_empty() {
        let json = r#"{"name":"github.com/a/a","version":"1.0.0","sha":"abc","installPath":"ahkpm-modules/github.com/a/a"}"#;
        let dep: ResolvedDependency = serde_json::from_str(json).unwrap();
        assert!(dep.dependencies.is_empty());
    }

    #[test]
    fn test_display_uses_short_sha() {
        let dep = ResolvedDependency::new("github.com/a/a", "1.0.0", "0123456789abcdef");
        assert_eq!(dep.to_string(), "github.com/a/a@1.0.0 (0123456)");

        let short = ResolvedDependency::new("github.com/a/a", "1.0.0", "abc");
        assert_eq!(short.short_sha(), "abc");
    }
}
