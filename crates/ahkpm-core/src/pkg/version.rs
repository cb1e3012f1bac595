//! Version specifiers for dependencies.
//!
//! A specifier is one of five kinds. Parsing tries them in a fixed order:
//! a full semantic version is an exact pin, then the `branch:`, `tag:` and
//! `commit:` prefixes are checked, then the string is tried as a semver
//! range. Anything else is rejected.

use super::error::PkgError;
use semver::{Version as SemVer, VersionReq};
use std::fmt;
use std::str::FromStr;

/// The kind of a version specifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VersionKind {
    SemVerExact,
    SemVerRange,
    Branch,
    Tag,
    Commit,
}

impl VersionKind {
    /// The textual prefix for kinds that carry one.
    #[must_use]
    pub fn prefix(self) -> Option<&'static str> {
        match self {
            Self::Branch => Some("branch"),
            Self::Tag => Some("tag"),
            Self::Commit => Some("commit"),
            Self::SemVerExact | Self::SemVerRange => None,
        }
    }

    /// Lowercase human-readable name, e.g. "semantic version range".
    #[must_use]
    pub fn describe(self) -> &'static str {
        match self {
            Self::SemVerExact => "semantic version",
            Self::SemVerRange => "semantic version range",
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Commit => "commit",
        }
    }
}

impl fmt::Display for VersionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::SemVerExact => "semver-exact",
            Self::SemVerRange => "semver-range",
            Self::Branch => "branch",
            Self::Tag => "tag",
            Self::Commit => "commit",
        };
        f.write_str(s)
    }
}

/// A parsed version specifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Version {
    kind: VersionKind,
    value: String,
}

impl Version {
    /// Parse a version specifier string.
    ///
    /// # Errors
    /// Returns `InvalidVersionSpecifier` if the string matches no kind.
    pub fn parse(specifier: &str) -> Result<Self, PkgError> {
        let invalid = || PkgError::InvalidVersionSpecifier {
            specifier: specifier.to_string(),
        };

        if specifier.is_empty() {
            return Err(invalid());
        }

        if SemVer::parse(specifier).is_ok() {
            return Ok(Self {
                kind: VersionKind::SemVerExact,
                value: specifier.to_string(),
            });
        }

        for kind in [VersionKind::Branch, VersionKind::Tag, VersionKind::Commit] {
            let Some(prefix) = kind.prefix() else {
                continue;
            };
            if let Some(value) = specifier
                .strip_prefix(prefix)
                .and_then(|rest| rest.strip_prefix(':'))
            {
                if value.is_empty() {
                    return Err(invalid());
                }
                return Ok(Self {
                    kind,
                    value: value.to_string(),
                });
            }
        }

        if VersionRange::parse(specifier).is_ok() {
            return Ok(Self {
                kind: VersionKind::SemVerRange,
                value: legible_range(specifier),
            });
        }

        Err(invalid())
    }

    #[must_use]
    pub fn kind(&self) -> VersionKind {
        self.kind
    }

    /// The specifier without any kind prefix.
    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn is_range(&self) -> bool {
        self.kind == VersionKind::SemVerRange
    }

    /// Parse the value as a range. Only meaningful for `SemVerRange`.
    ///
    /// # Errors
    /// Returns `InvalidVersionSpecifier` if the value is not a range.
    pub fn range(&self) -> Result<VersionRange, PkgError> {
        VersionRange::parse(&self.value)
    }

    /// Widen an exact semantic version to the caret range starting at it.
    /// Other kinds are returned unchanged.
    #[must_use]
    pub fn caret_range(self) -> Self {
        match self.kind {
            VersionKind::SemVerExact => Self {
                kind: VersionKind::SemVerRange,
                value: format!("^{}", self.value),
            },
            _ => self,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.prefix() {
            Some(prefix) => write!(f, "{prefix}:{}", self.value),
            None => f.write_str(&self.value),
        }
    }
}

impl FromStr for Version {
    type Err = PkgError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Rewrite the short forms `1` and `1.2` as `1.x.x` and `1.2.x`.
fn legible_range(range: &str) -> String {
    let parts: Vec<&str> = range.split('.').collect();
    let all_numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.chars().all(|c| c.is_ascii_digit()));
    if !all_numeric {
        return range.to_string();
    }
    match parts.len() {
        1 => format!("{range}.x.x"),
        2 => format!("{range}.x"),
        _ => range.to_string(),
    }
}

/// A semver range, possibly with `||` alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionRange {
    alternatives: Vec<VersionReq>,
}

impl VersionRange {
    /// Parse a range expression.
    ///
    /// Handles caret and tilde ranges, comparators (with or without commas),
    /// hyphen ranges, x-ranges and `||` alternatives.
    ///
    /// # Errors
    /// Returns `InvalidVersionSpecifier` if any alternative fails to parse.
    pub fn parse(range: &str) -> Result<Self, PkgError> {
        let invalid = || PkgError::InvalidVersionSpecifier {
            specifier: range.to_string(),
        };

        let mut alternatives = Vec::new();
        for alt in range.split("||").map(str::trim) {
            if alt.is_empty() {
                return Err(invalid());
            }
            alternatives.push(parse_range(alt).map_err(|_| invalid())?);
        }

        Ok(Self { alternatives })
    }

    #[must_use]
    pub fn matches(&self, version: &SemVer) -> bool {
        self.alternatives.iter().any(|req| req.matches(version))
    }
}

/// Pick the highest tag that is a strict semantic version inside `range`.
///
/// Tags that are not valid semantic versions (including `v`-prefixed ones)
/// are ignored.
#[must_use]
pub fn highest_matching_tag<'a, I>(tags: I, range: &VersionRange) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .filter_map(|tag| SemVer::parse(tag).ok().map(|v| (v, tag)))
        .filter(|(v, _)| range.matches(v))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag)
}

/// Pick the highest tag that is a strict semantic version.
#[must_use]
pub fn highest_tag<'a, I>(tags: I) -> Option<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    tags.into_iter()
        .filter_map(|tag| SemVer::parse(tag).ok().map(|v| (v, tag)))
        .max_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, tag)| tag)
}

fn parse_range(range: &str) -> Result<VersionReq, semver::Error> {
    let range = range.trim();

    // "1.0.0 - 2.0.0" -> ">=1.0.0, <=2.0.0"
    if let Some((start, end)) = parse_hyphen_range(range) {
        return VersionReq::parse(&format!(">={start}, <={end}"));
    }

    if range.contains('x') || range.contains('X') || range == "*" {
        return VersionReq::parse(&convert_x_range(range));
    }

    // ">= 2.1.2 < 3.0.0" -> ">=2.1.2, <3.0.0"
    VersionReq::parse(&convert_space_separated_comparators(range))
}

fn parse_hyphen_range(range: &str) -> Option<(&str, &str)> {
    let (start, end) = range.split_once(" - ")?;
    let (start, end) = (start.trim(), end.trim());
    if start.is_empty() || end.is_empty() {
        return None;
    }
    Some((start, end))
}

/// Join space separated comparators with commas.
fn convert_space_separated_comparators(range: &str) -> String {
    let mut result = String::new();
    let mut separator = "";

    for token in range.split_whitespace() {
        result.push_str(separator);
        result.push_str(token);
        // A bare operator ("<", ">=") stays attached to the next token
        separator = if token.ends_with(',') {
            " "
        } else if token.chars().any(|c| c.is_ascii_digit()) {
            ", "
        } else {
            ""
        };
    }

    result
}

fn convert_x_range(range: &str) -> String {
    if range == "*" || range == "x" || range == "X" {
        return ">=0.0.0".to_string();
    }

    fn is_wild(s: &str) -> bool {
        matches!(s, "x" | "X" | "*")
    }

    let parts: Vec<&str> = range.split('.').collect();

    match parts.as_slice() {
        [major, _] | [major, _, _] if parts[1..].iter().all(|p| is_wild(p)) => {
            if let Ok(m) = major.parse::<u64>() {
                return format!(">={m}.0.0, <{}.0.0", m + 1);
            }
        }
        [major, minor, patch] if is_wild(patch) => {
            if let (Ok(m), Ok(n)) = (major.parse::<u64>(), minor.parse::<u64>()) {
                return format!(">={m}.{n}.0, <{m}.{}.0", n + 1);
            }
        }
        _ => {}
    }

    // Leaves a string semver will reject
    range.replace(['x', 'X'], "0")
}
