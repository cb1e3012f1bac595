//! `#Include` statements for installed packages.

use super::dependency::canonicalize_name;
use super::error::PkgError;
use super::manifest::{Manifest, MANIFEST_NAME};
use super::tree::MODULES_DIR;
use std::fs;
use std::path::{Component, Path};

const INCLUDE_PREFIX: &str = "#Include %A_ScriptDir%\\";

/// Build the `#Include` line for a direct dependency.
///
/// The path is relative to the directory of `script` (a path relative to
/// the project root), or to the project root when `script` is `None`.
///
/// # Errors
/// `NotADirectDependency` if `name` is not in the project manifest,
/// `ManifestNotFound` if the package is not installed, and
/// `IncludeNotDeclared` if its manifest has no `include`.
pub fn include_statement(project_root: &Path, name: &str, script: Option<&Path>) -> Result<String, PkgError> {
    let name = canonicalize_name(name);
    let manifest = Manifest::read_from(&project_root.join(MANIFEST_NAME))?;
    if !manifest.has_dependency(&name) {
        return Err(PkgError::NotADirectDependency { name });
    }

    let package_dir = name
        .split('/')
        .fold(project_root.join(MODULES_DIR), |path, segment| path.join(segment));
    let package = Manifest::read_from(&package_dir.join(MANIFEST_NAME))?;
    if package.include.is_empty() {
        return Err(PkgError::IncludeNotDeclared { name });
    }

    let mut target: Vec<String> = vec![MODULES_DIR.to_string()];
    target.extend(name.split('/').map(str::to_string));
    target.extend(
        package
            .include
            .split(['/', '\\'])
            .filter(|s| !s.is_empty())
            .map(str::to_string),
    );

    let depth = script
        .and_then(Path::parent)
        .map_or(0, |dir| {
            dir.components()
                .filter(|c| matches!(c, Component::Normal(_)))
                .count()
        });

    let mut parts: Vec<String> = std::iter::repeat("..".to_string()).take(depth).collect();
    parts.extend(target);
    Ok(format!("{INCLUDE_PREFIX}{}", parts.join("\\")))
}

/// Put `statement` on the first line of `script`, CRLF terminated.
///
/// # Errors
/// Returns an error if the script cannot be read or written.
pub fn prepend_include(script: &Path, statement: &str) -> Result<(), PkgError> {
    let existing = fs::read(script)?;
    let mut content = Vec::with_capacity(statement.len() + 2 + existing.len());
    content.extend_from_slice(statement.as_bytes());
    content.extend_from_slice(b"\r\n");
    content.extend_from_slice(&existing);
    ahkpm_util::fs::atomic_write(script, &content)?;
    Ok(())
}
