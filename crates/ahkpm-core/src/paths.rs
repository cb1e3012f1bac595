use crate::pkg::MANIFEST_NAME;
use crate::version::SCHEMA_VERSION;
use std::path::{Path, PathBuf};

/// Environment variable to override the package cache directory.
pub const CACHE_DIR_ENV: &str = "AHKPM_CACHE_DIR";

/// Find the project root by walking up from `cwd` looking for `ahkpm.json`.
///
/// Returns the first directory containing it, or `None` if none does.
#[must_use]
pub fn project_root(cwd: &Path) -> Option<PathBuf> {
    let mut current = cwd.to_path_buf();

    loop {
        if current.join(MANIFEST_NAME).is_file() {
            return Some(current);
        }

        if !current.pop() {
            return None;
        }
    }
}

/// Get the cache directory for ahkpm.
///
/// Uses platform-appropriate locations with versioning:
/// - Linux: `$XDG_CACHE_HOME/ahkpm/v{N}` or `~/.cache/ahkpm/v{N}`
/// - macOS: `~/Library/Caches/ahkpm/v{N}`
/// - Windows: `%LOCALAPPDATA%\ahkpm\v{N}`
#[must_use]
pub fn cache_dir() -> PathBuf {
    let base = dirs_next::cache_dir().map_or_else(
        || {
            dirs_next::home_dir().map_or_else(
                || PathBuf::from(".ahkpm-cache"),
                |p| p.join(".cache").join("ahkpm"),
            )
        },
        |p| p.join("ahkpm"),
    );

    base.join(format!("v{SCHEMA_VERSION}"))
}

/// Default directory for cloned packages.
#[must_use]
pub fn packages_cache_dir() -> PathBuf {
    cache_dir().join("packages")
}
