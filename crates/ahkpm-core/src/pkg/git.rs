//! Git-backed package source.
//!
//! Every package is a git repository at `https://<name>.git`. A working
//! clone per package is kept in the [`PackageCache`]; revisions are resolved
//! and checked out there, then copied into the project without `.git`.

use super::cache::PackageCache;
use super::dependency::{Dependency, DependencySet};
use super::error::PkgError;
use super::manifest::{Manifest, MANIFEST_NAME};
use super::resolved::ResolvedDependency;
use super::source::PackageSource;
use super::version::{highest_matching_tag, highest_tag, Version, VersionKind};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::sync::PoisonError;
use tracing::{debug, warn};

/// Environment variable that replaces `https://` as the remote base.
pub const REMOTE_BASE_ENV: &str = "AHKPM_REMOTE_BASE";

/// Fragments of `git clone` stderr that mean the repository is missing.
const MISSING_REPO_MARKERS: &[&str] = &[
    "not found",
    "does not exist",
    "does not appear to be a git repository",
    "could not read username",
    "authentication failed",
];

/// Git-backed package source.
#[derive(Debug)]
pub struct GitPackageSource {
    git: PathBuf,
    cache: PackageCache,
    remote_base: Option<String>,
}

impl GitPackageSource {
    /// Create a source that clones into `cache_root`.
    ///
    /// With `remote_base` set, package `github.com/o/r` is fetched from
    /// `<remote_base>/github.com/o/r.git` instead of over https.
    ///
    /// # Errors
    /// Returns `GitUnavailable` if no `git` executable is on `PATH`.
    pub fn new(cache_root: impl Into<PathBuf>, remote_base: Option<String>) -> Result<Self, PkgError> {
        let git = which::which("git").map_err(|_| PkgError::GitUnavailable)?;
        Ok(Self {
            git,
            cache: PackageCache::new(cache_root),
            remote_base,
        })
    }

    #[must_use]
    pub fn cache(&self) -> &PackageCache {
        &self.cache
    }

    /// Remote URL for a package.
    #[must_use]
    pub fn remote_url(&self, name: &str) -> String {
        match &self.remote_base {
            Some(base) => format!("{}/{name}.git", base.trim_end_matches('/')),
            None => format!("https://{name}.git"),
        }
    }

    fn git(&self, dir: Option<&Path>, args: &[&str]) -> Result<Output, PkgError> {
        let mut cmd = Command::new(&self.git);
        if let Some(dir) = dir {
            cmd.arg("-C").arg(dir);
        }
        cmd.args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .stdin(Stdio::null())
            .output()
            .map_err(PkgError::from)
    }

    fn package_dir(&self, name: &str) -> Result<PathBuf, PkgError> {
        self.cache.package_dir(name).ok_or_else(|| PkgError::InvalidName {
            name: name.to_string(),
        })
    }

    /// Clone the package if needed, otherwise fetch. Returns the clone dir.
    ///
    /// A failed fetch on an existing clone is logged and ignored so work can
    /// continue offline from the cache.
    fn ensure_up_to_date(&self, name: &str) -> Result<PathBuf, PkgError> {
        let dir = self.package_dir(name)?;

        if self.cache.is_cached(name) {
            let output = self.git(Some(&dir), &["fetch", "--tags", "--force", "origin"])?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                warn!(
                    package = name,
                    stderr = stderr.trim(),
                    "Problem fetching latest updates to package. Continuing from local cache."
                );
            }
            return Ok(dir);
        }

        self.clone_into(name, &dir)?;
        Ok(dir)
    }

    fn clone_into(&self, name: &str, dir: &Path) -> Result<(), PkgError> {
        // Leftovers of an interrupted clone
        if dir.exists() {
            fs::remove_dir_all(dir)?;
        }
        if let Some(parent) = dir.parent() {
            fs::create_dir_all(parent)?;
        }

        let url = self.remote_url(name);
        debug!(package = name, url = %url, "cloning package");
        let dir_arg = dir.to_string_lossy();
        let output = self.git(None, &["clone", "--recurse-submodules", &url, &dir_arg])?;
        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr).to_lowercase();
        if MISSING_REPO_MARKERS.iter().any(|m| stderr.contains(m)) {
            return Err(PkgError::PackageNotFound {
                name: name.to_string(),
            });
        }
        Err(PkgError::source_io(
            name,
            format!("Error cloning package {name}: {}", stderr.trim()),
        ))
    }

    /// Make sure `sha` is present in the clone, fetching once if it is not.
    fn ensure_revision(&self, name: &str, sha: &str) -> Result<PathBuf, PkgError> {
        let dir = self.package_dir(name)?;
        if !self.cache.is_cached(name) {
            self.clone_into(name, &dir)?;
        }

        if self.rev_parse(&dir, sha)?.is_some() {
            return Ok(dir);
        }
        let dir = self.ensure_up_to_date(name)?;
        if self.rev_parse(&dir, sha)?.is_some() {
            Ok(dir)
        } else {
            Err(PkgError::revision_not_found(name, sha))
        }
    }

    fn rev_parse(&self, dir: &Path, rev: &str) -> Result<Option<String>, PkgError> {
        let spec = format!("{rev}^{{commit}}");
        let output = self.git(Some(dir), &["rev-parse", "--verify", "--quiet", &spec])?;
        if !output.status.success() {
            return Ok(None);
        }
        let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
        Ok((!sha.is_empty()).then_some(sha))
    }

    fn tags(&self, name: &str, dir: &Path) -> Result<Vec<String>, PkgError> {
        let output = self.git(Some(dir), &["tag", "--list"])?;
        if !output.status.success() {
            return Err(PkgError::source_io(
                name,
                format!("Error getting tags for package {name}"),
            ));
        }
        Ok(String::from_utf8_lossy(&output.stdout)
            .lines()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// The branch `origin/HEAD` points at, if the remote advertised one.
    fn default_branch(&self, dir: &Path) -> Result<Option<String>, PkgError> {
        let output = self.git(
            Some(dir),
            &["symbolic-ref", "--quiet", "--short", "refs/remotes/origin/HEAD"],
        )?;
        if !output.status.success() {
            return Ok(None);
        }
        let head = String::from_utf8_lossy(&output.stdout);
        let branch = head.trim();
        let branch = branch.strip_prefix("origin/").unwrap_or(branch);
        Ok((!branch.is_empty()).then(|| branch.to_string()))
    }

    /// Force the work tree to `sha`, including submodules.
    fn checkout(&self, name: &str, dir: &Path, sha: &str) -> Result<(), PkgError> {
        let output = self.git(
            Some(dir),
            &["-c", "advice.detachedHead=false", "checkout", "--force", "--detach", sha],
        )?;
        if !output.status.success() {
            return Err(PkgError::source_io(
                name,
                format!("Error checking out version {sha} of package {name}"),
            ));
        }

        let output = self.git(Some(dir), &["clean", "-ffdx"])?;
        if !output.status.success() {
            return Err(PkgError::source_io(
                name,
                format!("Error cleaning work tree of package {name}"),
            ));
        }

        if dir.join(".gitmodules").exists() {
            let output = self.git(Some(dir), &["submodule", "update", "--init", "--recursive"])?;
            if !output.status.success() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                if stderr.contains("Could not resolve host") {
                    warn!(package = name, "Could not update submodules, no network connection");
                } else {
                    return Err(PkgError::source_io(
                        name,
                        format!("Error updating submodules of package {name}: {}", stderr.trim()),
                    ));
                }
            }
        }

        Ok(())
    }
}

impl PackageSource for GitPackageSource {
    fn resolve_sha(&self, dependency: &Dependency) -> Result<String, PkgError> {
        let name = dependency.name();
        let version = dependency.version();
        let lock = self.cache.lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = self.ensure_up_to_date(name)?;
        let not_found = || PkgError::revision_not_found(name, &version.to_string());

        let rev = match version.kind() {
            VersionKind::SemVerRange => {
                let range = version.range()?;
                let tags = self.tags(name, &dir)?;
                let tag = highest_matching_tag(tags.iter().map(String::as_str), &range)
                    .ok_or_else(not_found)?;
                debug!(package = name, range = %version, tag, "range matched tag");
                format!("refs/tags/{tag}")
            }
            VersionKind::SemVerExact | VersionKind::Tag => format!("refs/tags/{}", version.value()),
            VersionKind::Branch => format!("refs/remotes/origin/{}", version.value()),
            VersionKind::Commit => version.value().to_string(),
        };

        self.rev_parse(&dir, &rev)?.ok_or_else(not_found)
    }

    fn latest_version(&self, name: &str) -> Result<Version, PkgError> {
        let lock = self.cache.lock(name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = self.ensure_up_to_date(name)?;
        let tags = self.tags(name, &dir)?;
        if let Some(tag) = highest_tag(tags.iter().map(String::as_str)) {
            return Version::parse(tag);
        }
        match self.default_branch(&dir)? {
            Some(branch) => Version::parse(&format!("branch:{branch}")),
            None => Err(PkgError::revision_not_found(name, "latest")),
        }
    }

    fn declared_dependencies(&self, resolved: &ResolvedDependency) -> Result<DependencySet, PkgError> {
        let lock = self.cache.lock(&resolved.name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = self.ensure_revision(&resolved.name, &resolved.sha)?;
        self.checkout(&resolved.name, &dir, &resolved.sha)?;

        let manifest_path = dir.join(MANIFEST_NAME);
        if !manifest_path.exists() {
            return Ok(DependencySet::new());
        }
        Manifest::read_from(&manifest_path)?.dependencies()
    }

    fn copy(&self, resolved: &ResolvedDependency, destination: &Path) -> Result<(), PkgError> {
        let lock = self.cache.lock(&resolved.name);
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);

        let dir = self.ensure_revision(&resolved.name, &resolved.sha)?;
        self.checkout(&resolved.name, &dir, &resolved.sha)?;

        ahkpm_util::fs::copy_dir_filtered(&dir, destination, |path| {
            path.file_name().is_some_and(|n| n == ".git")
        })
        .map_err(|e| {
            PkgError::source_io(
                &resolved.name,
                format!("Error copying package to target module directory: {e}"),
            )
        })
    }

    fn clear_cache(&self) -> Result<(), PkgError> {
        self.cache.clear()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remote_url() {
        let Ok(source) = GitPackageSource::new("/tmp/cache", None) else {
            return;
        };
        assert_eq!(
            source.remote_url("github.com/owner/repo"),
            "https://github.com/owner/repo.git"
        );

        let Ok(local) = GitPackageSource::new("/tmp/cache", Some("/srv/git/".to_string())) else {
            return;
        };
        assert_eq!(
            local.remote_url("github.com/owner/repo"),
            "/srv/git/github.com/owner/repo.git"
        );
    }
}
