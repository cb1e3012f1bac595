use crate::error::Error;
use crate::paths::{self, CACHE_DIR_ENV};
use crate::pkg::{ResolveOptions, REMOTE_BASE_ENV};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment variable for the number of resolver threads.
pub const JOBS_ENV: &str = "AHKPM_JOBS";

/// Runtime configuration for the ahkpm CLI.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Current working directory.
    pub cwd: PathBuf,

    /// Whether to emit JSON logs.
    pub json_logs: bool,

    /// Verbosity level (0 = INFO, 1 = DEBUG, 2+ = TRACE).
    pub verbosity: u8,

    /// Package cache directory. `None` means the platform default.
    pub cache_dir: Option<PathBuf>,

    /// Base URL replacing `https://` for package remotes.
    pub remote_base: Option<String>,

    /// Resolver threads. 1 resolves sequentially.
    pub jobs: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cwd: std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            json_logs: false,
            verbosity: 0,
            cache_dir: None,
            remote_base: None,
            jobs: 1,
        }
    }
}

impl Config {
    /// Create a new config with the given working directory.
    #[must_use]
    pub fn new(cwd: PathBuf) -> Self {
        Self {
            cwd,
            ..Default::default()
        }
    }

    /// Create a config for `cwd` with `AHKPM_*` environment overrides.
    ///
    /// # Errors
    /// Returns `InvalidEnv` if `AHKPM_JOBS` is not a positive integer.
    pub fn from_env(cwd: PathBuf) -> Result<Self, Error> {
        let mut config = Self::new(cwd);

        if let Some(dir) = non_empty_var(CACHE_DIR_ENV) {
            config.cache_dir = Some(PathBuf::from(dir));
        }
        config.remote_base = non_empty_var(REMOTE_BASE_ENV);
        if let Some(jobs) = non_empty_var(JOBS_ENV) {
            config.jobs = parse_jobs(&jobs).ok_or_else(|| Error::InvalidEnv {
                name: JOBS_ENV,
                value: jobs.clone(),
                reason: "expected a positive integer".to_string(),
            })?;
        }

        Ok(config)
    }

    /// Set verbosity level.
    #[must_use]
    pub fn with_verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Set JSON log output.
    #[must_use]
    pub fn with_json_logs(mut self, json: bool) -> Self {
        self.json_logs = json;
        self
    }

    /// Set the package cache directory.
    #[must_use]
    pub fn with_cache_dir(mut self, dir: PathBuf) -> Self {
        self.cache_dir = Some(dir);
        self
    }

    /// Set the resolver thread count. Zero is treated as one.
    #[must_use]
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// The package cache directory in effect.
    #[must_use]
    pub fn packages_cache_dir(&self) -> PathBuf {
        self.cache_dir
            .clone()
            .unwrap_or_else(paths::packages_cache_dir)
    }

    #[must_use]
    pub fn resolve_options(&self) -> ResolveOptions {
        ResolveOptions {
            jobs: self.jobs.max(1),
        }
    }

    /// The nearest directory at or above `cwd` that has an `ahkpm.json`.
    ///
    /// # Errors
    /// Returns `ProjectNotFound` if there is none.
    pub fn project_root(&self) -> Result<PathBuf, Error> {
        paths::project_root(&self.cwd).ok_or_else(|| Error::ProjectNotFound {
            start: self.cwd.clone(),
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parse_jobs(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok().filter(|&n| n > 0)
}
