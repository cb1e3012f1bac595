pub mod cache;
pub mod include;
pub mod install;
pub mod list;
pub mod uninstall;
pub mod update;
pub mod version;

use ahkpm_core::pkg::{GitPackageSource, InstallSummary, Installer};
use ahkpm_core::{Config, Error};
use miette::Result;
use std::path::PathBuf;

/// Resolve the project root, printing a JSON error and exiting on failure.
pub fn project_root(config: &Config, json: bool) -> Result<PathBuf> {
    config.project_root().or_else(|e| fail(e, json))
}

/// Build an installer for the project, backed by git.
pub fn installer(config: &Config, json: bool) -> Result<Installer<GitPackageSource>> {
    let root = project_root(config, json)?;
    let source = GitPackageSource::new(config.packages_cache_dir(), config.remote_base.clone())
        .or_else(|e| fail(e.into(), json))?;
    Ok(Installer::new(source, root).with_options(config.resolve_options()))
}

/// Report a failed command.
///
/// With `json`, prints `{"ok": false, "error": {...}}` on stdout and exits 1.
/// Otherwise returns the error as a diagnostic.
pub fn fail<T>(err: Error, json: bool) -> Result<T> {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": false,
                "error": {
                    "code": err.code(),
                    "message": err.to_string(),
                }
            })
        );
        std::process::exit(1);
    }
    Err(miette::miette!("{err}"))
}

/// Print an installer summary.
pub fn print_summary(summary: &InstallSummary, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "summary": summary,
            })
        );
        return;
    }

    for name in &summary.removed {
        println!("Removed {name}");
    }
    for name in &summary.updated {
        println!("Updated {name}");
    }
    let noun = if summary.materialized == 1 { "package" } else { "packages" };
    println!("{} {noun} installed", summary.materialized);
}
