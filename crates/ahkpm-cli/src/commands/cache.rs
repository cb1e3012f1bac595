//! `ahkpm cache` command implementation.

use super::fail;
use ahkpm_core::pkg::PackageCache;
use ahkpm_core::{Config, Error};
use miette::Result;
use tracing::info;

pub fn clean(config: &Config, json: bool) -> Result<()> {
    let cache = PackageCache::new(config.packages_cache_dir());
    if !json {
        println!("Cleaning cache...");
    }

    cache.clear().or_else(|e| fail(Error::from(e), json))?;
    info!(path = %cache.root().display(), "package cache cleared");

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "path": cache.root().to_string_lossy(),
            })
        );
    } else {
        println!("Cache cleaned");
    }
    Ok(())
}
