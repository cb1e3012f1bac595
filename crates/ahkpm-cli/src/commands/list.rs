//! `ahkpm list` command implementation.

use super::{fail, project_root};
use ahkpm_core::pkg::{Dependency, Manifest, MANIFEST_NAME};
use ahkpm_core::Config;
use miette::Result;

pub fn run(config: &Config, json: bool) -> Result<()> {
    let root = project_root(config, json)?;
    let dependencies = match Manifest::read_from(&root.join(MANIFEST_NAME)).and_then(|m| m.dependencies()) {
        Ok(set) => set.to_sorted_vec(),
        Err(e) => return fail(e.into(), json),
    };

    if json {
        let list: Vec<_> = dependencies
            .iter()
            .map(|dep| {
                serde_json::json!({
                    "name": dep.name(),
                    "version": dep.version().to_string(),
                    "kind": dep.version().kind().to_string(),
                })
            })
            .collect();
        println!("{}", serde_json::json!({ "ok": true, "dependencies": list }));
    } else {
        print!("{}", render_table(&dependencies));
    }
    Ok(())
}

/// Two-column table of names and version specifiers.
fn render_table(dependencies: &[Dependency]) -> String {
    let versions: Vec<String> = dependencies.iter().map(|d| d.version().to_string()).collect();
    let name_width = dependencies
        .iter()
        .map(|d| d.name().len())
        .max()
        .unwrap_or(0)
        .max("Name".len());
    let version_width = versions.iter().map(String::len).max().unwrap_or(0).max("Version".len());

    let mut out = format!("{:<name_width$}\tVersion\n", "Name");
    out.push_str(&format!("{}\t{}\n", "-".repeat(name_width), "-".repeat(version_width)));
    for (dep, version) in dependencies.iter().zip(&versions) {
        out.push_str(&format!("{:<name_width$}\t{version}\n", dep.name()));
    }
    out
}
