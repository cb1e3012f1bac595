//! `ahkpm include` command implementation.

use super::{fail, project_root};
use ahkpm_core::pkg::{include_statement, prepend_include};
use ahkpm_core::{Config, Error};
use miette::Result;
use std::path::Path;

pub fn run(config: &Config, package: &str, file: Option<&Path>, json: bool) -> Result<()> {
    let root = project_root(config, json)?;

    let Some(file) = file else {
        let statement = include_statement(&root, package, None).or_else(|e| fail(e.into(), json))?;
        print_statement(&statement, None, json);
        return Ok(());
    };

    let script = config.cwd.join(file);
    let Ok(relative) = script.strip_prefix(&root) else {
        return fail(
            Error::other(format!(
                "{} is not inside the project at {}",
                script.display(),
                root.display()
            )),
            json,
        );
    };

    let statement =
        include_statement(&root, package, Some(relative)).or_else(|e| fail(e.into(), json))?;
    prepend_include(&script, &statement).or_else(|e| fail(e.into(), json))?;
    print_statement(&statement, Some(&script), json);
    Ok(())
}

fn print_statement(statement: &str, script: Option<&Path>, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "statement": statement,
                "file": script.map(|p| p.to_string_lossy()),
            })
        );
    } else if let Some(script) = script {
        println!("Added to {}: {statement}", script.display());
    } else {
        println!("{statement}");
    }
}
