//! `ahkpm install` command implementation.

use super::{fail, installer, print_summary};
use ahkpm_core::pkg::Dependency;
use ahkpm_core::Config;
use miette::Result;
use tracing::debug;

pub fn run(config: &Config, packages: &[String], json: bool) -> Result<()> {
    // Reject bad specifiers before looking for a project or git
    let checked = packages
        .iter()
        .try_for_each(|spec| Dependency::parse_specifier(spec).map(drop));
    if let Err(e) = checked {
        return fail(e.into(), json);
    }

    let installer = installer(config, json)?;
    debug!(root = %installer.root().display(), "INSTALL command invoked");

    let new_dependencies = match installer.dependencies_from_specifiers(packages) {
        Ok(set) => set,
        Err(e) => return fail(e.into(), json),
    };

    if !json {
        for dep in new_dependencies.iter() {
            println!(
                "Installing package {} with {} {}",
                dep.name(),
                dep.version().kind().describe(),
                dep.version().value()
            );
        }
    }

    match installer.install(&new_dependencies) {
        Ok(summary) => {
            print_summary(&summary, json);
            Ok(())
        }
        Err(e) => fail(e.into(), json),
    }
}
