//! `ahkpm update` command implementation.

use super::{fail, installer, print_summary};
use ahkpm_core::Config;
use miette::Result;

pub fn run(config: &Config, packages: &[String], json: bool) -> Result<()> {
    let installer = installer(config, json)?;
    match installer.update(packages) {
        Ok(summary) => {
            print_summary(&summary, json);
            Ok(())
        }
        Err(e) => fail(e.into(), json),
    }
}
