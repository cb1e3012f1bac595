#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::doc_markdown)]

mod commands;
mod logging;

use ahkpm_core::Config;
use clap::Parser;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "ahkpm")]
#[command(author, version, about = "A package manager for AutoHotkey", long_about = None)]
struct Cli {
    /// Increase logging verbosity (-v for DEBUG, -vv for TRACE)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit JSON formatted output (stable, machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Override the working directory
    #[arg(long, global = true, value_name = "PATH")]
    cwd: Option<PathBuf>,

    /// Threads used to resolve dependencies
    #[arg(long, global = true, value_name = "N", env = "AHKPM_JOBS")]
    jobs: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Print version information
    Version,

    /// Install the given packages, or everything in ahkpm.json / ahkpm.lock
    #[command(visible_alias = "i")]
    Install {
        /// Packages as <name>@<version>, e.g. gh:user/repo@^1.0.0
        #[arg(value_name = "PACKAGE@VERSION")]
        packages: Vec<String>,
    },

    /// Update packages to the newest version their specifier allows
    Update {
        /// Direct dependencies to update
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,
    },

    /// Uninstall packages
    #[command(visible_aliases = ["remove", "rm"])]
    Uninstall {
        /// Direct dependencies to remove
        #[arg(required = true, value_name = "PACKAGE")]
        packages: Vec<String>,
    },

    /// List direct dependencies and their versions
    List,

    /// Print the #Include statement for an installed package
    Include {
        /// Direct dependency to include
        package: String,

        /// Script to prepend the statement to
        #[arg(short, long, value_name = "FILE")]
        file: Option<PathBuf>,
    },

    /// Manage the package cache
    Cache {
        #[command(subcommand)]
        cache_cmd: CacheCommands,
    },
}

#[derive(clap::Subcommand, Debug)]
enum CacheCommands {
    /// Remove every cached package clone
    Clean,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let cwd = cli
        .cwd
        .or_else(|| std::env::current_dir().ok())
        .unwrap_or_else(|| PathBuf::from("."));

    let mut config = Config::from_env(cwd)
        .into_diagnostic()?
        .with_verbosity(cli.verbose)
        .with_json_logs(cli.json);
    if let Some(jobs) = cli.jobs {
        config = config.with_jobs(jobs);
    }

    if matches!(cli.command, Commands::Version) {
        return commands::version::run(cli.json);
    }

    logging::init(config.verbosity, config.json_logs);

    match cli.command {
        Commands::Version => Ok(()),
        Commands::Install { packages } => commands::install::run(&config, &packages, cli.json),
        Commands::Update { packages } => commands::update::run(&config, &packages, cli.json),
        Commands::Uninstall { packages } => commands::uninstall::run(&config, &packages, cli.json),
        Commands::List => commands::list::run(&config, cli.json),
        Commands::Include { package, file } => {
            commands::include::run(&config, &package, file.as_deref(), cli.json)
        }
        Commands::Cache {
            cache_cmd: CacheCommands::Clean,
        } => commands::cache::clean(&config, cli.json),
    }
}
