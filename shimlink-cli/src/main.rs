mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{CheckOptions, Project};

#[derive(Parser)]
#[command(name = "shimlink")]
#[command(version)]
#[command(about = "Platform-aware module aliasing for React Native bundles", long_about = None)]
struct Cli {
    /// Alias configuration file
    #[arg(short, long, global = true, value_name = "PATH", default_value = "shimlink.json")]
    config: PathBuf,

    /// Project root (where node_modules and the application live)
    #[arg(short, long, global = true, value_name = "PATH", default_value = ".")]
    root: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize shimlink.json in an existing directory
    Init {
        /// Project path (default: current directory)
        #[arg(value_name = "PATH")]
        path: Option<PathBuf>,
    },

    /// List the alias table
    List {
        /// Only show entries for this target
        #[arg(short, long, value_name = "TARGET")]
        target: Option<String>,
    },

    /// Resolve module ids for a build target
    Resolve {
        /// Module ids as written in import statements
        #[arg(value_name = "ID", required = true)]
        ids: Vec<String>,

        /// Build target (ios, android, native, web)
        #[arg(short, long, value_name = "TARGET")]
        target: String,

        /// Print the file the bundler would load instead of the reference
        #[arg(long)]
        path: bool,
    },

    /// Check that every shim exports what the application uses
    Check {
        /// Only check substitutes for this target
        #[arg(short, long, value_name = "TARGET")]
        target: Option<String>,

        /// Fail on any conformance violation
        #[arg(long)]
        strict: bool,

        /// Output diagnostics as JSON (for CI and editors)
        #[arg(long)]
        json: bool,

        /// Fail if shimlink.lock is missing or out of date
        #[arg(long)]
        locked: bool,
    },

    /// Pin every shim to its current source in shimlink.lock
    Lock,

    /// Compare the alias tables of two configuration files
    Diff {
        #[arg(value_name = "LEFT")]
        left: PathBuf,

        #[arg(value_name = "RIGHT")]
        right: PathBuf,

        /// Output the drift report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();
    log::debug!("root: {}, config: {}", cli.root.display(), cli.config.display());

    match cli.command {
        Commands::Init { path } => {
            commands::init(path.or(Some(cli.root)))?;
            Ok(())
        }

        Commands::List { target } => {
            let project = Project::open(&cli.root, &cli.config)?;
            commands::list(&project, target.as_deref())
        }

        Commands::Resolve { ids, target, path } => {
            let project = Project::open(&cli.root, &cli.config)?;
            commands::resolve(&project, &ids, &target, path)?;
            Ok(())
        }

        Commands::Check {
            target,
            strict,
            json,
            locked,
        } => {
            let project = Project::open(&cli.root, &cli.config)?;
            let options = CheckOptions {
                target,
                strict,
                json,
                locked,
            };
            if !commands::check(&project, &options)? {
                std::process::exit(1);
            }
            Ok(())
        }

        Commands::Lock => {
            let project = Project::open(&cli.root, &cli.config)?;
            commands::lock(&project)?;
            Ok(())
        }

        Commands::Diff { left, right, json } => {
            let count = commands::diff(&left, &right, json)?;
            log::info!("{} drifting entries", count);
            Ok(())
        }
    }
}
