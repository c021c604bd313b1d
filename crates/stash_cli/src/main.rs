//! Stash CLI: inspect and maintain a stash cache directory.
//!
//! Provides `stash list` to enumerate stored entries, `stash show` to print
//! an entry's fingerprint, `stash unstash` and `stash clear` to remove
//! entries, and `stash config` to print the effective settings.

#![warn(missing_docs)]

mod config;
mod list;
mod remove;
mod show;

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand, ValueEnum};
use stash_cache::Stash;
use stash_config::StashConfig;
use tracing_subscriber::EnvFilter;

/// Stash: a content-addressed memoization cache.
#[derive(Parser, Debug)]
#[command(name = "stash", version, about = "Inspect and maintain a stash directory")]
pub struct Cli {
    /// Suppress all output except errors.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable verbose (debug-level) output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Use this stash directory instead of the configured one.
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// The subcommand to run.
    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// List stored entries.
    List,
    /// Print the stored fingerprint of an entry.
    Show {
        /// Entry key: an identifier or a derived `0x…` key.
        key: String,

        /// Output format.
        #[arg(short, long, value_enum, default_value_t = ReportFormat::Text)]
        format: ReportFormat,
    },
    /// Remove one or more entries.
    Unstash {
        /// Entry keys to remove.
        #[arg(required = true, num_args = 1..)]
        keys: Vec<String>,
    },
    /// Remove every entry in the stash directory.
    Clear,
    /// Print the effective settings and stash directory.
    Config,
}

/// Output format for `stash show`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    /// Human-readable terminal output.
    Text,
    /// Machine-readable JSON output.
    Json,
}

/// Global settings derived from CLI flags.
pub struct GlobalArgs {
    /// Whether to suppress non-error output.
    pub quiet: bool,
    /// Explicit stash directory, overriding the configured one.
    pub root: Option<PathBuf>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.quiet, cli.verbose);

    match run(cli) {
        Ok(code) => process::exit(code),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

/// Dispatches the parsed command. Returns the process exit code.
fn run(cli: Cli) -> Result<i32, Box<dyn std::error::Error>> {
    let global = GlobalArgs {
        quiet: cli.quiet,
        root: cli.root,
    };
    let mut stdout = std::io::stdout().lock();

    match cli.command {
        Command::List => list::run(&open_stash(&global)?, &mut stdout),
        Command::Show { key, format } => {
            show::run(&open_stash(&global)?, &key, format, &mut stdout)
        }
        Command::Unstash { keys } => remove::unstash(&open_stash(&global)?, &keys, &global),
        Command::Clear => remove::clear(&open_stash(&global)?, &global),
        Command::Config => {
            let (config, cwd) = load_settings()?;
            config::run(&config, &cwd, global.root.as_deref(), &mut stdout)
        }
    }
}

/// Installs the stderr log subscriber. `RUST_LOG` takes precedence.
fn init_logging(quiet: bool, verbose: bool) {
    let default = if quiet {
        "error"
    } else if verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Loads settings for the working directory.
fn load_settings() -> Result<(StashConfig, PathBuf), Box<dyn std::error::Error>> {
    let cwd = std::env::current_dir()?;
    let config = stash_config::load_settings(&cwd)?;
    Ok((config, cwd))
}

/// Opens the stash selected by `--root` or by the settings.
fn open_stash(global: &GlobalArgs) -> Result<Stash, Box<dyn std::error::Error>> {
    let (config, cwd) = load_settings()?;
    let stash = match &global.root {
        Some(root) => Stash::at(root.clone(), config)?,
        None => Stash::open(config, &cwd)?,
    };
    Ok(stash)
}
