//! CLI command definitions and handlers

mod clean;
mod collect;
mod report;

use crate::collector::CollectOptions;
use crate::config::UserConfig;
use crate::reporters::OutputFormat;
use anyhow::Result;
use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::str::FromStr;

/// Parse and validate workers count (1-64)
fn parse_workers(s: &str) -> Result<usize, String> {
    let n: usize = s
        .parse()
        .map_err(|_| format!("'{}' is not a valid number", s))?;
    if n == 0 {
        Err("workers must be at least 1".to_string())
    } else if n > 64 {
        Err("workers cannot exceed 64".to_string())
    } else {
        Ok(n)
    }
}

fn parse_format(s: &str) -> Result<OutputFormat, String> {
    OutputFormat::from_str(s).map_err(|e| e.to_string())
}

/// repocensus - contributor and file statistics for git repositories
#[derive(Parser, Debug)]
#[command(name = "repocensus")]
#[command(
    version,
    about = "Contributor and file-level statistics for git repositories",
    long_about = "repocensus walks a repository's history, blames every tracked file at HEAD \
in parallel and aggregates per-contributor and per-file statistics. Results are cached \
per HEAD commit, so repeated reports on the same snapshot are instant.",
    after_help = "\
Examples:
  repocensus collect .                        Collect and cache statistics for HEAD
  repocensus report . html                    Write repocensus-report.html
  repocensus report . json -o stats.json      Write JSON to a custom path
  repocensus clean . --all                    Remove every cached snapshot of this repo"
)]
pub struct Cli {
    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn", value_parser = ["error", "warn", "info", "debug", "trace"])]
    pub log_level: String,

    /// Number of parallel blame workers (1-64, default: number of CPUs)
    #[arg(long, global = true, value_parser = parse_workers)]
    pub workers: Option<usize>,

    /// Cache directory (default: ~/.cache/repocensus)
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Ignore cached datasets and do not write new ones
    #[arg(long, global = true)]
    pub no_cache: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Collect statistics for the repository's HEAD and cache them
    Collect {
        /// Path to the repository
        repo_path: PathBuf,
    },

    /// Render a report (collecting first unless HEAD is cached)
    #[command(after_help = "\
Examples:
  repocensus report . html
  repocensus report ../other-repo json --output-file-path out/other.json")]
    Report {
        /// Path to the repository
        repo_path: PathBuf,

        /// Output format: html or json (default: [report] format from config, else html)
        #[arg(value_parser = parse_format)]
        format: Option<OutputFormat>,

        /// Output file path (default: repocensus-report.<ext>)
        #[arg(long, short = 'o')]
        output_file_path: Option<PathBuf>,
    },

    /// Remove cached datasets for a repository
    Clean {
        /// Path to the repository
        repo_path: PathBuf,

        /// Remove every cached snapshot, not just HEAD's
        #[arg(long)]
        all: bool,

        /// Show what would be removed without removing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Manage user configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Show version information
    Version,
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Initialize config file with example settings
    Init,
    /// Show current config and paths
    Show,
}

impl Cli {
    /// Apply command-line overrides on top of the loaded configuration.
    fn collect_options(&self, config: &UserConfig) -> CollectOptions {
        let mut options = config.collect_options();
        if self.workers.is_some() {
            options.workers = self.workers;
        }
        if self.cache_dir.is_some() {
            options.cache_dir = self.cache_dir.clone();
        }
        if self.no_cache {
            options.use_cache = false;
        }
        options
    }
}

/// Run the CLI with parsed arguments
pub fn run(cli: Cli) -> Result<()> {
    let config = UserConfig::load()?;
    let options = cli.collect_options(&config);

    match cli.command {
        Commands::Collect { repo_path } => collect::run(&repo_path, options),

        Commands::Report {
            repo_path,
            format,
            output_file_path,
        } => {
            let format = format.unwrap_or_else(|| config.report_format());
            report::run(&repo_path, format, output_file_path, options)
        }

        Commands::Clean {
            repo_path,
            all,
            dry_run,
        } => clean::run(&repo_path, all, dry_run, &options),

        Commands::Config { action } => run_config_action(action, &options),

        Commands::Version => {
            let (major, minor, patch) = git2::Version::get().libgit2_version();
            println!("repocensus {}", env!("CARGO_PKG_VERSION"));
            println!("libgit2 {}.{}.{}", major, minor, patch);
            Ok(())
        }
    }
}

fn run_config_action(action: ConfigAction, options: &CollectOptions) -> Result<()> {
    match action {
        ConfigAction::Init => {
            let path = UserConfig::init_user_config()?;
            println!("{} Config initialized at: {}", style("✓").green(), path.display());
            Ok(())
        }
        ConfigAction::Show => show_config(options),
    }
}

fn show_config(options: &CollectOptions) -> Result<()> {
    let config = UserConfig::load()?;

    println!("Config path:");
    if let Some(user_path) = UserConfig::user_config_path() {
        let status = if user_path.exists() {
            style("✓").green().to_string()
        } else {
            style("(not found)").dim().to_string()
        };
        println!("  {} {}", user_path.display(), status);
    }
    println!();

    let workers = options
        .workers
        .map(|n| n.to_string())
        .unwrap_or_else(|| "auto".to_string());
    println!("Resolved settings:");
    println!("  workers:      {}", style(workers).cyan());
    println!(
        "  cache dir:    {}",
        style(crate::cache::cache_root(options.cache_dir.as_deref()).display()).cyan()
    );
    println!("  cache:        {}", style(if options.use_cache { "enabled" } else { "disabled" }).cyan());
    println!(
        "  report format: {}",
        style(config.report_format()).cyan()
    );
    Ok(())
}
