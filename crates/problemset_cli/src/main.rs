//! Command-line front end over `problemset_core`.
//!
//! # Responsibility
//! - Compute default dates and resource paths from a course config file.
//! - Validate a stored set document the way a save attempt would.

use clap::{Args, Parser, Subcommand};
use log::info;
use problemset_core::{default_log_level, init_logging, load_config, AppConfig, ProblemSet};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Debug, Parser)]
#[command(name = "problemset")]
#[command(about = "Problem set date defaults and validation")]
#[command(version = problemset_core::core_version())]
struct Cli {
    /// Absolute directory for rotated log files; logging is off when omitted.
    #[arg(long, global = true)]
    log_dir: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Print a new set with dates derived from a due date.
    Defaults(DefaultsArgs),
    /// Validate a set document (JSON) and report the first violation.
    Validate(ValidateArgs),
    /// Print the resource path of a set.
    Url(UrlArgs),
}

#[derive(Debug, Args)]
struct DefaultsArgs {
    #[arg(long)]
    config: PathBuf,
    #[arg(long)]
    set_id: String,
    /// Due date in epoch seconds; defaults to now.
    #[arg(long)]
    due: Option<i64>,
}

#[derive(Debug, Args)]
struct ValidateArgs {
    #[arg(long)]
    config: PathBuf,
    #[arg(long)]
    file: PathBuf,
}

#[derive(Debug, Args)]
struct UrlArgs {
    #[arg(long)]
    config: PathBuf,
    #[arg(long)]
    set_id: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(log_dir) = cli.log_dir.as_deref() {
        if let Err(err) = init_logging(default_log_level(), log_dir) {
            eprintln!("warning: {err}");
        }
    }

    match run(cli.command) {
        Ok(code) => code,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

fn run(command: Commands) -> Result<ExitCode, Box<dyn Error>> {
    match command {
        Commands::Defaults(args) => {
            let config = load_config(&args.config)?;
            let mut set = ProblemSet::new(args.set_id, config.date_settings);
            set.set_default_dates(args.due)?;
            info!(
                "event=cli_defaults module=cli status=ok set_id={} due_date={:?}",
                set.set_id, set.due_date
            );
            println!("{}", serde_json::to_string_pretty(&set.to_body()?)?);
            Ok(ExitCode::SUCCESS)
        }
        Commands::Validate(args) => {
            let config = load_config(&args.config)?;
            let mut set = load_set(&config, &args.file)?;
            let url = set.url(&config.course);
            match set.validate() {
                Ok(()) => {
                    println!("ok {url}");
                    Ok(ExitCode::SUCCESS)
                }
                Err(err) => {
                    println!("invalid {url}: {err}");
                    Ok(ExitCode::FAILURE)
                }
            }
        }
        Commands::Url(args) => {
            let config = load_config(&args.config)?;
            let set = ProblemSet::new(args.set_id, config.date_settings);
            println!("{}", set.url(&config.course));
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn load_set(config: &AppConfig, path: &Path) -> Result<ProblemSet, Box<dyn Error>> {
    let text = std::fs::read_to_string(path)?;
    let body = serde_json::from_str(&text)?;
    Ok(ProblemSet::from_response(body, config.date_settings)?)
}
