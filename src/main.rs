use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use prism::render::render;
use prism::{report, CommandSpec, Config, RunError, RunSummary, Runner};

const LOG_ENV: &str = "PRISM_LOG";

#[derive(Parser)]
#[command(name = "prism")]
#[command(about = "Runs `go test -json` and prints a grouped, sorted report")]
#[command(version)]
struct Cli {
    /// Show the output of failed tests
    #[arg(short, long)]
    verbose: bool,

    /// Path to config file (default: prism.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the report as JSON instead of text
    #[arg(long)]
    json: bool,

    /// Disable colored output
    #[arg(long)]
    no_color: bool,

    /// Arguments for the test command (default: ./...)
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

fn main() {
    init_tracing();

    match run() {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run() -> Result<i32> {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let cwd = std::env::current_dir().context("Could not determine the current directory")?;
    let config = Config::discover(cli.config.as_deref(), &cwd)?;

    let spec = CommandSpec::from_config(&config.command, &cli.args);
    let mut options = config.report.to_options();
    options.verbose |= cli.verbose;

    tracing::debug!(command = %spec.display(), verbose = options.verbose, "starting run");

    let summary = execute(spec).context("Error running tests")?;
    let model = report(&summary, &options);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&model)?);
    } else {
        print!("{}", render(&model));
    }

    Ok(if summary.succeeded() { 0 } else { 1 })
}

#[tokio::main]
async fn execute(spec: CommandSpec) -> Result<RunSummary, RunError> {
    Runner::new(spec).run().await
}
