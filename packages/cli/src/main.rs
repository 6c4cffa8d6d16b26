mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{check, init, render, CheckArgs, InitArgs, RenderArgs};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Petal CLI - render and check reactive HTML templates
#[derive(Parser, Debug)]
#[command(name = "petal")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log runtime activity at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file to use instead of ./petal.config.json
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Initialize a new Petal project
    Init(InitArgs),

    /// Mount a template, replay steps and print the resulting HTML
    Render(RenderArgs),

    /// Parse every directive expression in a template or directory
    Check(CheckArgs),
}

fn main() {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli);

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    let cwd = std::env::current_dir()?.display().to_string();

    match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Render(args) => {
            let config = Config::load(&cwd, cli.config.as_deref())?;
            render(args, &config, &cwd)
        }
        Command::Check(args) => {
            let config = Config::load(&cwd, cli.config.as_deref())?;
            check(args, &config, &cwd)
        }
    }
}
