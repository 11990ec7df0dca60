mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use commands::{
    apply, init, ops, show, validate, ApplyArgs, InitArgs, OpsArgs, ShowArgs, ValidateArgs,
};
use tracing_subscriber::EnvFilter;

/// fleurmod - replayable, schema-checked edits of Fleur input files
#[derive(Parser, Debug)]
#[command(name = "fleurmod")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log task replay and schema checks
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write a default fleurmod.config.json and an example task list
    Init(InitArgs),

    /// List the available operations and their parameters
    Ops(OpsArgs),

    /// Print the modified inp.xml without storing anything
    Show(ShowArgs),

    /// Check the modified inp.xml against the schema
    Validate(ValidateArgs),

    /// Freeze a task list into a new input directory
    Apply(ApplyArgs),
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let cwd = match std::env::current_dir() {
        Ok(dir) => dir.display().to_string(),
        Err(err) => {
            eprintln!("{} Cannot get current directory: {}", "Error:".red().bold(), err);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Command::Init(args) => init(args, &cwd),
        Command::Ops(args) => ops(args, &cwd),
        Command::Show(args) => show(args, &cwd),
        Command::Validate(args) => validate(args, &cwd),
        Command::Apply(args) => apply(args, &cwd),
    };

    if let Err(err) = result {
        eprintln!();
        eprintln!("{} {}", "Error:".red().bold(), err);
        eprintln!();
        std::process::exit(1);
    }
}
