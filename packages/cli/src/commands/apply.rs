use super::{open_session, SessionArgs};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use fleurmod_modifier::LocalProvenanceStore;
use std::fs;
use std::path::PathBuf;

pub const PROVENANCE_FILE: &str = "provenance.json";

#[derive(Debug, Args)]
pub struct ApplyArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Output directory (overrides config)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Freeze the task list into a new input directory
pub fn apply(args: ApplyArgs, cwd: &str) -> Result<()> {
    if args.session.tasks.is_none() {
        return Err(anyhow!("apply needs a task list (--tasks)"));
    }

    let config = Config::load(cwd)?;
    let mut modifier = open_session(&args.session, &config, cwd)?;

    let mut store = LocalProvenanceStore::default();
    let result = modifier.freeze(&mut store)?;

    let out_dir = match args.output {
        Some(dir) => PathBuf::from(cwd).join(dir),
        None => PathBuf::from(cwd)
            .join(&args.session.input)
            .join(&config.output_name),
    };
    fs::create_dir_all(&out_dir)?;

    for name in result.file_names() {
        if let Some(contents) = result.file(name) {
            fs::write(out_dir.join(name), contents)?;
            println!("  {} {}", "✓".green(), out_dir.join(name).display());
        }
    }
    fs::write(out_dir.join(PROVENANCE_FILE), store.export_json()?)?;

    println!(
        "{} Applied {} tasks → {}",
        "✅".green(),
        modifier.changes().len(),
        out_dir.display()
    );
    Ok(())
}
