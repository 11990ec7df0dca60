use crate::config::{Config, DEFAULT_CONFIG_NAME};
use anyhow::Result;
use clap::Args;
use colored::Colorize;
use std::fs;
use std::path::PathBuf;

pub const EXAMPLE_TASKS_NAME: &str = "tasks.json";

const EXAMPLE_TASKS: &str = r#"[
  ["set_inpchanges", {"itmax": 30, "alpha": 0.02}],
  ["set_species", "all", {"mtSphere": {"radius": 2.2}}],
  ["set_nkpts", 100, false]
]
"#;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Schema file to record in the config
    #[arg(long)]
    pub schema_path: Option<String>,

    /// Fail on invalid modified inputs
    #[arg(long)]
    pub strict: bool,

    /// Force overwrite existing config
    #[arg(short, long)]
    pub force: bool,
}

pub fn init(args: InitArgs, cwd: &str) -> Result<()> {
    let config_path = PathBuf::from(cwd).join(DEFAULT_CONFIG_NAME);

    if config_path.exists() && !args.force {
        println!(
            "{} {} already exists",
            "⚠️".yellow(),
            DEFAULT_CONFIG_NAME.bright_white()
        );
        println!("Use --force to overwrite");
        return Ok(());
    }

    println!("{}", "📝 Initializing fleurmod...".bright_blue().bold());

    let config = Config {
        schema_path: args.schema_path,
        strict: args.strict,
        ..Config::default()
    };
    fs::write(&config_path, serde_json::to_string_pretty(&config)?)?;
    println!("  {} Created {}", "✓".green(), DEFAULT_CONFIG_NAME);

    let tasks_path = PathBuf::from(cwd).join(EXAMPLE_TASKS_NAME);
    if !tasks_path.exists() {
        fs::write(&tasks_path, EXAMPLE_TASKS)?;
        println!("  {} Created {}", "✓".green(), EXAMPLE_TASKS_NAME);
    }

    println!();
    println!("Next steps:");
    println!("  1. Edit {}", EXAMPLE_TASKS_NAME);
    println!("  2. Run: fleurmod validate --tasks {}", EXAMPLE_TASKS_NAME);
    println!("  3. Run: fleurmod apply --tasks {}", EXAMPLE_TASKS_NAME);

    Ok(())
}
