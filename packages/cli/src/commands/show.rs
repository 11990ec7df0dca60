use super::{open_session, SessionArgs};
use crate::config::Config;
use anyhow::Result;
use clap::Args;

#[derive(Debug, Args)]
pub struct ShowArgs {
    #[command(flatten)]
    pub session: SessionArgs,

    /// Check the modified input against the schema
    #[arg(long)]
    pub validate: bool,

    /// Print the recorded tasks in canonical form instead of the document
    #[arg(long)]
    pub tasks_only: bool,
}

pub fn show(args: ShowArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let modifier = open_session(&args.session, &config, cwd)?;

    if args.tasks_only {
        println!("{}", serde_json::to_string_pretty(modifier.list_tasks())?);
    } else {
        print!("{}", modifier.show_string(args.validate)?);
    }
    Ok(())
}
