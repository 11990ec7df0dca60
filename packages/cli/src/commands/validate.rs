use super::{open_session, SessionArgs};
use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use colored::Colorize;
use fleurmod_modifier::ModifierError;

#[derive(Debug, Args)]
pub struct ValidateArgs {
    #[command(flatten)]
    pub session: SessionArgs,
}

pub fn validate(args: ValidateArgs, cwd: &str) -> Result<()> {
    let config = Config::load(cwd)?;
    let modifier = open_session(&args.session, &config, cwd)?;

    match modifier.validate() {
        Ok(_) => {
            println!(
                "{} Modified input is valid ({} tasks)",
                "✓".green(),
                modifier.changes().len()
            );
            Ok(())
        }
        Err(ModifierError::SchemaValidation(error)) => {
            for violation in &error.violations {
                eprintln!("  {} {}", "✗".red(), violation);
            }
            Err(anyhow!(
                "Modified input has {} schema violations",
                error.violations.len()
            ))
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;
    use std::path::PathBuf;

    fn args(tasks: &str) -> ValidateArgs {
        ValidateArgs {
            session: SessionArgs {
                input: PathBuf::from("."),
                tasks: Some(PathBuf::from(tasks)),
                schema: None,
                strict: false,
            },
        }
    }

    #[test]
    fn test_validate_reports_violations() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input(dir.path());
        fixtures::write_tasks(
            dir.path(),
            r#"[
                ["xml_set_first_attribv", "/fleurInput/calculationSetup/scfLoop", "itmax", "many"]
            ]"#,
        );

        let cwd = dir.path().display().to_string();
        let error = validate(args("tasks.json"), &cwd).unwrap_err();
        assert_eq!(error.to_string(), "Modified input has 1 schema violations");
    }

    #[test]
    fn test_validate_accepts_valid_changes() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input(dir.path());
        fixtures::write_tasks(dir.path(), r#"[["set_inpchanges", {"itmax": 9}]]"#);

        let cwd = dir.path().display().to_string();
        assert!(validate(args("tasks.json"), &cwd).is_ok());
    }
}
