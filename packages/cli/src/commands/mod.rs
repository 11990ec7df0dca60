pub mod apply;
pub mod init;
pub mod ops;
pub mod show;
pub mod validate;

pub use apply::{apply, ApplyArgs};
pub use init::{init, InitArgs};
pub use ops::{ops, OpsArgs};
pub use show::{show, ShowArgs};
pub use validate::{validate, ValidateArgs};

use crate::config::Config;
use anyhow::{anyhow, Result};
use clap::Args;
use fleurmod_modifier::{FleurinpData, FleurinpModifier, ModifierContext, TaskList};
use std::fs;
use std::path::{Path, PathBuf};

/// Arguments shared by every command that opens an input
#[derive(Debug, Args)]
pub struct SessionArgs {
    /// Directory containing inp.xml and its included files
    #[arg(default_value = ".")]
    pub input: PathBuf,

    /// JSON task list to record
    #[arg(short, long)]
    pub tasks: Option<PathBuf>,

    /// Schema file (overrides config)
    #[arg(long)]
    pub schema: Option<PathBuf>,

    /// Treat an invalid modified input as an error
    #[arg(long)]
    pub strict: bool,
}

/// Open a modification session for `args.input` and record its task list
pub fn open_session(args: &SessionArgs, config: &Config, cwd: &str) -> Result<FleurinpModifier> {
    let dir = PathBuf::from(cwd).join(&args.input);
    if !dir.join(fleurmod_modifier::INPUT_FILE).exists() {
        return Err(anyhow!("No inp.xml found in {}", dir.display()));
    }

    let context = ModifierContext::local().with_strict(args.strict || config.strict);
    let mut data = FleurinpData::from_dir(context.fs.as_ref(), &dir)?;

    let schema = args
        .schema
        .as_ref()
        .map(|p| PathBuf::from(cwd).join(p))
        .or_else(|| config.schema_path(cwd));
    let context = match schema {
        Some(path) => {
            tracing::debug!(schema = %path.display(), "Using schema file");
            data = data.with_schema_path(path);
            context
        }
        None => context.with_bundled_schema()?,
    };

    let mut modifier = FleurinpModifier::new(context, data);
    if let Some(path) = &args.tasks {
        let tasks = read_tasks(&PathBuf::from(cwd).join(path))?;
        for (index, task) in tasks.list_tasks().iter().enumerate() {
            modifier
                .record(task.clone())
                .map_err(|e| anyhow!("Task {} ({}): {}", index, task.name, e))?;
        }
    }
    Ok(modifier)
}

/// Parse a task list file
pub fn read_tasks(path: &Path) -> Result<TaskList> {
    let content = fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read task list {}: {}", path.display(), e))?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow!("Invalid task list {}: {}", path.display(), e))
}

#[cfg(test)]
pub(crate) mod fixtures {
    use std::fs;
    use std::path::Path;

    pub const INPUT: &str = r#"<?xml version="1.0"?>
<fleurInput fleurInputVersion="0.31">
  <calculationSetup>
    <cutoffParameters Kmax="4.0" Gmax="12.0" GmaxXC="10.0"/>
    <scfLoop itmax="15" alpha="0.05"/>
  </calculationSetup>
  <cell>
    <bulkLattice scale="1.0" latnam="any">
      <bravaisMatrix>
        <row-1>5.3 0.0 0.0</row-1>
        <row-2>0.0 5.3 0.0</row-2>
        <row-3>0.0 0.0 7.5</row-3>
      </bravaisMatrix>
    </bulkLattice>
  </cell>
  <xcFunctional name="pbe"/>
  <atomSpecies>
    <species name="Fe-1" element="Fe" atomicNumber="26">
      <mtSphere radius="2.2" gridPoints="787" logIncrement="0.016"/>
      <atomicCutoffs lmax="10" lnonsphr="6"/>
      <energyParameters s="4" p="4" d="3" f="4"/>
    </species>
  </atomSpecies>
  <atomGroups>
    <atomGroup species="Fe-1">
      <relPos label="1">0 0 0</relPos>
    </atomGroup>
  </atomGroups>
</fleurInput>
"#;

    pub fn write_input(dir: &Path) {
        fs::write(dir.join("inp.xml"), INPUT).unwrap();
    }

    pub fn write_tasks(dir: &Path, tasks: &str) {
        fs::write(dir.join("tasks.json"), tasks).unwrap();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session_args(tasks: Option<&str>) -> SessionArgs {
        SessionArgs {
            input: PathBuf::from("."),
            tasks: tasks.map(PathBuf::from),
            schema: None,
            strict: false,
        }
    }

    #[test]
    fn test_open_session_records_tasks() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input(dir.path());
        fixtures::write_tasks(dir.path(), r#"[["set_inpchanges", {"itmax": 3}]]"#);

        let cwd = dir.path().display().to_string();
        let modifier =
            open_session(&session_args(Some("tasks.json")), &Config::default(), &cwd).unwrap();
        assert_eq!(modifier.changes().len(), 1);
    }

    #[test]
    fn test_open_session_rejects_bad_task() {
        let dir = tempfile::tempdir().unwrap();
        fixtures::write_input(dir.path());
        fixtures::write_tasks(dir.path(), r#"[["set_nkpts", 0]]"#);

        let cwd = dir.path().display().to_string();
        let error = open_session(&session_args(Some("tasks.json")), &Config::default(), &cwd)
            .err()
            .unwrap();
        assert!(error.to_string().starts_with("Task 0 (set_nkpts)"));
    }

    #[test]
    fn test_open_session_without_input() {
        let dir = tempfile::tempdir().unwrap();
        let cwd = dir.path().display().to_string();
        assert!(open_session(&session_args(None), &Config::default(), &cwd).is_err());
    }
}
