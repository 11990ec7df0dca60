use anyhow::Result;
use clap::Args;
use colored::Colorize;
use fleurmod_modifier::OperationRegistry;

#[derive(Debug, Args)]
pub struct OpsArgs {
    /// Print as JSON instead of text
    #[arg(long)]
    pub json: bool,
}

pub fn ops(args: OpsArgs, _cwd: &str) -> Result<()> {
    let registry = OperationRegistry::builtin();

    if args.json {
        let listing: serde_json::Map<String, serde_json::Value> = registry
            .operations()
            .iter()
            .map(|op| (op.name.to_string(), serde_json::json!(op.params)))
            .collect();
        println!("{}", serde_json::to_string_pretty(&listing)?);
        return Ok(());
    }

    for op in registry.operations() {
        println!("{}({})", op.name.bright_white().bold(), signature(op.params, op.required));
    }
    Ok(())
}

/// `a, b, [c, d]` with optional parameters bracketed
fn signature(params: &[&str], required: usize) -> String {
    let (required, optional) = params.split_at(required.min(params.len()));
    let mut out = required.join(", ");
    if !optional.is_empty() {
        if !out.is_empty() {
            out.push_str(", ");
        }
        out.push_str(&format!("[{}]", optional.join(", ")));
    }
    out
}
