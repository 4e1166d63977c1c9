//! `kit list`

use anyhow::Result;
use serde::Serialize;
use std::path::PathBuf;

use crate::build::discover_components;
use crate::cli::{Command, CommandContext, OptionSpec};
use crate::config::KitConfig;

pub fn command() -> Command {
    Command::new("list", list_components)
        .aliases(["ls", "ll", "lp"])
        .describe("List the components in the library")
        .option(OptionSpec::flag("json", "Output as JSON"))
}

#[derive(Debug, Serialize)]
struct ComponentEntry {
    name: String,
    source: PathBuf,
    /// Whether the output directory has a build of it
    built: bool,
}

fn entries(config: &KitConfig) -> Result<Vec<ComponentEntry>> {
    let src = config.components_path();
    let out = config.out_path();
    Ok(discover_components(&src)?
        .into_iter()
        .map(|name| ComponentEntry {
            source: src.join(&name),
            built: out.join(&name).is_dir(),
            name,
        })
        .collect())
}

async fn list_components(ctx: CommandContext) -> Result<()> {
    let entries = entries(&ctx.config)?;

    if ctx.args.flag("json") {
        println!("{}", serde_json::to_string_pretty(&entries)?);
        return Ok(());
    }

    if entries.is_empty() {
        println!("No components found in {}", ctx.config.components_path().display());
        return Ok(());
    }

    for entry in &entries {
        if entry.built {
            println!("  {} \x1b[2m(built)\x1b[0m", entry.name);
        } else {
            println!("  {}", entry.name);
        }
    }
    println!();
    println!("{} components", entries.len());
    Ok(())
}
