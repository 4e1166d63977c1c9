//! `kit status`

use anyhow::Result;

use kit_core::Paths;

use crate::build::{discover_components, BuildStatus};
use crate::cli::{Command, CommandContext, OptionSpec};
use crate::output::format_duration;

pub fn command() -> Command {
    Command::new("status", show_status)
        .describe("Show project settings and the last build result")
        .option(OptionSpec::flag("json", "Output as JSON"))
}

async fn show_status(ctx: CommandContext) -> Result<()> {
    let config = &ctx.config;
    let components = discover_components(&config.components_path())?;
    let last = BuildStatus::load(&Paths::at(config.root.clone()));

    if ctx.args.flag("json") {
        println!(
            "{}",
            serde_json::json!({
                "root": config.root,
                "components": components.len(),
                "bundler": config.build.bundler.as_str(),
                "workers": config.max_workers(),
                "last_build": last,
            })
        );
        return Ok(());
    }

    println!("Kit Status");
    println!("----------------------------");
    println!("Project: {}", config.root.display());
    println!("Components: {}", components.len());
    println!("Bundler: {}", config.build.bundler);
    println!("Workers: {}", config.max_workers());

    match last {
        Some(status) => {
            println!("Last build: {}", status.timestamp.to_rfc3339());
            println!(
                "Last result: {} ({} built, {} failed, {})",
                if status.passed { "passed" } else { "failed" },
                status.built.len(),
                status.failed.len(),
                format_duration(status.duration_ms)
            );
            for name in &status.failed {
                println!("  - {}", name);
            }
        }
        None => {
            println!("Last build: never");
            println!("Last result: unknown");
        }
    }

    Ok(())
}
