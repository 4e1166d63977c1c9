//! `kit clean`

use anyhow::{bail, Context, Result};
use tracing::info;

use crate::cli::{Command, CommandContext};
use crate::config::KitConfig;

pub fn command() -> Command {
    Command::new("clean", clean).describe("Remove the build output directory")
}

/// Remove the output directory; returns whether there was anything to remove
fn remove_output(config: &KitConfig) -> Result<bool> {
    let out = config.out_path();
    let root = config.root.canonicalize().unwrap_or_else(|_| config.root.clone());
    if root.starts_with(out.canonicalize().unwrap_or_else(|_| out.clone())) {
        bail!(
            "Refusing to remove {}: it contains the project root",
            out.display()
        );
    }
    if !out.exists() {
        return Ok(false);
    }

    std::fs::remove_dir_all(&out).with_context(|| format!("Failed to remove {}", out.display()))?;
    info!(path = %out.display(), "removed build output");
    Ok(true)
}

async fn clean(ctx: CommandContext) -> Result<()> {
    if remove_output(&ctx.config)? {
        println!("Removed {}", ctx.config.out_path().display());
    } else {
        println!("Nothing to clean");
    }
    Ok(())
}
