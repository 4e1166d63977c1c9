//! `kit version`

use anyhow::Result;

use crate::cli::{Command, CommandContext, ParsedArgs};

pub fn command() -> Command {
    Command::new("version", show_version)
        .alias("v")
        .describe("Print the kit version")
        .matcher(wants_version)
        .hidden()
}

fn wants_version(args: &ParsedArgs) -> bool {
    args.flag("version")
}

async fn show_version(_ctx: CommandContext) -> Result<()> {
    println!("kit {}", env!("CARGO_PKG_VERSION"));
    Ok(())
}
