//! kit - build, lint and test a web-component library
//!
//! `kit build` builds every component in parallel, `kit help` lists the rest.

use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use kit::cli::{Dispatcher, ParsedArgs};
use kit::commands;
use kit::config::KitConfig;
use kit::KitError;

fn main() {
    let raw: Vec<String> = std::env::args().skip(1).collect();
    let verbose = raw.iter().any(|a| a == "--verbose");

    init_logging(verbose);

    if let Err(e) = run(raw) {
        let usage = e.downcast_ref::<KitError>().is_some_and(KitError::is_usage);
        if verbose && !usage {
            eprintln!("Error: {:?}", e);
        } else {
            eprintln!("Error: {}", e);
        }
        std::process::exit(1);
    }
}

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("kit=debug,kit_core=debug")
        } else {
            EnvFilter::new("warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn run(raw: Vec<String>) -> Result<()> {
    let registry = Arc::new(commands::registry()?);

    let args: ParsedArgs = commands::parse_args(&registry, raw)?;

    let cwd = std::env::current_dir()?;
    let config = Arc::new(KitConfig::resolve(&cwd, &args)?);
    tracing::debug!(root = %config.root.display(), workers = config.max_workers(), "configuration resolved");

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async { Dispatcher::new(registry).run(args, config).await })?;
    Ok(())
}
