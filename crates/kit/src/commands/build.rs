//! `kit build [components...]` and `kit build component <name>`

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

use kit_core::{detect_package_manager, package_runner, require_tool, Paths};

use crate::build::pipeline::{run_step, stylesheet_step};
use crate::build::{
    build_component, discover_components, discover_stylesheets, invalid_component_name, BuildStatus, StepVars,
    ToolchainBuilder,
};
use crate::cli::{ArgSpec, Command, CommandContext, OptionSpec};
use crate::output::{
    print_excerpt, print_outcome, print_pending_result, print_step_result, print_step_start, print_summary,
};
use crate::pool::{PoolError, Task, TaskError, TaskReport, WorkerPool};

pub fn command() -> Command {
    Command::new("build", build_all)
        .alias("b")
        .describe("Build every component, or only the ones named, in parallel")
        .arg(ArgSpec::optional("components", "components to build").variadic())
        .option(OptionSpec::value("jobs", "Number of parallel build workers").short('j'))
        .validator(validate_components)
        .sub_command(
            Command::new("component", build_one)
                .alias("c")
                .describe("Build a single component")
                .arg(ArgSpec::required("name", "component to build"))
                .validator(validate_component),
        )
        .sub_command(
            Command::new("stylesheet", build_stylesheets)
                .aliases(["sass", "css", "styles"])
                .describe("Build the global stylesheets"),
        )
}

fn validate_components(ctx: &CommandContext) -> Option<String> {
    ctx.command_args()
        .iter()
        .find_map(|name| invalid_component_name(name))
}

fn validate_component(ctx: &CommandContext) -> Option<String> {
    match ctx.command_arg(0) {
        None => Some("You must provide a component name.".to_string()),
        Some(name) => invalid_component_name(name),
    }
}

async fn build_all(ctx: CommandContext) -> Result<()> {
    let config = Arc::new(ctx.config.build_config());
    let available = discover_components(&config.components_dir)?;

    let requested = ctx.command_args();
    let selected: Vec<String> = if requested.is_empty() {
        available
    } else {
        if let Some(unknown) = requested.iter().find(|name| !available.contains(name)) {
            bail!(
                "Unknown component '{}'. Run 'kit list' to see available components.",
                unknown
            );
        }
        requested.to_vec()
    };

    if selected.is_empty() {
        println!("No components found in {}", config.components_dir.display());
        return Ok(());
    }

    let runner = package_runner(&config.package_manager);
    require_tool(runner.split_whitespace().next().unwrap_or(runner))?;

    let workers = ctx.config.max_workers().min(selected.len());
    println!(
        "Building {} component{} with {} worker{}",
        selected.len(),
        if selected.len() == 1 { "" } else { "s" },
        workers,
        if workers == 1 { "" } else { "s" }
    );
    println!();

    let started = Instant::now();
    let tasks: Vec<Task> = selected
        .iter()
        .map(|name| Task::new(name.clone(), Arc::clone(&config)))
        .collect();

    let outcome = WorkerPool::new(|| ToolchainBuilder, workers)
        .run_all(tasks)
        .await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let (completed, failures): (Vec<TaskReport>, Vec<TaskError>) = match &outcome {
        Ok(report) => (report.completed.clone(), Vec::new()),
        Err(PoolError::Batch {
            completed,
            failures,
            ..
        }) => (completed.clone(), failures.clone()),
        Err(PoolError::Closed) => (Vec::new(), Vec::new()),
    };

    for report in &completed {
        print_outcome(&report.component, true, report.duration_ms);
    }
    for failure in &failures {
        print_outcome(failure.component(), false, 0);
        print_excerpt(&failure_detail(failure));
    }
    print_summary(completed.len(), failures.len(), duration_ms);

    let status = BuildStatus::new(
        &ctx.config.root,
        completed.iter().map(|r| r.component.clone()).collect(),
        failures.iter().map(|f| f.component().to_string()).collect(),
        duration_ms,
    );
    if let Err(e) = status.save(&Paths::at(ctx.config.root.clone())) {
        warn!(error = %e, "could not record build status");
    }

    outcome?;
    info!(count = completed.len(), duration_ms, "build finished");
    Ok(())
}

fn failure_detail(failure: &TaskError) -> String {
    match failure {
        TaskError::Application { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

async fn build_one(ctx: CommandContext) -> Result<()> {
    let Some(name) = ctx.command_arg(0) else {
        bail!("You must provide a component name.");
    };
    let config = ctx.config.build_config();

    print_step_start(name);
    let started = Instant::now();
    let result = build_component(name, &config).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    match result {
        Ok(steps) => {
            print_pending_result(name, true, duration_ms);
            if ctx.config.verbose {
                for step in &steps {
                    print_outcome(&format!("  {}", step.name), true, step.duration_ms);
                }
            }
            Ok(())
        }
        Err(e) => {
            print_pending_result(name, false, duration_ms);
            print_excerpt(&format!("{:#}", e));
            Err(e)
        }
    }
}

async fn build_stylesheets(ctx: CommandContext) -> Result<()> {
    let config = &ctx.config;
    let sheets = discover_stylesheets(&config.components_path())?;
    if sheets.is_empty() {
        println!("No global stylesheets found in {}", config.components_path().display());
        return Ok(());
    }

    let step = stylesheet_step(
        &sheets,
        &config.out_path(),
        config.build.sourcemaps,
        config.build.step_timeout,
    );
    print_step_start(&step.name);
    let vars = StepVars {
        package_manager: detect_package_manager(&config.root),
        ..Default::default()
    };
    let result = run_step(&step, &config.root, &vars, false).await;
    print_step_result(&result);

    if !result.success {
        print_excerpt(&result.output);
        bail!("Stylesheet build failed");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{CommandRegistry, Dispatcher, ParsedArgs};
    use crate::config::KitConfig;
    use crate::error::KitError;
    use std::fs;
    use tempfile::tempdir;

    fn dispatcher() -> Dispatcher {
        Dispatcher::new(Arc::new(CommandRegistry::new(vec![command()]).unwrap()))
    }

    fn parse(tokens: &[&str]) -> ParsedArgs {
        ParsedArgs::parse(tokens.iter().copied(), &[]).unwrap()
    }

    fn config_at(root: &std::path::Path) -> Arc<KitConfig> {
        Arc::new(KitConfig {
            root: root.to_path_buf(),
            ..Default::default()
        })
    }

    #[tokio::test]
    async fn test_component_requires_name() {
        let dir = tempdir().unwrap();
        let err = dispatcher()
            .run(parse(&["build", "component"]), config_at(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Validation(_)));
        assert_eq!(err.to_string(), "You must provide a component name.");
    }

    #[tokio::test]
    async fn test_component_name_must_be_custom_element() {
        let dir = tempdir().unwrap();
        let err = dispatcher()
            .run(parse(&["b", "c", "Button"]), config_at(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Validation(ref m) if m.contains("'Button'")));
    }

    #[tokio::test]
    async fn test_batch_rejects_invalid_names() {
        let dir = tempdir().unwrap();
        let err = dispatcher()
            .run(parse(&["build", "x-card", "card"]), config_at(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Validation(ref m) if m.contains("'card'")));
    }

    #[tokio::test]
    async fn test_batch_rejects_unknown_components() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/x-card")).unwrap();
        let err = dispatcher()
            .run(parse(&["build", "x-tabs"]), config_at(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Execution(_)));
        assert!(err.to_string().contains("Unknown component 'x-tabs'"));
    }

    #[tokio::test]
    async fn test_empty_project_builds_nothing() {
        let dir = tempdir().unwrap();
        assert!(dispatcher()
            .run(parse(&["build"]), config_at(dir.path()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_no_stylesheets_is_a_no_op() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/x-card")).unwrap();
        assert!(dispatcher()
            .run(parse(&["build", "css"]), config_at(dir.path()))
            .await
            .is_ok());
    }

    #[tokio::test]
    async fn test_single_build_reports_missing_entry() {
        let dir = tempdir().unwrap();
        fs::create_dir_all(dir.path().join("components/x-card")).unwrap();
        let err = dispatcher()
            .run(parse(&["build", "component", "x-card"]), config_at(dir.path()))
            .await
            .unwrap_err();
        assert!(matches!(err, KitError::Execution(_)));
        assert!(err.to_string().starts_with("missing entry"));
    }
}
