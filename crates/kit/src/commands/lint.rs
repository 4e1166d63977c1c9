//! `kit lint`, `kit lint eslint`, `kit lint styles`

use anyhow::{bail, Result};
use std::time::Instant;

use kit_core::detect_package_manager;

use crate::build::pipeline::{lint_pipeline, run_step};
use crate::build::{PipelineStep, StepVars};
use crate::cli::{Command, CommandContext, OptionSpec};
use crate::output::{print_excerpt, print_step_result, print_step_start, print_summary};

pub fn command() -> Command {
    Command::new("lint", lint_all)
        .alias("l")
        .describe("Lint component scripts and styles")
        .option(fix_option())
        .sub_command(
            Command::new("eslint", lint_scripts)
                .aliases(["es", "ts", "js"])
                .describe("Lint component scripts only")
                .option(fix_option()),
        )
        .sub_command(
            Command::new("styles", lint_styles)
                .aliases(["sass", "css"])
                .describe("Lint component stylesheets only")
                .option(fix_option()),
        )
}

fn fix_option() -> OptionSpec {
    OptionSpec::flag("fix", "Apply automatic fixes")
}

async fn lint_all(ctx: CommandContext) -> Result<()> {
    run_lint(&ctx, None).await
}

async fn lint_scripts(ctx: CommandContext) -> Result<()> {
    run_lint(&ctx, Some("eslint")).await
}

async fn lint_styles(ctx: CommandContext) -> Result<()> {
    run_lint(&ctx, Some("stylelint")).await
}

/// The lint steps to run: all of them, or only the one named `only`
fn select_steps<'a>(steps: &'a [PipelineStep], only: Option<&str>) -> Vec<&'a PipelineStep> {
    steps
        .iter()
        .filter(|step| only.map_or(true, |name| name == step.name))
        .collect()
}

async fn run_lint(ctx: &CommandContext, only: Option<&str>) -> Result<()> {
    let config = &ctx.config;
    let fix = ctx.args.flag("fix");
    let pipeline = lint_pipeline(config);
    let vars = StepVars {
        package_manager: detect_package_manager(&config.root),
        ..Default::default()
    };

    let steps = select_steps(&pipeline, only);
    let total = steps.len();

    let started = Instant::now();
    let mut failed = 0;
    for step in steps {
        print_step_start(&step.name);
        let result = run_step(step, &config.root, &vars, fix).await;
        print_step_result(&result);
        if !result.success {
            failed += 1;
            print_excerpt(&result.output);
        }
    }

    print_summary(total - failed, failed, started.elapsed().as_millis() as u64);

    if failed > 0 {
        bail!("{} of {} lint steps failed", failed, total);
    }
    Ok(())
}
