//! Step pipelines for builds and lint runs
//!
//! Step commands are `sh -c` templates. Placeholders are substituted with
//! shell-quoted values, so project paths may contain spaces and quotes.

use shell_words::quote;
use std::path::{Path, PathBuf};
use tracing::debug;

use kit_core::{package_runner, run_tool};

use crate::config::{Bundler, KitConfig};

/// A single external tool invocation
#[derive(Debug, Clone)]
pub struct PipelineStep {
    pub name: String,
    /// Command template
    pub command: String,
    /// Template run instead of `command` in fix mode
    pub fix_command: Option<String>,
    /// Timeout in seconds
    pub timeout: u64,
}

impl PipelineStep {
    fn new(name: &str, command: String, timeout: u64) -> Self {
        Self {
            name: name.to_string(),
            command,
            fix_command: None,
            timeout,
        }
    }

    fn with_fix(mut self, fix_command: String) -> Self {
        self.fix_command = Some(fix_command);
        self
    }
}

/// Per-component build: type declarations, styles, bundle.
///
/// `<exec>` runs the project's local binaries through its package manager.
pub fn component_pipeline(bundler: Bundler, sourcemaps: bool, timeout: u64) -> Vec<PipelineStep> {
    let map_flag = |on: &'static str, off: &'static str| if sourcemaps { on } else { off };

    let bundle = match bundler {
        Bundler::Esbuild => format!(
            "<exec> esbuild <entry> --bundle --format=esm --outfile=<out>/index.js{}",
            map_flag(" --sourcemap", "")
        ),
        Bundler::Rollup => format!(
            "<exec> rollup <entry> --format es --file <out>/index.js{}",
            map_flag(" --sourcemap", "")
        ),
        Bundler::Webpack => format!(
            "<exec> webpack --entry <entry> --output-path <out> --output-filename index.js --mode production{}",
            map_flag(" --devtool source-map", "")
        ),
    };

    vec![
        PipelineStep::new(
            "types",
            "<exec> tsc --project <src>/tsconfig.json --emitDeclarationOnly --declaration --outDir <out>/types"
                .to_string(),
            timeout,
        ),
        PipelineStep::new(
            "styles",
            format!(
                "test ! -d <src>/styles || <exec> sass <src>/styles:<out>/css{}",
                map_flag("", " --no-source-map")
            ),
            timeout,
        ),
        PipelineStep::new("bundle", bundle, timeout),
    ]
}

/// Compile global stylesheets into `<out>/styles`, one sass run for all
pub fn stylesheet_step(sheets: &[PathBuf], out: &Path, sourcemaps: bool, timeout: u64) -> PipelineStep {
    let styles = out.join("styles");
    let mappings: Vec<String> = sheets
        .iter()
        .map(|sheet| {
            let stem = sheet.file_stem().unwrap_or_default().to_string_lossy();
            let target = styles.join(format!("{}.css", stem));
            quote(&format!("{}:{}", sheet.display(), target.display())).into_owned()
        })
        .collect();

    PipelineStep::new(
        "stylesheet",
        format!(
            "<exec> sass{} {}",
            if sourcemaps { "" } else { " --no-source-map" },
            mappings.join(" ")
        ),
        timeout,
    )
}

/// Project-wide lint: scripts, then styles
pub fn lint_pipeline(config: &KitConfig) -> Vec<PipelineStep> {
    let scripts = quote(&config.lint.scripts);
    let styles = quote(&config.lint.styles);

    vec![
        PipelineStep::new(
            "eslint",
            format!("<exec> eslint {} --max-warnings 0", scripts),
            config.lint.timeout,
        )
        .with_fix(format!("<exec> eslint {} --fix", scripts)),
        PipelineStep::new("stylelint", format!("<exec> stylelint {}", styles), config.lint.timeout)
            .with_fix(format!("<exec> stylelint {} --fix", styles)),
    ]
}

/// Values for the `<...>` placeholders in step templates
#[derive(Debug, Clone)]
pub struct StepVars<'a> {
    pub component: &'a str,
    pub src: &'a Path,
    pub out: &'a Path,
    pub entry: &'a Path,
    pub package_manager: &'a str,
}

impl Default for StepVars<'_> {
    fn default() -> Self {
        Self {
            component: "",
            src: Path::new(""),
            out: Path::new(""),
            entry: Path::new(""),
            package_manager: "npm",
        }
    }
}

/// Substitute placeholders in a step command, quoting each value
pub fn substitute_vars(cmd: &str, vars: &StepVars<'_>) -> String {
    let path = |p: &Path| quote(&p.to_string_lossy()).into_owned();
    cmd.replace("<component>", &quote(vars.component))
        .replace("<src>", &path(vars.src))
        .replace("<out>", &path(vars.out))
        .replace("<entry>", &path(vars.entry))
        .replace("<exec>", package_runner(vars.package_manager))
}

/// Result of running one step
#[derive(Debug, Clone)]
pub struct StepResult {
    pub name: String,
    pub success: bool,
    pub duration_ms: u64,
    /// Combined stdout and stderr, or the launch error
    pub output: String,
}

impl StepResult {
    /// Last `n` lines of output
    pub fn tail(&self, n: usize) -> String {
        let lines: Vec<&str> = self.output.lines().collect();
        lines[lines.len().saturating_sub(n)..].join("\n")
    }
}

/// Run a single step from `cwd`, using its fix command when `fix` is set
pub async fn run_step(step: &PipelineStep, cwd: &Path, vars: &StepVars<'_>, fix: bool) -> StepResult {
    let template = match (&step.fix_command, fix) {
        (Some(fix_command), true) => fix_command,
        _ => &step.command,
    };
    let cmd = substitute_vars(template, vars);
    debug!(step = %step.name, command = %cmd, "running step");

    match run_tool(&cmd, cwd, step.timeout).await {
        Ok(out) => StepResult {
            name: step.name.clone(),
            success: out.success,
            duration_ms: out.duration_ms,
            output: out.output,
        },
        Err(e) => StepResult {
            name: step.name.clone(),
            success: false,
            duration_ms: 0,
            output: e.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn names(steps: &[PipelineStep]) -> Vec<&str> {
        steps.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_component_pipeline_steps() {
        let steps = component_pipeline(Bundler::Esbuild, true, 60);
        assert_eq!(names(&steps), ["types", "styles", "bundle"]);
        assert!(steps[2].command.starts_with("<exec> esbuild"));
        assert!(steps[2].command.contains("--sourcemap"));
        assert!(steps.iter().all(|s| s.timeout == 60));
    }

    #[test]
    fn test_bundler_selection() {
        let rollup = component_pipeline(Bundler::Rollup, false, 60);
        assert!(rollup[2].command.starts_with("<exec> rollup"));
        assert!(!rollup[2].command.contains("--sourcemap"));
        assert!(rollup[1].command.contains("--no-source-map"));

        let webpack = component_pipeline(Bundler::Webpack, true, 60);
        assert!(webpack[2].command.contains("--devtool source-map"));
    }

    #[test]
    fn test_stylesheet_step() {
        let sheets = [PathBuf::from("/lib/components/theme.scss"), PathBuf::from("/lib/components/core.scss")];
        let step = stylesheet_step(&sheets, Path::new("/lib/dist"), false, 60);
        assert_eq!(
            step.command,
            "<exec> sass --no-source-map /lib/components/theme.scss:/lib/dist/styles/theme.css /lib/components/core.scss:/lib/dist/styles/core.css"
        );
    }

    #[test]
    fn test_stylesheet_step_quotes_paths() {
        let sheets = [PathBuf::from("/my lib/components/theme.scss")];
        let step = stylesheet_step(&sheets, Path::new("/my lib/dist"), true, 60);
        assert_eq!(
            step.command,
            "<exec> sass '/my lib/components/theme.scss:/my lib/dist/styles/theme.css'"
        );
    }

    #[test]
    fn test_lint_pipeline_quotes_globs() {
        let steps = lint_pipeline(&KitConfig::default());
        assert_eq!(names(&steps), ["eslint", "stylelint"]);
        assert_eq!(steps[0].command, "<exec> eslint 'components/**/*.ts' --max-warnings 0");
        assert!(steps[1].fix_command.as_deref().unwrap().ends_with("--fix"));
    }

    fn step(command: &str, fix_command: Option<&str>) -> PipelineStep {
        PipelineStep {
            name: "check".to_string(),
            command: command.to_string(),
            fix_command: fix_command.map(str::to_string),
            timeout: 10,
        }
    }

    #[tokio::test]
    async fn test_run_step_substitutes_and_captures() {
        let dir = tempdir().unwrap();
        let vars = StepVars {
            component: "x-card",
            ..Default::default()
        };
        let result = run_step(&step("echo building <component>", None), dir.path(), &vars, false).await;
        assert!(result.success);
        assert_eq!(result.output.trim(), "building x-card");
    }

    #[tokio::test]
    async fn test_run_step_with_spaces_in_project_path() {
        let dir = tempdir().unwrap();
        let root = dir.path().join("my lib");
        let src = root.join("components").join("x-card");
        fs::create_dir_all(&src).unwrap();
        let entry = src.join("index.ts");
        fs::write(&entry, "export {};").unwrap();
        let out = root.join("dist").join("x-card");

        let vars = StepVars {
            component: "x-card",
            src: &src,
            out: &out,
            entry: &entry,
            package_manager: "npm",
        };
        let result = run_step(
            &step("test -f <entry> && mkdir -p <out>/types", None),
            &root,
            &vars,
            false,
        )
        .await;
        assert!(result.success, "{}", result.output);
        assert!(out.join("types").is_dir());
    }

    #[tokio::test]
    async fn test_run_step_fix_mode() {
        let dir = tempdir().unwrap();
        let vars = StepVars::default();
        let s = step("echo check; exit 1", Some("echo fixed"));

        let checked = run_step(&s, dir.path(), &vars, false).await;
        assert!(!checked.success);
        assert_eq!(checked.tail(1), "check");

        let fixed = run_step(&s, dir.path(), &vars, true).await;
        assert!(fixed.success);
        assert_eq!(fixed.output.trim(), "fixed");
    }

    #[test]
    fn test_substitute_vars() {
        let src = PathBuf::from("/lib/components/x-button");
        let out = PathBuf::from("/lib/dist/x-button");
        let entry = src.join("src/index.ts");
        let vars = StepVars {
            component: "x-button",
            src: &src,
            out: &out,
            entry: &entry,
            package_manager: "pnpm",
        };
        assert_eq!(
            substitute_vars("<exec> tsc <entry> --outDir <out>/types # <component>", &vars),
            "pnpm exec tsc /lib/components/x-button/src/index.ts --outDir /lib/dist/x-button/types # x-button"
        );
    }

    #[test]
    fn test_substitute_vars_quotes_paths() {
        let src = PathBuf::from("/it's here/x-button");
        let vars = StepVars {
            src: &src,
            ..Default::default()
        };
        assert_eq!(
            substitute_vars("<exec> tsc --project <src>/tsconfig.json", &vars),
            "npx tsc --project '/it'\\''s here/x-button'/tsconfig.json"
        );
    }
}
