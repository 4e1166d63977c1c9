//! Per-component builds
//!
//! A component lives in `<components_dir>/<name>` and is built into
//! `<out_dir>/<name>` by running the component pipeline from the project
//! root. The first failing step fails the component.

pub mod components;
pub mod pipeline;
pub mod status;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

use crate::config::Bundler;
use crate::pool::BuildUnit;

pub use components::{discover_components, discover_stylesheets, invalid_component_name};
pub use pipeline::{PipelineStep, StepResult, StepVars};
pub use status::BuildStatus;

/// Lines of tool output carried in a failed step's error
const ERROR_TAIL_LINES: usize = 15;

/// Settings shared read-only by every build unit
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BuildConfig {
    pub root: PathBuf,
    pub components_dir: PathBuf,
    pub out_dir: PathBuf,
    /// Entry file, relative to the component directory
    pub entry: String,
    pub bundler: Bundler,
    pub sourcemaps: bool,
    /// Per-step timeout in seconds
    pub step_timeout: u64,
    pub package_manager: String,
}

impl BuildConfig {
    pub fn source_dir(&self, component: &str) -> PathBuf {
        self.components_dir.join(component)
    }

    pub fn output_dir(&self, component: &str) -> PathBuf {
        self.out_dir.join(component)
    }

    pub fn entry_file(&self, component: &str) -> PathBuf {
        self.source_dir(component).join(&self.entry)
    }
}

/// Builds components with the external toolchain (tsc, sass, bundler)
#[derive(Debug, Clone, Copy, Default)]
pub struct ToolchainBuilder;

impl BuildUnit for ToolchainBuilder {
    async fn build(&self, component: &str, config: &BuildConfig) -> Result<()> {
        build_component(component, config).await.map(|_| ())
    }
}

/// Build one component, returning the result of every step that ran
pub async fn build_component(component: &str, config: &BuildConfig) -> Result<Vec<StepResult>> {
    let src = config.source_dir(component);
    if !src.is_dir() {
        bail!("no component directory at {}", src.display());
    }

    let entry = config.entry_file(component);
    if !entry.is_file() {
        bail!("missing entry {}", entry.display());
    }

    let out = config.output_dir(component);
    std::fs::create_dir_all(&out)
        .with_context(|| format!("Failed to create {}", out.display()))?;

    let vars = StepVars {
        component,
        src: &src,
        out: &out,
        entry: &entry,
        package_manager: &config.package_manager,
    };

    let steps = pipeline::component_pipeline(config.bundler, config.sourcemaps, config.step_timeout);
    let mut results = Vec::with_capacity(steps.len());

    for step in &steps {
        let result = pipeline::run_step(step, &config.root, &vars, false).await;
        debug!(component, step = %result.name, success = result.success, duration_ms = result.duration_ms, "step finished");

        if !result.success {
            bail!("{} step failed:\n{}", result.name, result.tail(ERROR_TAIL_LINES));
        }
        results.push(result);
    }

    Ok(results)
}
