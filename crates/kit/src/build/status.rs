//! Record of the last batch build, read back by `kit status`

use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use kit_core::Paths;

const STATUS_FILE: &str = "last_build.json";

/// Outcome of the most recent build of a project
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildStatus {
    pub project_path: String,
    pub timestamp: DateTime<Utc>,
    pub passed: bool,
    pub built: Vec<String>,
    pub failed: Vec<String>,
    pub duration_ms: u64,
}

impl BuildStatus {
    pub fn new(root: &Path, built: Vec<String>, failed: Vec<String>, duration_ms: u64) -> Self {
        Self {
            project_path: canonical(root),
            timestamp: Utc::now(),
            passed: failed.is_empty(),
            built,
            failed,
            duration_ms,
        }
    }

    pub fn save(&self, paths: &Paths) -> Result<()> {
        self.save_to(&paths.state_file(STATUS_FILE))
    }

    pub fn save_to(&self, file: &Path) -> Result<()> {
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(file, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Last status for the project at `paths.root`, if one was recorded
    pub fn load(paths: &Paths) -> Option<Self> {
        Self::load_from(&paths.state_file(STATUS_FILE), &paths.root)
    }

    pub fn load_from(file: &Path, root: &Path) -> Option<Self> {
        let content = std::fs::read_to_string(file).ok()?;
        let status: Self = serde_json::from_str(&content).ok()?;

        // The state dir is shared, only report this project's builds
        (status.project_path == canonical(root)).then_some(status)
    }
}

fn canonical(root: &Path) -> String {
    root.canonicalize()
        .unwrap_or_else(|_| PathBuf::from(root))
        .to_string_lossy()
        .to_string()
}
