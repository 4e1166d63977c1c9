//! Project configuration
//!
//! Resolved once per invocation: built-in defaults, then `kit.yaml` at the
//! project root, then `KIT_*` environment variables, then command-line
//! options.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use kit_core::{default_parallelism, detect_package_manager, Paths};

use crate::build::BuildConfig;
use crate::cli::ParsedArgs;

/// Errors while resolving configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config in {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("Invalid value '{value}' for {key}")]
    InvalidValue { key: String, value: String },
}

/// Bundler used for the final per-component bundle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Bundler {
    #[default]
    Esbuild,
    Rollup,
    Webpack,
}

impl Bundler {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Esbuild => "esbuild",
            Self::Rollup => "rollup",
            Self::Webpack => "webpack",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "esbuild" => Some(Self::Esbuild),
            "rollup" => Some(Self::Rollup),
            "webpack" => Some(Self::Webpack),
            _ => None,
        }
    }
}

impl std::fmt::Display for Bundler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// `build:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildSettings {
    pub bundler: Bundler,
    /// Worker count; half the physical cores when unset
    pub max_workers: Option<usize>,
    pub sourcemaps: bool,
    /// Entry file, relative to the component directory
    pub entry: String,
    /// Per-step timeout in seconds
    pub step_timeout: u64,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            bundler: Bundler::default(),
            max_workers: None,
            sourcemaps: true,
            entry: "src/index.ts".to_string(),
            step_timeout: 300,
        }
    }
}

/// `lint:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LintSettings {
    pub scripts: String,
    pub styles: String,
    pub timeout: u64,
}

impl Default for LintSettings {
    fn default() -> Self {
        Self {
            scripts: "components/**/*.ts".to_string(),
            styles: "components/**/*.scss".to_string(),
            timeout: 120,
        }
    }
}

/// `test:` section
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TestSettings {
    /// Test runner command; `<exec>` is the package manager's binary runner
    /// and `<files>` the quoted test file globs
    pub command: String,
    /// Test file glob, relative to each component directory
    pub files: String,
    pub timeout: u64,
}

impl Default for TestSettings {
    fn default() -> Self {
        Self {
            command: "<exec> web-test-runner <files> --node-resolve".to_string(),
            files: "**/*.test.ts".to_string(),
            timeout: 600,
        }
    }
}

/// Resolved kit configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct KitConfig {
    /// Project root; never read from the file
    #[serde(skip)]
    pub root: PathBuf,
    pub components_dir: PathBuf,
    pub out_dir: PathBuf,
    pub build: BuildSettings,
    pub lint: LintSettings,
    pub test: TestSettings,
    #[serde(skip)]
    pub verbose: bool,
}

impl Default for KitConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            components_dir: PathBuf::from("components"),
            out_dir: PathBuf::from("dist"),
            build: BuildSettings::default(),
            lint: LintSettings::default(),
            test: TestSettings::default(),
            verbose: false,
        }
    }
}

impl KitConfig {
    /// Full resolution for one invocation
    pub fn resolve(cwd: &Path, args: &ParsedArgs) -> Result<Self, ConfigError> {
        let paths = Paths::discover(cwd);
        let mut config = Self::load(&paths)?;
        config.apply_env(|key| std::env::var(key).ok())?;
        config.apply_args(args)?;
        Ok(config)
    }

    /// Defaults overlaid with the project's `kit.yaml`, if any
    pub fn load(paths: &Paths) -> Result<Self, ConfigError> {
        let file = paths.config_file();
        let mut config = if file.exists() {
            let content = std::fs::read_to_string(&file).map_err(|source| ConfigError::Read {
                path: file.clone(),
                source,
            })?;
            Self::from_yaml(&content).map_err(|source| ConfigError::Parse {
                path: file.clone(),
                source,
            })?
        } else {
            Self::default()
        };

        config.root = paths.root.clone();
        Ok(config)
    }

    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content)
    }

    /// `KIT_JOBS`, `KIT_OUT_DIR`, `KIT_BUNDLER`
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(jobs) = lookup("KIT_JOBS").filter(|v| !v.trim().is_empty()) {
            self.build.max_workers = Some(parse_jobs("KIT_JOBS", &jobs)?);
        }
        if let Some(out) = lookup("KIT_OUT_DIR").filter(|v| !v.trim().is_empty()) {
            self.out_dir = PathBuf::from(out);
        }
        if let Some(bundler) = lookup("KIT_BUNDLER").filter(|v| !v.trim().is_empty()) {
            self.build.bundler = parse_bundler("KIT_BUNDLER", &bundler)?;
        }
        Ok(())
    }

    /// `--jobs/-j`, `--bundler`, `--verbose`
    pub fn apply_args(&mut self, args: &ParsedArgs) -> Result<(), ConfigError> {
        if let Some(jobs) = args.value("jobs") {
            self.build.max_workers = Some(parse_jobs("--jobs", jobs)?);
        }
        if let Some(bundler) = args.value("bundler") {
            self.build.bundler = parse_bundler("--bundler", bundler)?;
        }
        self.verbose = args.flag("verbose");
        Ok(())
    }

    /// Pool size for batch builds
    pub fn max_workers(&self) -> usize {
        self.build
            .max_workers
            .unwrap_or_else(default_parallelism)
            .max(1)
    }

    pub fn components_path(&self) -> PathBuf {
        self.root.join(&self.components_dir)
    }

    pub fn out_path(&self) -> PathBuf {
        self.root.join(&self.out_dir)
    }

    /// Read-only settings shared by every build worker
    pub fn build_config(&self) -> BuildConfig {
        BuildConfig {
            root: self.root.clone(),
            components_dir: self.components_path(),
            out_dir: self.out_path(),
            entry: self.build.entry.clone(),
            bundler: self.build.bundler,
            sourcemaps: self.build.sourcemaps,
            step_timeout: self.build.step_timeout,
            package_manager: detect_package_manager(&self.root).to_string(),
        }
    }
}

fn parse_jobs(key: &str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse::<usize>()
        .ok()
        .filter(|n| *n > 0)
        .ok_or_else(|| ConfigError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
        })
}

fn parse_bundler(key: &str, value: &str) -> Result<Bundler, ConfigError> {
    Bundler::from_name(value).ok_or_else(|| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    fn args(tokens: &[&str]) -> ParsedArgs {
        let registry = crate::commands::registry().unwrap();
        crate::commands::parse_args(&registry, tokens.iter().copied()).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = KitConfig::default();
        assert_eq!(config.components_dir, PathBuf::from("components"));
        assert_eq!(config.out_dir, PathBuf::from("dist"));
        assert_eq!(config.build.bundler, Bundler::Esbuild);
        assert!(config.max_workers() >= 1);
    }

    #[test]
    fn test_from_yaml_partial() {
        let config = KitConfig::from_yaml(
            "out_dir: build\nbuild:\n  bundler: rollup\n  max_workers: 3\n",
        )
        .unwrap();
        assert_eq!(config.out_dir, PathBuf::from("build"));
        assert_eq!(config.build.bundler, Bundler::Rollup);
        assert_eq!(config.max_workers(), 3);
        assert_eq!(config.build.entry, "src/index.ts");
    }

    #[test]
    fn test_from_yaml_rejects_unknown_keys() {
        assert!(KitConfig::from_yaml("outdir: build\n").is_err());
    }

    #[test]
    fn test_empty_file_is_default() {
        let config = KitConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.out_dir, PathBuf::from("dist"));
    }

    #[test]
    fn test_load_sets_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("kit.yaml"), "components_dir: src/components\n").unwrap();
        let config = KitConfig::load(&Paths::at(dir.path().to_path_buf())).unwrap();
        assert_eq!(config.root, dir.path());
        assert_eq!(config.components_path(), dir.path().join("src/components"));
    }

    #[test]
    fn test_load_reports_parse_errors() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("kit.yaml"), "build: [not, a, map]\n").unwrap();
        let err = KitConfig::load(&Paths::at(dir.path().to_path_buf())).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> =
            [("KIT_JOBS", "6"), ("KIT_OUT_DIR", "out"), ("KIT_BUNDLER", "Webpack")].into();
        let mut config = KitConfig::default();
        config
            .apply_env(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.max_workers(), 6);
        assert_eq!(config.out_dir, PathBuf::from("out"));
        assert_eq!(config.build.bundler, Bundler::Webpack);
    }

    #[test]
    fn test_env_rejects_zero_jobs() {
        let mut config = KitConfig::default();
        let err = config
            .apply_env(|k| (k == "KIT_JOBS").then(|| "0".to_string()))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { ref key, .. } if key == "KIT_JOBS"));
    }

    #[test]
    fn test_args_override_env() {
        let mut config = KitConfig::default();
        config
            .apply_env(|k| (k == "KIT_JOBS").then(|| "6".to_string()))
            .unwrap();
        config.apply_args(&args(&["build", "-j", "2", "--verbose"])).unwrap();
        assert_eq!(config.max_workers(), 2);
        assert!(config.verbose);
    }

    #[test]
    fn test_build_config_paths() {
        let mut config = KitConfig::default();
        config.root = PathBuf::from("/lib");
        let build = config.build_config();
        assert_eq!(build.components_dir, PathBuf::from("/lib/components"));
        assert_eq!(build.out_dir, PathBuf::from("/lib/dist"));
        assert_eq!(build.bundler, Bundler::Esbuild);
    }
}
