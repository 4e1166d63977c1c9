//! Standard paths used by kit

use std::path::{Path, PathBuf};

/// Project config file name
pub const CONFIG_FILE: &str = "kit.yaml";

/// Standard kit paths for one project
#[derive(Debug, Clone)]
pub struct Paths {
    /// Project root (directory holding kit.yaml or package.json)
    pub root: PathBuf,
    /// Per-user state directory (~/.local/share/kit)
    pub state: PathBuf,
}

impl Paths {
    /// Discover the project root by walking up from `start`.
    ///
    /// The first directory containing `kit.yaml` wins, then the first one
    /// containing `package.json`. Falls back to `start` itself.
    pub fn discover(start: &Path) -> Self {
        let root = find_upwards(start, CONFIG_FILE)
            .or_else(|| find_upwards(start, "package.json"))
            .unwrap_or_else(|| start.to_path_buf());

        Self::at(root)
    }

    /// Paths rooted at an explicit project directory
    pub fn at(root: PathBuf) -> Self {
        let state = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("~/.local/share"))
            .join("kit");

        Self { root, state }
    }

    /// Path of the project config file (may not exist)
    pub fn config_file(&self) -> PathBuf {
        self.root.join(CONFIG_FILE)
    }

    /// Get state file path for a tool
    pub fn state_file(&self, name: &str) -> PathBuf {
        self.state.join(name)
    }
}

fn find_upwards(start: &Path, marker: &str) -> Option<PathBuf> {
    start
        .ancestors()
        .find(|dir| dir.join(marker).exists())
        .map(Path::to_path_buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discover_prefers_config_file() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CONFIG_FILE), "").unwrap();
        let nested = dir.path().join("components").join("x-button");
        fs::create_dir_all(&nested).unwrap();
        fs::write(nested.join("package.json"), "{}").unwrap();

        let paths = Paths::discover(&nested);
        assert_eq!(paths.root, dir.path());
    }

    #[test]
    fn test_discover_falls_back_to_package_json() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        let nested = dir.path().join("src");
        fs::create_dir_all(&nested).unwrap();

        assert_eq!(Paths::discover(&nested).root, dir.path());
    }

    #[test]
    fn test_state_file_is_per_user() {
        let paths = Paths::at(PathBuf::from("/project"));
        let file = paths.state_file("last_build.json");
        assert!(file.ends_with("kit/last_build.json"));
        assert!(!file.starts_with("/project"));
    }
}
