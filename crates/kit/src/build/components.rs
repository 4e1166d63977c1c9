//! Component discovery and naming rules

use anyhow::{Context, Result};
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Every component directory under `dir`, sorted by name.
///
/// Hidden directories and plain files are skipped. A missing components
/// directory yields an empty list.
pub fn discover_components(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut names = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if name.starts_with('.') {
            continue;
        }
        names.push(name);
    }

    names.sort();
    Ok(names)
}

/// Global stylesheets: top-level `.scss` files in `dir`, partials excluded
pub fn discover_stylesheets(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }

    let mut sheets = Vec::new();
    for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
        let path = entry?.path();
        let is_scss = path.extension().is_some_and(|ext| ext == "scss");
        let partial = path
            .file_name()
            .is_some_and(|name| name.to_string_lossy().starts_with('_'));
        if path.is_file() && is_scss && !partial {
            sheets.push(path);
        }
    }

    sheets.sort();
    Ok(sheets)
}

fn custom_element_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][a-z0-9]*(-[a-z0-9]+)+$").unwrap())
}

/// Why `name` can't be used as a custom element name, if it can't
pub fn invalid_component_name(name: &str) -> Option<String> {
    if custom_element_pattern().is_match(name) {
        None
    } else {
        Some(format!(
            "'{}' is not a valid component name. Use lowercase words joined by a hyphen, e.g. 'x-button'.",
            name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_discover_sorted_and_skips_hidden() {
        let dir = tempdir().unwrap();
        for name in ["x-tabs", "x-button", ".cache", "x-card"] {
            fs::create_dir(dir.path().join(name)).unwrap();
        }
        fs::write(dir.path().join("README.md"), "docs").unwrap();

        let found = discover_components(dir.path()).unwrap();
        assert_eq!(found, ["x-button", "x-card", "x-tabs"]);
    }

    #[test]
    fn test_discover_missing_dir() {
        let dir = tempdir().unwrap();
        assert!(discover_components(&dir.path().join("nope")).unwrap().is_empty());
    }

    #[test]
    fn test_discover_stylesheets_skips_partials() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("theme.scss"), "").unwrap();
        fs::write(dir.path().join("core.scss"), "").unwrap();
        fs::write(dir.path().join("_mixins.scss"), "").unwrap();
        fs::write(dir.path().join("notes.css"), "").unwrap();
        fs::create_dir(dir.path().join("x-card")).unwrap();
        fs::write(dir.path().join("x-card").join("x-card.scss"), "").unwrap();

        let sheets = discover_stylesheets(dir.path()).unwrap();
        assert_eq!(
            sheets,
            [dir.path().join("core.scss"), dir.path().join("theme.scss")]
        );
    }

    #[test]
    fn test_component_names() {
        assert!(invalid_component_name("widget-a").is_none());
        assert!(invalid_component_name("x-date-picker2").is_none());
        assert!(invalid_component_name("button").is_some());
        assert!(invalid_component_name("X-Button").is_some());
        assert!(invalid_component_name("-x").is_some());
        assert!(invalid_component_name("x-").is_some());
    }
}
