//! Package manager detection

use std::path::Path;

/// Detect the Node.js package manager from lock files
pub fn detect_package_manager(path: &Path) -> &'static str {
    if path.join("pnpm-lock.yaml").exists() {
        "pnpm"
    } else if path.join("yarn.lock").exists() {
        "yarn"
    } else if path.join("bun.lockb").exists() {
        "bun"
    } else {
        "npm"
    }
}

/// Command that runs a locally installed package binary for `package_manager`
pub fn package_runner(package_manager: &str) -> &'static str {
    match package_manager {
        "pnpm" => "pnpm exec",
        "yarn" => "yarn",
        "bun" => "bunx",
        _ => "npx",
    }
}
