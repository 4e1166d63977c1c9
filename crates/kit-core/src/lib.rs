//! kit-core - Shared functionality for the kit component-library tooling
//!
//! Project layout discovery, external tool invocation and the small amount
//! of platform detection the build orchestration needs.

pub mod detect;
pub mod paths;
pub mod process;

pub use detect::{detect_package_manager, package_runner};
pub use paths::Paths;
pub use process::{default_parallelism, require_tool, run_interactive, run_tool, ToolError, ToolOutput};
