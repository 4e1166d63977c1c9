//! kit - build tooling for web-component libraries
//!
//! A small command engine (registry, resolver, dispatcher) in front of a
//! bounded worker pool that builds components in parallel.

pub mod build;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod output;
pub mod pool;

pub use error::{KitError, Result};
