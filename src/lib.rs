//! # Gatehouse - Pre-commit Quality Gates with Tool Fallback
//!
//! Gatehouse runs quality and security checks on staged files before a
//! commit lands. Each hook declares a chain of tools in order of
//! preference; when the preferred tool is missing, the engine falls back
//! to a weaker one and says so instead of failing the commit on a missing
//! install.
//!
//! ## Quick Start
//!
//! ```bash
//! # Install gatehouse
//! cargo install gatehouse
//!
//! # See what the hooks could run on this machine
//! gatehouse status
//!
//! # Run every hook against the staged files
//! gatehouse run --all
//! ```

pub mod cli;
pub mod config;
pub mod engine;
pub mod git;
pub mod hooks;

pub use cli::{Cli, Output};
pub use config::GatehouseConfig;

/// Result type alias for gatehouse operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
