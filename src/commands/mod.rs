//! CLI command implementations for vsp-aggregator.
//!
//! This module provides implementations for all CLI subcommands:
//! - `config`: Configuration file generation
//! - `refresh`: One-shot refresh cycle with the resulting snapshot on stdout
//! - `providers`: Provider listing

pub mod config;
pub mod providers;
pub mod refresh;

// Re-export command functions
pub use config::command_config;
pub use providers::command_providers;
pub use refresh::command_refresh;
