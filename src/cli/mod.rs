//! CLI module for the cfconverge tool.
//!
//! This module provides the command-line interface for reconciling
//! a Cloud Foundry space.

mod commands;
mod output;

pub use commands::{Cli, Commands, KindArg, OutputFormat};
pub use output::OutputFormatter;
