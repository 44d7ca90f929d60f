//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::diff::EntityKind;

/// cfconverge - Declarative Cloud Foundry space reconciler.
#[derive(Parser, Debug)]
#[command(name = "cfconverge")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the configuration file.
    #[arg(short, long, global = true, env = "CFCONVERGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the configuration document.
    Validate {
        /// Show all warnings, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Show the changes between the live space and the document.
    Diff {
        /// Restrict to one entity kind.
        #[arg(short, long)]
        kind: Option<KindArg>,
    },

    /// Show the remote calls that would converge the space.
    Plan {
        /// Restrict to one entity kind.
        #[arg(short, long)]
        kind: Option<KindArg>,
    },

    /// Converge the live space to the document.
    Apply {
        /// Restrict to one entity kind.
        #[arg(short, long)]
        kind: Option<KindArg>,

        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Print the live space as a configuration document.
    Get,
}

/// Entity kind selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum KindArg {
    /// Applications.
    Apps,
    /// Service instances.
    Services,
    /// Space developers.
    SpaceDevelopers,
}

impl From<KindArg> for EntityKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Apps => Self::Applications,
            KindArg::Services => Self::Services,
            KindArg::SpaceDevelopers => Self::SpaceDevelopers,
        }
    }
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_apply_with_kind() {
        let cli = Cli::try_parse_from(["cfconverge", "apply", "--kind", "space-developers", "-y"])
            .unwrap();
        match cli.command {
            Commands::Apply { kind, yes } => {
                assert_eq!(kind.map(EntityKind::from), Some(EntityKind::SpaceDevelopers));
                assert!(yes);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_global_options() {
        let cli = Cli::try_parse_from([
            "cfconverge",
            "get",
            "--output",
            "json",
            "-c",
            "space.yaml",
            "-v",
        ])
        .unwrap();
        assert!(matches!(cli.output, OutputFormat::Json));
        assert_eq!(cli.config, Some(PathBuf::from("space.yaml")));
        assert!(cli.verbose);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        assert!(Cli::try_parse_from(["cfconverge", "plan", "--kind", "routes"]).is_err());
    }
}
