//! Command-line interface module
//!
//! This module handles argument parsing and output formatting.
//! It contains no business logic - that belongs in the [`crate::core`] module.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use commands::Commands;

/// slnresolve - cross-solution dependency resolver and build driver
///
/// Finds the dependencies between .NET projects and solutions under a source tree, prints
/// or exports the build order, copies built components between solutions and builds them
/// in order.
#[derive(Parser, Debug)]
#[command(name = "slnresolve")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Output in JSON format for scripting
    #[arg(long, global = true)]
    pub json: bool,

    /// Settings file (default: slnresolve.toml in the base path, then the user config)
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        if let Some(cmd) = self.command {
            cmd.run(self.config.as_deref())
        } else {
            use clap::CommandFactory;
            let mut cmd = Self::command();
            cmd.print_help()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_negative_recursion_level() {
        let cli = Cli::try_parse_from(["slnresolve", "order", "-b", "/src", "-r", "-1", "A.sln"]).unwrap();
        match cli.command {
            Some(Commands::Order { common, .. }) => {
                assert_eq!(common.recursion_level, Some(-1));
                assert_eq!(common.inputs, vec![PathBuf::from("A.sln")]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["slnresolve", "check", "-b", ".", "-vv", "--json"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.json);
    }

    #[test]
    fn test_base_path_is_required() {
        assert!(Cli::try_parse_from(["slnresolve", "order", "A.sln"]).is_err());
    }
}
