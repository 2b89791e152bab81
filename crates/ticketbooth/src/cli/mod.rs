//! Command-line interface for ticketbooth.
//!
//! This module provides the CLI structure for the `tbooth` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, DeleteCommand, IssueCommand, ListCommand, OutputFormat, ShowCommand,
    StatusCommand, VerifyCommand,
};

use crate::logging::Verbosity;

/// tbooth - Issue QR-coded tickets
///
/// Collects a name, nickname and email, encodes them into a QR code and
/// keeps a local list of every ticket issued.
#[derive(Debug, Parser)]
#[command(name = "tbooth")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Issue a new ticket
    Issue(IssueCommand),

    /// List issued tickets
    List(ListCommand),

    /// Show one ticket
    Show(ShowCommand),

    /// Scan a ticket's QR image and check it against its fields
    Verify(VerifyCommand),

    /// Delete tickets
    Delete(DeleteCommand),

    /// Show storage status
    Status(StatusCommand),

    /// View or check configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        if self.quiet {
            Verbosity::Quiet
        } else {
            match self.verbose {
                0 => Verbosity::Normal,
                1 => Verbosity::Verbose,
                _ => Verbosity::Trace,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "tbooth");
    }

    #[test]
    fn test_verbosity_flags() {
        assert_eq!(parse(&["tbooth", "-q", "list"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["tbooth", "list"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["tbooth", "-v", "list"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["tbooth", "-vv", "list"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_issue() {
        let cli = parse(&[
            "tbooth", "issue", "-f", "Ann", "-l", "Lee", "-n", "AL", "-e", "a@x.com",
        ]);
        match cli.command {
            Command::Issue(cmd) => {
                assert_eq!(cmd.first_name, "Ann");
                assert_eq!(cmd.last_name, "Lee");
                assert_eq!(cmd.nickname, "AL");
                assert_eq!(cmd.email, "a@x.com");
                assert!(!cmd.no_qr);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_issue_missing_fields_default_empty() {
        let cli = parse(&["tbooth", "issue", "--first-name", "Ann"]);
        match cli.command {
            Command::Issue(cmd) => assert!(!cmd.to_form().can_submit()),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_list_format() {
        let cli = parse(&["tbooth", "list", "--format", "json"]);
        match cli.command {
            Command::List(cmd) => assert_eq!(cmd.format, OutputFormat::Json),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_delete_many() {
        let cli = parse(&["tbooth", "delete", "0", "2", "5"]);
        match cli.command {
            Command::Delete(cmd) => assert_eq!(cmd.indices, vec![0, 2, 5]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_delete_requires_index() {
        assert!(Cli::try_parse_from(["tbooth", "delete"]).is_err());
    }

    #[test]
    fn test_parse_show_with_png() {
        let cli = parse(&["tbooth", "show", "1", "--png", "/tmp/t.png"]);
        match cli.command {
            Command::Show(cmd) => {
                assert_eq!(cmd.index, 1);
                assert_eq!(cmd.png, Some(PathBuf::from("/tmp/t.png")));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["tbooth", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(cli.command, Command::Status(_)));
    }

    #[test]
    fn test_parse_config_show() {
        let cli = parse(&["tbooth", "config", "show", "--json"]);
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: true })
        ));
    }
}
