//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::form::{FormField, TicketForm};

/// Issue command arguments: the four form fields.
#[derive(Debug, Args)]
pub struct IssueCommand {
    /// Given name
    #[arg(short, long, default_value = "")]
    pub first_name: String,

    /// Family name
    #[arg(short, long, default_value = "")]
    pub last_name: String,

    /// Display nickname
    #[arg(short, long, default_value = "")]
    pub nickname: String,

    /// Contact email address
    #[arg(short, long, default_value = "")]
    pub email: String,

    /// Issue the ticket without generating a QR image
    #[arg(long)]
    pub no_qr: bool,

    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

impl IssueCommand {
    /// Fill a ticket form from the arguments.
    #[must_use]
    pub fn to_form(&self) -> TicketForm {
        TicketForm::new()
            .with(FormField::FirstName, self.first_name.as_str())
            .with(FormField::LastName, self.last_name.as_str())
            .with(FormField::Nickname, self.nickname.as_str())
            .with(FormField::Email, self.email.as_str())
    }
}

/// List command arguments.
#[derive(Debug, Args)]
pub struct ListCommand {
    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Show command arguments.
#[derive(Debug, Args)]
pub struct ShowCommand {
    /// Position of the ticket in the list (0-based)
    pub index: usize,

    /// Write the ticket's QR image to this PNG file
    #[arg(long, value_name = "FILE")]
    pub png: Option<PathBuf>,
}

/// Verify command arguments.
#[derive(Debug, Args)]
pub struct VerifyCommand {
    /// Position of the ticket in the list (0-based)
    pub index: usize,
}

/// Delete command arguments.
#[derive(Debug, Args)]
pub struct DeleteCommand {
    /// Positions of the tickets to delete (0-based, as shown by `list`)
    #[arg(required = true, num_args = 1..)]
    pub indices: Vec<usize>,
}

/// Status command arguments.
#[derive(Debug, Args)]
pub struct StatusCommand {
    /// Output as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate configuration
    Validate {
        /// Path to configuration file to validate
        #[arg(short, long)]
        file: Option<PathBuf>,
    },
}

/// Output format for commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Plain text output
    #[default]
    Plain,
    /// Formatted table
    Table,
    /// JSON output
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_default() {
        assert_eq!(OutputFormat::default(), OutputFormat::Plain);
    }

    #[test]
    fn test_issue_to_form() {
        let cmd = IssueCommand {
            first_name: "Ann".to_string(),
            last_name: "Lee".to_string(),
            nickname: "AL".to_string(),
            email: "a@x.com".to_string(),
            no_qr: false,
            json: false,
        };
        let form = cmd.to_form();
        assert!(form.can_submit());
        assert_eq!(form.get(FormField::Nickname), "AL");
    }

    #[test]
    fn test_issue_to_form_incomplete() {
        let cmd = IssueCommand {
            first_name: "Ann".to_string(),
            last_name: String::new(),
            nickname: String::new(),
            email: "a@x.com".to_string(),
            no_qr: true,
            json: false,
        };
        assert_eq!(
            cmd.to_form().missing_fields(),
            vec![FormField::LastName, FormField::Nickname]
        );
    }

    #[test]
    fn test_config_command_debug() {
        let cmd = ConfigCommand::Show { json: false };
        assert!(format!("{cmd:?}").contains("Show"));
    }
}
