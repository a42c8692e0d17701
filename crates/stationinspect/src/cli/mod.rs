//! Command-line interface for stationinspect.
//!
//! This module provides the CLI structure for the `stinspect` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    BroadcasterCommand, ConfigCommand, ErpCommand, GenerateCommand, InspectionCommand,
    OutputFormat, ReportCommand, ServeCommand, StatusCommand, UploadCommand,
};

/// stinspect - Broadcast station inspections and compliance reports
///
/// Records transmitter site inspections, checks effective radiated power
/// against the authorized limit and produces the inspection report document.
#[derive(Debug, Parser)]
#[command(name = "stinspect")]
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
    /// Manage broadcasters
    #[command(subcommand)]
    Broadcaster(BroadcasterCommand),

    /// Record and list inspections
    #[command(subcommand)]
    Inspection(InspectionCommand),

    /// Create, analyze and generate reports
    #[command(subcommand)]
    Report(ReportCommand),

    /// Effective radiated power calculations
    #[command(subcommand)]
    Erp(ErpCommand),

    /// Serve the HTTP API
    Serve(ServeCommand),

    /// Show database status
    Status(StatusCommand),

    /// View configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> crate::logging::Verbosity {
        if self.quiet {
            crate::logging::Verbosity::Quiet
        } else {
            match self.verbose {
                0 => crate::logging::Verbosity::Normal,
                1 => crate::logging::Verbosity::Verbose,
                _ => crate::logging::Verbosity::Trace,
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
    fn test_cli_name() {
        assert_eq!(Cli::command().get_name(), "stinspect");
    }

    #[test]
    fn test_cli_verify() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_verbosity_flags() {
        use crate::logging::Verbosity;

        assert_eq!(parse(&["stinspect", "-q", "status"]).verbosity(), Verbosity::Quiet);
        assert_eq!(parse(&["stinspect", "status"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["stinspect", "-v", "status"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["stinspect", "-vv", "status"]).verbosity(), Verbosity::Trace);
    }

    #[test]
    fn test_parse_erp_calc() {
        let cli = parse(&["stinspect", "erp", "calc", "3000", "--gain", "11", "-f", "json"]);
        match cli.command {
            Command::Erp(ErpCommand::Calc {
                power,
                gain,
                losses,
                format,
                ..
            }) => {
                assert!((power - 3000.0).abs() < f64::EPSILON);
                assert_eq!(gain, Some(11.0));
                assert_eq!(losses, None);
                assert_eq!(format, OutputFormat::Json);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_generate() {
        let cli = parse(&[
            "stinspect",
            "report",
            "generate",
            "4",
            "--no-images",
            "--conclusions",
            "All good",
        ]);
        match cli.command {
            Command::Report(ReportCommand::Generate(cmd)) => {
                assert_eq!(cmd.report_id, 4);
                assert_eq!(cmd.formats, vec!["docx"]);
                assert!(cmd.no_images);
                assert_eq!(cmd.conclusions.as_deref(), Some("All good"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_report_upload_requires_files() {
        assert!(Cli::try_parse_from(["stinspect", "report", "upload", "1"]).is_err());

        let cli = parse(&[
            "stinspect", "report", "upload", "1", "a.jpg", "b.png", "-t", "tower_mast",
        ]);
        match cli.command {
            Command::Report(ReportCommand::Upload(cmd)) => {
                assert_eq!(cmd.files.len(), 2);
                assert_eq!(cmd.category.as_deref(), Some("tower_mast"));
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_serve_overrides() {
        let cli = parse(&["stinspect", "serve", "--port", "9000"]);
        match cli.command {
            Command::Serve(cmd) => {
                assert_eq!(cmd.port, Some(9000));
                assert!(cmd.bind.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["stinspect", "-c", "/custom/config.toml", "status"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
    }
}
