//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand, ValueEnum};

use crate::assembler::GenerationOptions;

/// Broadcaster commands.
#[derive(Debug, Subcommand)]
pub enum BroadcasterCommand {
    /// Register a broadcaster
    Add {
        /// Registered name
        name: String,

        /// Town
        #[arg(long)]
        town: Option<String>,

        /// Contact person's name
        #[arg(long)]
        contact_name: Option<String>,

        /// Contact person's phone
        #[arg(long)]
        contact_phone: Option<String>,

        /// Contact person's email
        #[arg(long)]
        contact_email: Option<String>,
    },

    /// List registered broadcasters
    List {
        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Inspection commands.
#[derive(Debug, Subcommand)]
pub enum InspectionCommand {
    /// Create an inspection from a JSON form
    Create {
        /// JSON file holding the form
        file: PathBuf,
    },

    /// Replace an inspection's form with a JSON file
    Update {
        /// Inspection id
        id: i64,

        /// JSON file holding the form
        file: PathBuf,
    },

    /// List recent inspections
    List {
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Print one inspection as JSON
    Show {
        /// Inspection id
        id: i64,
    },
}

/// Report commands.
#[derive(Debug, Subcommand)]
pub enum ReportCommand {
    /// Create the report for an inspection
    Create {
        /// Inspection id
        inspection_id: i64,
    },

    /// Re-run violation detection for a report
    Analyze {
        /// Report id
        report_id: i64,
    },

    /// Assemble the report document
    Generate(GenerateCommand),

    /// Attach image files to a report
    Upload(UploadCommand),

    /// Show which image categories are still missing
    Requirements {
        /// Report id
        report_id: i64,
    },

    /// Check a report draft (JSON file) before generation
    Validate {
        /// JSON file holding the draft
        file: PathBuf,
    },

    /// List recent reports
    List {
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },
}

/// Document generation arguments.
#[derive(Debug, Args)]
pub struct GenerateCommand {
    /// Report id
    pub report_id: i64,

    /// Output formats
    #[arg(short, long = "format", default_value = "docx")]
    pub formats: Vec<String>,

    /// Leave photographs out of the document
    #[arg(long)]
    pub no_images: bool,

    /// Text replacing the stored observations
    #[arg(long)]
    pub observations: Option<String>,

    /// Text replacing the stored conclusions
    #[arg(long)]
    pub conclusions: Option<String>,

    /// Text replacing the stored recommendations
    #[arg(long)]
    pub recommendations: Option<String>,
}

impl GenerateCommand {
    /// Generation options for the service.
    #[must_use]
    pub fn options(&self) -> GenerationOptions {
        GenerationOptions {
            formats: self.formats.clone(),
            custom_observations: self.observations.clone(),
            custom_conclusions: self.conclusions.clone(),
            custom_recommendations: self.recommendations.clone(),
            include_images: !self.no_images,
        }
    }
}

/// Image upload arguments.
#[derive(Debug, Args)]
pub struct UploadCommand {
    /// Report id
    pub report_id: i64,

    /// Image files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Image category, e.g. `tower` or `antenna`
    #[arg(short = 't', long = "type")]
    pub category: Option<String>,

    /// Caption; defaults to the file name
    #[arg(long)]
    pub caption: Option<String>,

    /// Placement within the document
    #[arg(long)]
    pub position: Option<String>,
}

/// ERP commands.
#[derive(Debug, Subcommand)]
pub enum ErpCommand {
    /// Calculate ERP without storing anything
    Calc {
        /// Forward power in watts
        power: f64,

        /// Antenna gain in dBd
        #[arg(short, long)]
        gain: Option<f64>,

        /// Feeder and system losses in dB
        #[arg(short, long)]
        losses: Option<f64>,

        /// Authorized ERP in kW
        #[arg(short = 'a', long)]
        authorized: Option<f64>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "plain")]
        format: OutputFormat,
    },

    /// Store per-channel calculations from a JSON file
    Bulk {
        /// Report id
        report_id: i64,

        /// JSON file holding an array of channels
        file: PathBuf,
    },
}

/// Server arguments.
#[derive(Debug, Args)]
pub struct ServeCommand {
    /// Address to bind, overriding the configuration
    #[arg(short, long)]
    pub bind: Option<String>,

    /// Port to listen on, overriding the configuration
    #[arg(short, long)]
    pub port: Option<u16>,
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
    /// JSON output
    Json,
}
