//! `stinspect` - CLI for stationinspect
//!
//! This binary records inspections, runs compliance checks, generates report
//! documents and serves the HTTP API.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use serde::de::DeserializeOwned;
use serde::Serialize;

use stationinspect::cli::{
    BroadcasterCommand, Cli, Command, ConfigCommand, ErpCommand, InspectionCommand,
    OutputFormat, ReportCommand, ServeCommand, UploadCommand,
};
use stationinspect::model::{Broadcaster, ChannelInput, Inspection};
use stationinspect::service::{ErpRequest, ImageUpload};
use stationinspect::validation::ReportDraft;
use stationinspect::{init_logging, server, Config, ReportService};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    let config = Config::load_from(cli.config.clone())?;

    match cli.command {
        Command::Broadcaster(cmd) => handle_broadcaster(config, cmd),
        Command::Inspection(cmd) => handle_inspection(config, cmd),
        Command::Report(cmd) => handle_report(config, cmd),
        Command::Erp(cmd) => handle_erp(config, cmd),
        Command::Serve(cmd) => handle_serve(config, &cmd),
        Command::Status(cmd) => handle_status(config, cmd.json),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn handle_broadcaster(config: Config, cmd: BroadcasterCommand) -> Result<()> {
    let service = ReportService::open(config)?;
    match cmd {
        BroadcasterCommand::Add {
            name,
            town,
            contact_name,
            contact_phone,
            contact_email,
        } => {
            let broadcaster = service.add_broadcaster(&Broadcaster {
                town,
                contact_name,
                contact_phone,
                contact_email,
                ..Broadcaster::new(name)
            })?;
            println!(
                "Added broadcaster {} (id {})",
                broadcaster.name,
                broadcaster.id.unwrap_or_default()
            );
        }
        BroadcasterCommand::List { format } => {
            let broadcasters = service.broadcasters()?;
            match format {
                OutputFormat::Json => print_json(&broadcasters)?,
                OutputFormat::Plain => {
                    for b in &broadcasters {
                        println!(
                            "{:>5}  {}  {}",
                            b.id.unwrap_or_default(),
                            b.name,
                            b.town.as_deref().unwrap_or("-")
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn handle_inspection(config: Config, cmd: InspectionCommand) -> Result<()> {
    let service = ReportService::open(config)?;
    match cmd {
        InspectionCommand::Create { file } => {
            let inspection: Inspection = read_json(&file)?;
            let saved = service.create_inspection(inspection)?;
            println!(
                "Created inspection {} ({})",
                saved.id.unwrap_or_default(),
                saved.form_number.as_deref().unwrap_or("-")
            );
        }
        InspectionCommand::Update { id, file } => {
            let inspection: Inspection = read_json(&file)?;
            let saved = service.update_inspection(id, inspection)?;
            println!("Updated inspection {id} (status {})", saved.status);
        }
        InspectionCommand::List { limit, format } => {
            let inspections = service.inspections(limit)?;
            match format {
                OutputFormat::Json => print_json(&inspections)?,
                OutputFormat::Plain => {
                    for i in &inspections {
                        println!(
                            "{:>5}  {}  {}  {:<10}  {}",
                            i.id.unwrap_or_default(),
                            i.form_number.as_deref().unwrap_or("-"),
                            i.inspection_date,
                            i.status.as_str(),
                            i.broadcaster_name().unwrap_or("-")
                        );
                    }
                }
            }
        }
        InspectionCommand::Show { id } => print_json(&service.inspection(id)?)?,
    }
    Ok(())
}

fn handle_report(config: Config, cmd: ReportCommand) -> Result<()> {
    let service = ReportService::open(config)?;
    match cmd {
        ReportCommand::Create { inspection_id } => {
            let creation = service.create_report_from_inspection(inspection_id)?;
            let verb = if creation.created { "Created" } else { "Found" };
            println!(
                "{verb} report {} {}",
                creation.report.id.unwrap_or_default(),
                creation.report.reference_number
            );
            println!("  {}", creation.report.title);
            println!(
                "  {} violation(s), {}",
                creation.violations_detected, creation.report.compliance_status
            );
        }
        ReportCommand::Analyze { report_id } => {
            let summary = service.analyze_violations(report_id)?;
            println!(
                "{}: {} violation(s), {} major, {} minor",
                summary.compliance_status,
                summary.total_violations,
                summary.major_violations,
                summary.minor_violations
            );
            for violation in &summary.violations {
                println!("  [{}] {}", violation.kind(), violation.description);
            }
        }
        ReportCommand::Generate(cmd) => {
            let generated = service.generate_documents(cmd.report_id, &cmd.options())?;
            println!(
                "Wrote {} ({} bytes, {} image(s))",
                generated.path.display(),
                generated.size_bytes,
                generated.total_images
            );
        }
        ReportCommand::Upload(cmd) => handle_upload(&service, cmd)?,
        ReportCommand::Requirements { report_id } => {
            let requirements = service.image_requirements(report_id)?;
            println!(
                "{}/{} required categories covered",
                requirements.total_completed, requirements.total_required
            );
            for req in &requirements.requirements {
                let mark = if req.is_missing() { "missing" } else { "ok" };
                let needed = if req.required { "required" } else { "optional" };
                println!("  {:<28} {:>3}  {needed:<8}  {mark}", req.label, req.count);
            }
        }
        ReportCommand::Validate { file } => {
            let draft: ReportDraft = read_json(&file)?;
            print_json(&service.validate_report(&draft)?)?;
        }
        ReportCommand::List { limit, format } => {
            let reports = service.reports(limit)?;
            match format {
                OutputFormat::Json => print_json(&reports)?,
                OutputFormat::Plain => {
                    for r in &reports {
                        println!(
                            "{:>5}  {}  {:<10}  {:<16}  {}",
                            r.id.unwrap_or_default(),
                            r.reference_number,
                            r.status.as_str(),
                            r.compliance_status.as_str(),
                            r.title
                        );
                    }
                }
            }
        }
    }
    Ok(())
}

fn content_type_for(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => Some("image/jpeg"),
        "png" => Some("image/png"),
        "gif" => Some("image/gif"),
        _ => None,
    }
}

fn handle_upload(service: &ReportService, cmd: UploadCommand) -> Result<()> {
    let mut uploads = Vec::with_capacity(cmd.files.len());
    for path in &cmd.files {
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        uploads.push(ImageUpload {
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            content_type: content_type_for(path).map(str::to_string),
            category: cmd.category.clone(),
            caption: cmd.caption.clone(),
            position: cmd.position.clone(),
            bytes,
        });
    }

    let result = service.upload_images(cmd.report_id, uploads)?;
    for image in &result.uploaded_images {
        println!(
            "Uploaded {} as {} #{}",
            image.filename, image.category, image.order_in_section
        );
    }
    for error in &result.errors {
        eprintln!("Rejected {}: {}", error.filename, error.error);
    }
    Ok(())
}

fn handle_erp(config: Config, cmd: ErpCommand) -> Result<()> {
    let service = ReportService::open(config)?;
    match cmd {
        ErpCommand::Calc {
            power,
            gain,
            losses,
            authorized,
            format,
        } => {
            let summary = service.calculate_erp(&ErpRequest {
                forward_power_w: power,
                antenna_gain_dbd: gain,
                losses_db: losses,
                authorized_kw: authorized,
            })?;
            match format {
                OutputFormat::Json => print_json(&summary)?,
                OutputFormat::Plain => {
                    println!("{}", summary.formula);
                    println!(
                        "ERP: {:.2} dBW ({:.3} kW), limit {} kW",
                        summary.erp_dbw, summary.erp_kw, summary.authorized_erp_kw
                    );
                    if summary.is_compliant {
                        println!("Compliant");
                    } else {
                        println!(
                            "Over the limit by {:.3} kW ({:.1}%)",
                            summary.excess_power_kw, summary.percentage_over
                        );
                    }
                }
            }
        }
        ErpCommand::Bulk { report_id, file } => {
            let channels: Vec<ChannelInput> = read_json(&file)?;
            let result = service.bulk_calculate(report_id, &channels)?;
            for row in &result.calculations {
                let verb = if row.created { "created" } else { "updated" };
                println!(
                    "{} {}: {:.2} dBW ({:.3} kW) {verb}",
                    row.calculation.channel_number,
                    row.calculation.frequency_mhz,
                    row.calculation.erp_dbw,
                    row.calculation.erp_kw
                );
            }
            for error in &result.errors {
                eprintln!("{}: {}", error.channel, error.error);
            }
        }
    }
    Ok(())
}

fn handle_serve(mut config: Config, cmd: &ServeCommand) -> Result<()> {
    if let Some(bind) = &cmd.bind {
        config.server.bind_address.clone_from(bind);
    }
    if let Some(port) = cmd.port {
        config.server.port = port;
    }
    let server_config = config.server.clone();
    let service = ReportService::open(config)?;

    actix_web::rt::System::new()
        .block_on(server::run(service, &server_config))
        .context("HTTP server failed")
}

fn handle_status(config: Config, json: bool) -> Result<()> {
    let database = config.database_path();
    let media = config.media_dir();
    let output = config.output_dir();
    let stats = ReportService::open(config)?.stats()?;

    if json {
        let status = serde_json::json!({
            "database_path": database,
            "media_dir": media,
            "output_dir": output,
            "broadcasters": stats.broadcasters,
            "inspections": stats.inspections,
            "reports": stats.reports,
            "images": stats.images,
            "db_size_bytes": stats.db_size_bytes,
        });
        print_json(&status)?;
    } else {
        println!("stinspect status");
        println!("----------------");
        println!("Database:      {}", database.display());
        println!("Media:         {}", media.display());
        println!("Output:        {}", output.display());
        println!("Broadcasters:  {}", stats.broadcasters);
        println!("Inspections:   {}", stats.inspections);
        println!("Reports:       {}", stats.reports);
        println!("Images:        {}", stats.images);
        println!("Size:          {} bytes", stats.db_size_bytes);
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                print_json(config)?;
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:      {}", config.database_path().display());
                println!("  Media dir:          {}", config.media_dir().display());
                println!("  Output dir:         {}", config.output_dir().display());
                println!();
                println!("[Compliance]");
                println!(
                    "  Authorized ERP:     {} kW",
                    config.compliance.authorized_erp_kw
                );
                println!(
                    "  Default gain:       {} dBd",
                    config.compliance.default_antenna_gain_dbd
                );
                println!(
                    "  Default losses:     {} dB",
                    config.compliance.default_losses_db
                );
                println!(
                    "  Non-approved:       {}",
                    config.compliance.non_approved_equipment.len()
                );
                println!();
                println!("[Server]");
                println!(
                    "  Listen:             {}:{}",
                    config.server.bind_address, config.server.port
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
