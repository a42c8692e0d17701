//! Fills the inspection report template.
//!
//! The layout is fixed: letter header, findings sections A to G with tables
//! and photographs, then observations, conclusions, recommendations and the
//! signature block. Photographs that cannot be read are left out with a
//! warning so that one bad upload never blocks a report.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ReportConfig;
use crate::docx::{Align, DocxBuilder, Paragraph, Run, Table};
use crate::erp::{ErpAssessment, ErpInput};
use crate::error::Result;
use crate::model::{
    filled, Broadcaster, ErpCalculation, ImageAlignment, ImageCategory, Inspection,
    InspectionReport, ReportImage,
};
use crate::narrative::{
    auto_conclusions, auto_recommendations, bullet_lines, ordinal_date, NarrativeInputs,
};
use crate::units::format_number;
use crate::violations::RuleSet;

const NOT_SPECIFIED: &str = "Not specified";
const NOT_SEEN: &str = "Not Seen";
const ERP_FORMULA: &str = "ERP = 10log P(W) + G (dBd) - L (dB)";

/// Caller choices for one generation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationOptions {
    /// Requested output formats; only `docx` is produced.
    pub formats: Vec<String>,
    /// Replaces the stored observations when not blank.
    pub custom_observations: Option<String>,
    /// Replaces the stored or generated conclusions when not blank.
    pub custom_conclusions: Option<String>,
    /// Replaces the stored or generated recommendations when not blank.
    pub custom_recommendations: Option<String>,
    /// Whether photographs are inserted.
    pub include_images: bool,
}

impl Default for GenerationOptions {
    fn default() -> Self {
        Self {
            formats: vec!["docx".to_string()],
            custom_observations: None,
            custom_conclusions: None,
            custom_recommendations: None,
            include_images: true,
        }
    }
}

/// Everything a report document is built from.
#[derive(Debug, Clone, Copy)]
pub struct ReportContext<'a> {
    /// The report being printed.
    pub report: &'a InspectionReport,
    /// Its inspection.
    pub inspection: &'a Inspection,
    /// The inspected broadcaster, if registered.
    pub broadcaster: Option<&'a Broadcaster>,
    /// Stored per-channel ERP rows.
    pub calculations: &'a [ErpCalculation],
    /// Uploaded photographs in section order.
    pub images: &'a [ReportImage],
}

impl ReportContext<'_> {
    fn images_of(&self, category: ImageCategory) -> impl Iterator<Item = &ReportImage> {
        self.images.iter().filter(move |i| i.category == category)
    }

    fn has_images(&self, category: ImageCategory) -> bool {
        self.images_of(category).next().is_some()
    }

    fn contact_name(&self) -> &str {
        filled(self.inspection.administrative.contact_name.as_deref())
            .or_else(|| self.broadcaster.and_then(|b| filled(b.contact_name.as_deref())))
            .unwrap_or("their representative")
    }
}

/// Builds report documents.
#[derive(Debug, Clone)]
pub struct DocumentAssembler {
    config: ReportConfig,
    rules: RuleSet,
    media_root: PathBuf,
}

impl DocumentAssembler {
    /// Create an assembler; relative image paths resolve against `media_root`.
    #[must_use]
    pub fn new(config: ReportConfig, rules: RuleSet, media_root: impl Into<PathBuf>) -> Self {
        Self {
            config,
            rules,
            media_root: media_root.into(),
        }
    }

    /// Build the `.docx` bytes for a report.
    ///
    /// # Errors
    ///
    /// Returns an error if packaging the document fails. Unreadable images
    /// are skipped, not reported.
    pub fn assemble(
        &self,
        ctx: &ReportContext<'_>,
        options: &GenerationOptions,
    ) -> Result<Vec<u8>> {
        let mut doc = DocxBuilder::new(
            ctx.report.title.clone(),
            ctx.inspection.inspector_name.clone(),
        );
        let images = options.include_images;

        self.header(&mut doc, ctx);

        doc.heading("A. SITE");
        doc.table(&site_table(ctx.inspection));
        self.images(&mut doc, ctx, ImageCategory::SiteOverview, images);

        doc.heading("B. MAST");
        doc.table(&tower_table(ctx.inspection));
        self.images(&mut doc, ctx, ImageCategory::TowerMast, images);

        doc.heading("C. TRANSMITTER");
        transmitter_section(&mut doc, ctx);
        self.images(&mut doc, ctx, ImageCategory::TransmitterEquipment, images);

        doc.heading("D. ANTENNA SYSTEM");
        doc.table(&antenna_table(ctx.inspection));
        self.images(&mut doc, ctx, ImageCategory::Antenna, images);

        if ctx.inspection.has_filter() || ctx.has_images(ImageCategory::FilterEquipment) {
            doc.heading("E. FILTER");
            doc.table(&filter_table(ctx.inspection));
            self.images(&mut doc, ctx, ImageCategory::FilterEquipment, images);
        }

        if ctx.inspection.studio_link.is_recorded()
            || ctx.has_images(ImageCategory::StudioTransmitterLink)
        {
            doc.heading("F. STUDIO TO TRANSMITTER LINK");
            doc.table(&stl_table(ctx.inspection));
            self.images(&mut doc, ctx, ImageCategory::StudioTransmitterLink, images);
        }

        doc.heading("G. ERP CALCULATION");
        self.erp_section(&mut doc, ctx);

        if images {
            self.images(&mut doc, ctx, ImageCategory::OtherEquipment, true);
        }

        self.closing_sections(&mut doc, ctx, options);
        self.signature(&mut doc, ctx);

        debug!(
            report = %ctx.report.reference_number,
            images = doc.image_count(),
            "Assembled report document"
        );
        doc.finish()
    }

    fn header(&self, doc: &mut DocxBuilder, ctx: &ReportContext<'_>) {
        let date = ordinal_date(ctx.inspection.inspection_date);

        doc.paragraph(Paragraph::new().run(Run::new(&ctx.report.reference_number).bold().size(12)))
            .paragraph(Paragraph::text(&date))
            .blank_line()
            .paragraph(
                Paragraph::new().run(Run::new(format!("TO: {}", self.config.addressee)).bold()),
            )
            .paragraph(
                Paragraph::new().run(Run::new(format!("THRO': {}", self.config.through)).bold()),
            )
            .blank_line()
            .paragraph(
                Paragraph::new()
                    .run(Run::new(format!("RE: {}", ctx.report.title)).bold())
                    .align(Align::Center),
            )
            .blank_line()
            .paragraph(Paragraph::text("The above subject matter refers."))
            .paragraph(
                Paragraph::text(format!(
                    "The transmit station was inspected by {} officer {} on {} in the presence of their representative {}.",
                    self.config.authority,
                    ctx.inspection.inspector_name,
                    date,
                    ctx.contact_name()
                ))
                .align(Align::Justify),
            )
            .blank_line()
            .paragraph(Paragraph::new().run(Run::new("FINDINGS").bold().size(14)));
    }

    fn images(
        &self,
        doc: &mut DocxBuilder,
        ctx: &ReportContext<'_>,
        category: ImageCategory,
        enabled: bool,
    ) {
        if !enabled {
            return;
        }
        for image in ctx.images_of(category) {
            let path = self.resolve(&image.file_path);
            let bytes = match std::fs::read(&path) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(
                        image = ?image.id,
                        path = %path.display(),
                        error = %e,
                        "Skipping unreadable report image"
                    );
                    continue;
                }
            };
            if let Err(e) = doc.image(bytes, image.width_percentage, align_of(image.alignment)) {
                warn!(
                    image = ?image.id,
                    path = %path.display(),
                    error = %e,
                    "Skipping corrupt report image"
                );
                continue;
            }
            if !image.caption.trim().is_empty() {
                doc.paragraph(
                    Paragraph::new()
                        .run(Run::new(image.caption.trim()).italic().size(10))
                        .align(Align::Center),
                );
            }
        }
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.media_root.join(path)
        }
    }

    fn erp_section(&self, doc: &mut DocxBuilder, ctx: &ReportContext<'_>) {
        let inspection = ctx.inspection;
        let frequency = inspection.transmit_frequency().unwrap_or("Unknown");

        match ctx.calculations {
            [] => {
                let recorded_kw = filled(inspection.antenna.effective_radiated_power.as_deref());
                let recorded_dbw =
                    filled(inspection.antenna.effective_radiated_power_dbw.as_deref());
                if recorded_kw.is_some() || recorded_dbw.is_some() {
                    doc.paragraph(channel_heading("CH.1", frequency));
                    doc.table(&recorded_erp_table(inspection, recorded_kw, recorded_dbw));
                } else if let Some(assessment) = inspection
                    .erp_input(self.rules.default_gain_dbd, self.rules.default_losses_db)
                    .and_then(|input| {
                        ErpAssessment::assess(input, self.rules.authorized_erp_kw).ok()
                    })
                {
                    doc.paragraph(channel_heading("CH.1", frequency));
                    doc.table(&erp_table(
                        &assessment.input,
                        assessment.result.erp_dbw,
                        assessment.result.erp_kw,
                    ));
                } else {
                    doc.paragraph(Paragraph::text(
                        "ERP calculation not available - insufficient equipment data",
                    ));
                }
            }
            [calc] => {
                doc.paragraph(channel_heading(&calc.channel_number, &calc.frequency_mhz));
                doc.table(&erp_table(&calc.input(), calc.erp_dbw, calc.erp_kw));
            }
            calcs => {
                doc.table(&multi_channel_erp_table(calcs));
            }
        }

        let authorized_kw = self.rules.authorized_erp_kw;
        doc.paragraph(Paragraph::new().run(
            Run::new(format!(
                "Authorized ERP: {} W ({} kW)",
                format_number(authorized_kw * 1000.0),
                format_number(authorized_kw)
            ))
            .bold(),
        ));
        doc.blank_line();
    }

    fn closing_sections(
        &self,
        doc: &mut DocxBuilder,
        ctx: &ReportContext<'_>,
        options: &GenerationOptions,
    ) {
        let observations = choose(&[
            options.custom_observations.as_deref(),
            Some(ctx.report.observations.as_str()),
            ctx.inspection.observations(),
        ]);
        if let Some(text) = observations {
            doc.heading("H. OBSERVATION");
            for line in bullet_lines(text) {
                doc.bullet(line);
            }
            doc.blank_line();
        }

        let inputs = NarrativeInputs {
            calculations: ctx.calculations,
            violations: &ctx.report.violations,
            observations,
            authorized_kw: self.rules.authorized_erp_kw,
        };

        doc.heading("I. CONCLUSION");
        let conclusions = choose(&[
            options.custom_conclusions.as_deref(),
            Some(ctx.report.conclusions.as_str()),
        ])
        .map_or_else(|| auto_conclusions(&inputs), bullet_lines);
        for line in conclusions {
            doc.bullet(line);
        }
        doc.blank_line();

        doc.heading("J. RECOMMENDATION");
        let recommendations = choose(&[
            options.custom_recommendations.as_deref(),
            Some(ctx.report.recommendations.as_str()),
        ])
        .map_or_else(|| auto_recommendations(&inputs), bullet_lines);
        for line in recommendations {
            doc.bullet(line);
        }
    }

    fn signature(&self, doc: &mut DocxBuilder, ctx: &ReportContext<'_>) {
        doc.blank_line()
            .blank_line()
            .paragraph(Paragraph::new().run(Run::new(&ctx.inspection.inspector_name).bold()))
            .paragraph(Paragraph::new().run(Run::new(&self.config.signatory_title).bold()));
    }
}

fn align_of(alignment: ImageAlignment) -> Align {
    match alignment {
        ImageAlignment::Left => Align::Left,
        ImageAlignment::Center => Align::Center,
        ImageAlignment::Right => Align::Right,
    }
}

/// First candidate with visible text.
fn choose<'a>(candidates: &[Option<&'a str>]) -> Option<&'a str> {
    candidates.iter().find_map(|c| filled(*c))
}

fn or_default<'a>(value: Option<&'a str>, default: &'a str) -> &'a str {
    filled(value).unwrap_or(default)
}

fn channel_heading(channel: &str, frequency: &str) -> Paragraph {
    Paragraph::new().run(Run::new(format!("{channel} ({frequency} MHz)")).bold())
}

fn site_table(inspection: &Inspection) -> Table {
    let site = &inspection.site;
    Table::new()
        .field("Name:", or_default(site.transmitting_site_name.as_deref(), NOT_SPECIFIED))
        .field(
            "Coordinates:",
            format!(
                "{}\n{}",
                or_default(site.longitude.as_deref(), ""),
                or_default(site.latitude.as_deref(), "")
            ),
        )
        .field(
            "Elevation:",
            format!("{} M", or_default(site.altitude.as_deref(), NOT_SPECIFIED)),
        )
}

fn tower_table(inspection: &Inspection) -> Table {
    let tower = &inspection.tower;
    Table::new()
        .field(
            "Type:",
            tower.type_label().unwrap_or_else(|| NOT_SPECIFIED.to_string()),
        )
        .field(
            "Height:",
            format!("{}M", or_default(tower.height_above_ground.as_deref(), NOT_SPECIFIED)),
        )
}

fn equipment_table(
    manufacturer: Option<&str>,
    model: Option<&str>,
    serial: Option<&str>,
    nominal: Option<&str>,
    actual: Option<&str>,
) -> Table {
    Table::new()
        .field("Make:", or_default(manufacturer, NOT_SEEN))
        .field("Model:", or_default(model, NOT_SEEN))
        .field("Serial:", or_default(serial, NOT_SEEN))
        .field("Nominal Power:", format!("{} W", or_default(nominal, NOT_SEEN)))
        .field("Power Output:", format!("{} W", or_default(actual, NOT_SEEN)))
}

fn transmitter_section(doc: &mut DocxBuilder, ctx: &ReportContext<'_>) {
    let inspection = ctx.inspection;
    let television = inspection
        .station_type()
        .is_some_and(crate::model::StationType::is_television);

    if television {
        if let Some(table) = television_table(ctx) {
            doc.table(&table);
            return;
        }
    }

    let exciter = &inspection.transmitter.exciter;
    let amplifier = &inspection.transmitter.amplifier;
    doc.paragraph(Paragraph::new().run(Run::new("EXCITER").bold()));
    doc.table(&equipment_table(
        exciter.manufacturer.as_deref(),
        exciter.model_number.as_deref(),
        exciter.serial_number.as_deref(),
        exciter.nominal_power.as_deref(),
        exciter.actual_reading.as_deref(),
    ));
    doc.paragraph(Paragraph::new().run(Run::new("AMPLIFIER").bold()));
    doc.table(&equipment_table(
        amplifier.manufacturer.as_deref(),
        amplifier.model_number.as_deref(),
        amplifier.serial_number.as_deref(),
        amplifier.nominal_power.as_deref(),
        amplifier.actual_reading.as_deref(),
    ));
    doc.paragraph(Paragraph::new().run(
        Run::new(format!(
            "Frequency: {}",
            inspection.transmit_frequency().unwrap_or("Not Specified")
        ))
        .bold(),
    ));
    doc.blank_line();
}

/// One column per channel; `None` when no channel is known.
fn television_table(ctx: &ReportContext<'_>) -> Option<Table> {
    let inspection = ctx.inspection;
    let transmitter = &inspection.transmitter;
    let pick = |amplifier: &Option<String>, exciter: &Option<String>| {
        filled(amplifier.as_deref())
            .or_else(|| filled(exciter.as_deref()))
            .unwrap_or(NOT_SEEN)
            .to_string()
    };
    let make = pick(&transmitter.amplifier.manufacturer, &transmitter.exciter.manufacturer);
    let model = pick(&transmitter.amplifier.model_number, &transmitter.exciter.model_number);
    let serial = pick(&transmitter.amplifier.serial_number, &transmitter.exciter.serial_number);
    let nominal = pick(&transmitter.amplifier.nominal_power, &transmitter.exciter.nominal_power);

    // (label, frequency, power, gain)
    let channels: Vec<(String, String, String, String)> = if ctx.calculations.is_empty() {
        let frequency = inspection.transmit_frequency()?;
        vec![(
            "CH.1".to_string(),
            frequency.to_string(),
            inspection
                .forward_power_w()
                .map_or_else(|| "Unknown".to_string(), format_number),
            inspection
                .antenna
                .gain_dbd()
                .map_or_else(|| "11".to_string(), format_number),
        )]
    } else {
        ctx.calculations
            .iter()
            .map(|c| {
                (
                    c.channel_number.clone(),
                    c.frequency_mhz.clone(),
                    format_number(c.forward_power_w),
                    format_number(c.antenna_gain_dbd),
                )
            })
            .collect()
    };

    let repeat = |value: &str| {
        std::iter::once(String::new())
            .chain(channels.iter().map(|_| value.to_string()))
            .collect::<Vec<_>>()
    };
    let with_label = |label: &str, mut cells: Vec<String>| {
        cells[0] = label.to_string();
        cells
    };

    Some(
        Table::new()
            .header(
                std::iter::once("Channel Freq. (MHz)".to_string())
                    .chain(channels.iter().map(|(ch, freq, _, _)| format!("{ch}\n({freq} MHz)"))),
            )
            .row(with_label("Make:", repeat(&make)))
            .row(with_label("Model:", repeat(&model)))
            .row(with_label("S/No.:", repeat(&serial)))
            .row(with_label("Nominal Power (W):", repeat(&format!("{nominal} W"))))
            .row(
                std::iter::once("Power Output (W):".to_string())
                    .chain(channels.iter().map(|(_, _, power, _)| format!("{power} W"))),
            )
            .row(
                std::iter::once("Gain (dBd):".to_string())
                    .chain(channels.iter().map(|(_, _, _, gain)| format!("{gain} dBd"))),
            ),
    )
}

fn antenna_table(inspection: &Inspection) -> Table {
    let antenna = &inspection.antenna;
    Table::new()
        .field("Manufacturer:", or_default(antenna.manufacturer.as_deref(), NOT_SPECIFIED))
        .field("Model No.:", or_default(antenna.model_number.as_deref(), NOT_SPECIFIED))
        .field("Type:", or_default(antenna.antenna_type.as_deref(), NOT_SPECIFIED))
        .field(
            "Polarization:",
            antenna.polarization.map_or(NOT_SPECIFIED, |p| p.label()),
        )
        .field(
            "Gain:",
            format!("{} dBd", or_default(antenna.gain.as_deref(), NOT_SPECIFIED)),
        )
        .field(
            "Height on the Tower:",
            format!("{}M", or_default(antenna.height_on_tower.as_deref(), NOT_SPECIFIED)),
        )
}

fn filter_table(inspection: &Inspection) -> Table {
    let filter = &inspection.transmitter.filter;
    Table::new()
        .field("Manufacturer:", or_default(filter.manufacturer.as_deref(), NOT_SPECIFIED))
        .field("Model:", or_default(filter.model_number.as_deref(), NOT_SEEN))
        .field("S/No.:", or_default(filter.serial_number.as_deref(), NOT_SEEN))
        .field("Frequency:", or_default(filter.frequency.as_deref(), NOT_SPECIFIED))
}

fn stl_table(inspection: &Inspection) -> Table {
    let stl = &inspection.studio_link;
    Table::new()
        .field("Manufacturer:", or_default(stl.manufacturer.as_deref(), NOT_SPECIFIED))
        .field("Model:", or_default(stl.model_number.as_deref(), NOT_SEEN))
        .field("S/No.:", or_default(stl.serial_number.as_deref(), NOT_SEEN))
        .field("Frequency:", or_default(stl.frequency.as_deref(), NOT_SPECIFIED))
        .field(
            "Description of Signal Reception:",
            or_default(stl.signal_description.as_deref(), NOT_SPECIFIED),
        )
}

fn erp_result_text(input: &ErpInput, erp_dbw: f64, erp_kw: f64) -> String {
    format!(
        "ERP = 10log {}(W) + {} dBd - {} dB = {erp_dbw:.2} dBW ({erp_kw:.3} kW)",
        format_number(input.forward_power_w),
        format_number(input.antenna_gain_dbd),
        format_number(input.losses_db),
    )
}

fn erp_table(input: &ErpInput, erp_dbw: f64, erp_kw: f64) -> Table {
    Table::new()
        .field("Forward Power:", format!("{} W", format_number(input.forward_power_w)))
        .field("Antenna Gain:", format!("{} dBd", format_number(input.antenna_gain_dbd)))
        .field("Losses:", format!("{} dB", format_number(input.losses_db)))
        .field("ERP Calculation:", ERP_FORMULA)
        .field("Result:", erp_result_text(input, erp_dbw, erp_kw))
}

fn recorded_erp_table(
    inspection: &Inspection,
    erp_kw: Option<&str>,
    erp_dbw: Option<&str>,
) -> Table {
    let transmitter = &inspection.transmitter;
    let power = filled(transmitter.amplifier.actual_reading.as_deref())
        .or_else(|| filled(transmitter.exciter.actual_reading.as_deref()))
        .unwrap_or("Unknown");
    let losses = inspection
        .antenna
        .system_losses_db()
        .map_or_else(|| "1.5".to_string(), format_number);

    Table::new()
        .field("Forward Power:", format!("{power} W"))
        .field(
            "Antenna Gain:",
            format!("{} dBd", or_default(inspection.antenna.gain.as_deref(), "Unknown")),
        )
        .field("System Losses:", format!("{losses} dB"))
        .field("ERP Calculation:", ERP_FORMULA)
        .field(
            "Result (kW):",
            erp_kw.map_or_else(|| "Not calculated".to_string(), |kw| format!("{kw} kW")),
        )
        .field(
            "Result (dBW):",
            erp_dbw.map_or_else(|| "Not calculated".to_string(), |dbw| format!("{dbw} dBW")),
        )
}

fn labelled_row(
    label: &str,
    calcs: &[ErpCalculation],
    cell: impl Fn(&ErpCalculation) -> String,
) -> Vec<String> {
    std::iter::once(label.to_string())
        .chain(calcs.iter().map(cell))
        .collect()
}

fn multi_channel_erp_table(calcs: &[ErpCalculation]) -> Table {
    Table::new()
        .header(
            std::iter::once("CHANNEL".to_string())
                .chain(calcs.iter().map(|c| c.channel_number.clone())),
        )
        .row(labelled_row("Forward Power:", calcs, |c| {
            format!("{} W", format_number(c.forward_power_w))
        }))
        .row(labelled_row("Antenna Gain:", calcs, |c| {
            format!("{} dBd", format_number(c.antenna_gain_dbd))
        }))
        .row(labelled_row("Losses:", calcs, |c| {
            format!("{} dB", format_number(c.losses_db))
        }))
        .row(labelled_row("ERP Calculation:", calcs, |_| ERP_FORMULA.to_string()))
        .row(labelled_row("Result:", calcs, |c| {
            erp_result_text(&c.input(), c.erp_dbw, c.erp_kw)
        }))
}

#[cfg(test)]
mod tests {
    use std::io::{Cursor, Read};

    use chrono::NaiveDate;

    use super::*;
    use crate::docx::image::fixtures::png;
    use crate::model::{ReportType, StationType};
    use crate::violations::ViolationDetector;

    fn inspection() -> Inspection {
        let mut inspection =
            Inspection::new(NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(), "Jane Wanjiru");
        inspection.site.station_type = Some(StationType::Fm);
        inspection.site.transmitting_site_name = Some("Limuru Hill".to_string());
        inspection.administrative.contact_name = Some("Peter Otieno".to_string());
        inspection.transmitter.amplifier.actual_reading = Some("3000".to_string());
        inspection.transmitter.amplifier.transmit_frequency = Some("98.4".to_string());
        inspection.tower.has_lightning_protection = true;
        inspection.tower.is_electrically_grounded = true;
        inspection
    }

    fn report(inspection: &Inspection) -> InspectionReport {
        let mut report = InspectionReport::new(1, ReportType::FmRadio, "INSPECTION OF 98.4 MHZ");
        report.id = Some(1);
        report.reference_number = "CA/FSM/BC/007 Vol. II".to_string();
        report.violations = ViolationDetector::default().detect(inspection);
        report
    }

    fn assembler(root: &Path) -> DocumentAssembler {
        DocumentAssembler::new(ReportConfig::default(), RuleSet::default(), root)
    }

    fn document_xml(bytes: Vec<u8>) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive
            .by_name("word/document.xml")
            .unwrap()
            .read_to_string(&mut xml)
            .unwrap();
        xml
    }

    #[test]
    fn test_header_and_sections() {
        let dir = tempfile::tempdir().unwrap();
        let inspection = inspection();
        let report = report(&inspection);
        let ctx = ReportContext {
            report: &report,
            inspection: &inspection,
            broadcaster: None,
            calculations: &[],
            images: &[],
        };

        let xml = document_xml(
            assembler(dir.path())
                .assemble(&ctx, &GenerationOptions::default())
                .unwrap(),
        );
        assert!(xml.contains("CA/FSM/BC/007 Vol. II"));
        assert!(xml.contains("28th October 2024"));
        assert!(xml.contains("TO: D/MIRC"));
        assert!(xml.contains("PO/NR/MIRC"));
        assert!(xml.contains("RE: INSPECTION OF 98.4 MHZ"));
        assert!(xml.contains("in the presence of their representative Peter Otieno."));
        for heading in [
            "A. SITE",
            "B. MAST",
            "C. TRANSMITTER",
            "D. ANTENNA SYSTEM",
            "G. ERP CALCULATION",
            "I. CONCLUSION",
            "J. RECOMMENDATION",
        ] {
            assert!(xml.contains(heading), "missing {heading}");
        }
        assert!(!xml.contains("E. FILTER"));
        assert!(!xml.contains("F. STUDIO TO TRANSMITTER LINK"));
        assert!(!xml.contains("H. OBSERVATION"));
        assert!(xml.contains("EXCITER"));
        assert!(xml.contains("Authorized ERP: 10000 W (10 kW)"));
        assert!(xml.contains("AO/MIRC/NR"));
    }

    #[test]
    fn test_erp_computed_from_equipment() {
        let dir = tempfile::tempdir().unwrap();
        let inspection = inspection();
        let report = report(&inspection);
        let ctx = ReportContext {
            report: &report,
            inspection: &inspection,
            broadcaster: None,
            calculations: &[],
            images: &[],
        };
        let xml = document_xml(
            assembler(dir.path())
                .assemble(&ctx, &GenerationOptions::default())
                .unwrap(),
        );
        assert!(xml.contains("CH.1 (98.4 MHz)"));
        assert!(xml.contains("= 44.27 dBW (26.7"));
        assert!(xml.contains("The licensee is operating above the maximum authorized ERP limit"));
    }

    #[test]
    fn test_multi_channel_tables() {
        let dir = tempfile::tempdir().unwrap();
        let mut inspection = inspection();
        inspection.site.station_type = Some(StationType::Tv);
        let report = report(&inspection);
        let calculations: Vec<ErpCalculation> = [("CH.21", 300.0), ("CH.27", 3000.0)]
            .into_iter()
            .map(|(ch, power)| {
                ErpCalculation::compute(1, ch, "474", ErpInput::with_defaults(power), 10.0).unwrap()
            })
            .collect();
        let ctx = ReportContext {
            report: &report,
            inspection: &inspection,
            broadcaster: None,
            calculations: &calculations,
            images: &[],
        };

        let xml = document_xml(
            assembler(dir.path())
                .assemble(&ctx, &GenerationOptions::default())
                .unwrap(),
        );
        assert!(xml.contains("Channel Freq. (MHz)"));
        assert!(xml.contains("CHANNEL"));
        assert!(xml.contains("CH.27"));
        assert!(!xml.contains("EXCITER"));
        assert!(xml.contains("limit of 10kW for CH.27."));
    }

    #[test]
    fn test_images_inserted_and_missing_skipped() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("tower.png"), png(200, 100)).unwrap();
        std::fs::write(dir.path().join("broken.png"), b"not a png").unwrap();

        let inspection = inspection();
        let report = report(&inspection);
        let images = vec![
            ReportImage::new(1, ImageCategory::TowerMast, PathBuf::from("tower.png"), "Mast view"),
            ReportImage::new(1, ImageCategory::TowerMast, PathBuf::from("missing.png"), "Gone"),
            ReportImage::new(1, ImageCategory::FilterEquipment, PathBuf::from("broken.png"), "Filter"),
        ];
        let ctx = ReportContext {
            report: &report,
            inspection: &inspection,
            broadcaster: None,
            calculations: &[],
            images: &images,
        };

        let bytes = assembler(dir.path())
            .assemble(&ctx, &GenerationOptions::default())
            .unwrap();
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes.clone())).unwrap();
        assert!(archive.by_name("word/media/image1.png").is_ok());
        assert!(archive.by_name("word/media/image2.png").is_err());

        let xml = document_xml(bytes);
        assert!(xml.contains("Mast view"));
        assert!(!xml.contains("Gone"));
        assert!(xml.contains("E. FILTER"));

        let without = document_xml(
            assembler(dir.path())
                .assemble(
                    &ctx,
                    &GenerationOptions {
                        include_images: false,
                        ..GenerationOptions::default()
                    },
                )
                .unwrap(),
        );
        assert!(!without.contains("Mast view"));
    }

    #[test]
    fn test_custom_text_overrides() {
        let dir = tempfile::tempdir().unwrap();
        let inspection = inspection();
        let mut report = report(&inspection);
        report.conclusions = "• Stored conclusion".to_string();
        let ctx = ReportContext {
            report: &report,
            inspection: &inspection,
            broadcaster: None,
            calculations: &[],
            images: &[],
        };
        let options = GenerationOptions {
            custom_observations: Some("Rust on the mast\nFeeder loose".to_string()),
            custom_recommendations: Some("   ".to_string()),
            ..GenerationOptions::default()
        };

        let xml = document_xml(assembler(dir.path()).assemble(&ctx, &options).unwrap());
        assert!(xml.contains("H. OBSERVATION"));
        assert!(xml.contains("• Feeder loose"));
        assert!(xml.contains("• Stored conclusion"));
        assert!(xml.contains("tower rust protection"));
    }

    #[test]
    fn test_choose_skips_blank() {
        assert_eq!(choose(&[None, Some("  "), Some("b")]), Some("b"));
        assert_eq!(choose(&[None]), None);
    }
}
