//! Report workflow on top of storage.
//!
//! [`ReportService`] is what the CLI and the HTTP handlers call. It owns the
//! database, the media store and the compliance rules, and keeps the
//! multi-step operations (creating a report from an inspection, generating
//! its document) consistent.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::assembler::{DocumentAssembler, GenerationOptions, ReportContext};
use crate::config::Config;
use crate::erp::{ErpAssessment, ErpInput, ErpSummary};
use crate::error::{Error, Result};
use crate::media::MediaStore;
use crate::model::{
    filled, Broadcaster, ChannelInput, ErpCalculation, ImageCategory, ImagePosition, Inspection,
    InspectionReport, InspectionStatus, ReportImage, ReportStatus, ReportType, StationType,
};
use crate::narrative::{
    auto_conclusions, auto_recommendations, join_bullets, report_title, NarrativeInputs,
};
use crate::storage::{Storage, StorageStats};
use crate::validation::{
    validate_inspection, validate_report_data, FieldErrors, ReportDraft, ReportValidation,
};
use crate::violations::{RuleSet, ViolationDetector, ViolationSummary};

/// Output formats the service can produce.
pub const SUPPORTED_FORMATS: &[&str] = &["docx"];

/// Stateless ERP request; gaps are filled from the configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ErpRequest {
    /// Forward power in W.
    pub forward_power_w: f64,
    /// Antenna gain in dBd.
    pub antenna_gain_dbd: Option<f64>,
    /// Losses in dB.
    pub losses_db: Option<f64>,
    /// Limit to check against, in kW.
    pub authorized_kw: Option<f64>,
}

/// Result of [`ReportService::create_report_from_inspection`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportCreation {
    /// The new or existing report.
    pub report: InspectionReport,
    /// False when the inspection already had a report.
    pub created: bool,
    /// Number of findings on the report.
    pub violations_detected: usize,
}

/// One row written by a bulk calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalculatedChannel {
    /// The stored row.
    #[serde(flatten)]
    pub calculation: ErpCalculation,
    /// False when an existing row for the channel was replaced.
    pub created: bool,
}

/// A channel that could not be calculated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelError {
    /// Channel label as submitted.
    pub channel: String,
    /// What was wrong.
    pub error: String,
}

/// Outcome of a bulk calculation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BulkCalculation {
    /// Rows written, in input order.
    pub calculations: Vec<CalculatedChannel>,
    /// Channels that were skipped.
    pub errors: Vec<ChannelError>,
    /// Number of rows written.
    pub total_calculated: usize,
    /// Number of channels skipped.
    pub total_errors: usize,
}

/// One file of a bulk upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageUpload {
    /// Name the client gave the file.
    pub file_name: String,
    /// Declared MIME type.
    pub content_type: Option<String>,
    /// Category name; `other_equipment` when absent.
    pub category: Option<String>,
    /// Caption; the file stem when absent.
    pub caption: Option<String>,
    /// Placement name; `equipment_section` when absent.
    pub position: Option<String>,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl ImageUpload {
    fn default_caption(&self) -> String {
        Path::new(&self.file_name)
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

/// A stored upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    /// Identifier of the image record.
    pub id: Option<i64>,
    /// Name the client gave the file.
    pub filename: String,
    /// Category; serialized as `type`.
    #[serde(rename = "type")]
    pub category: ImageCategory,
    /// Caption as stored.
    pub caption: String,
    /// Placement in the document.
    pub position: ImagePosition,
    /// 1-based order among images of the same category.
    pub order_in_section: u32,
    /// Upload size in bytes.
    pub file_size: usize,
    /// Stored path relative to the media root.
    pub file_path: PathBuf,
}

/// A rejected upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadError {
    /// Name the client gave the file.
    pub filename: String,
    /// Why it was rejected.
    pub error: String,
}

/// Outcome of a bulk upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BulkUpload {
    /// Report the images belong to.
    pub report_id: i64,
    /// Files stored.
    pub uploaded_images: Vec<UploadedImage>,
    /// Files rejected.
    pub errors: Vec<UploadError>,
    /// Number of files stored.
    pub total_uploaded: usize,
    /// Number of files rejected.
    pub total_errors: usize,
}

/// A generated report document.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeneratedDocument {
    /// The report after generation.
    pub report: InspectionReport,
    /// Where the document was written.
    pub path: PathBuf,
    /// Formats produced.
    pub formats: Vec<String>,
    /// Images attached to the report.
    pub total_images: usize,
    /// Size of the document in bytes.
    pub size_bytes: usize,
    /// Conclusions printed in the document.
    pub conclusions: String,
    /// Recommendations printed in the document.
    pub recommendations: String,
}

/// What [`ReportService::write_document`] produced.
struct WrittenDocument {
    path: PathBuf,
    size_bytes: usize,
    total_images: usize,
    conclusions: String,
    recommendations: String,
}

/// Image checklist entry for one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequirement {
    /// The category.
    pub category: ImageCategory,
    /// Human-readable category name.
    pub label: &'static str,
    /// Whether this station type needs such an image.
    pub required: bool,
    /// Images already uploaded.
    pub count: u32,
}

impl ImageRequirement {
    /// Required and still missing.
    #[must_use]
    pub fn is_missing(&self) -> bool {
        self.required && self.count == 0
    }
}

/// Image checklist for a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageRequirements {
    /// Station type of the inspection.
    pub station_type: Option<StationType>,
    /// One entry per category.
    pub requirements: Vec<ImageRequirement>,
    /// Number of required categories.
    pub total_required: usize,
    /// Required categories with at least one image.
    pub total_completed: usize,
}

/// The report workflow.
#[derive(Debug)]
pub struct ReportService {
    storage: Storage,
    config: Config,
    detector: ViolationDetector,
    assembler: DocumentAssembler,
    media: MediaStore,
}

impl ReportService {
    /// Create a service over an open database.
    #[must_use]
    pub fn new(storage: Storage, config: Config) -> Self {
        let rules = RuleSet::from_config(&config.compliance);
        let assembler =
            DocumentAssembler::new(config.report.clone(), rules.clone(), config.media_dir());
        let media = MediaStore::new(config.media_dir(), config.uploads.clone());
        Self {
            storage,
            detector: ViolationDetector::new(rules),
            assembler,
            media,
            config,
        }
    }

    /// Open the configured database and create a service over it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened.
    pub fn open(config: Config) -> Result<Self> {
        let storage = Storage::open(config.database_path())?;
        Ok(Self::new(storage, config))
    }

    /// The configuration in use.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// The compliance rules in use.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        self.detector.rules()
    }

    /// Record counts.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn stats(&self) -> Result<StorageStats> {
        self.storage.stats()
    }

    // === Broadcasters ===

    /// Register a broadcaster.
    ///
    /// # Errors
    ///
    /// Returns a validation error if the name is blank.
    pub fn add_broadcaster(&self, broadcaster: &Broadcaster) -> Result<Broadcaster> {
        let mut errors = FieldErrors::default();
        if broadcaster.name.trim().is_empty() {
            errors.add("name", "This field is required.");
        }
        errors.into_result()?;
        self.storage.insert_broadcaster(broadcaster)
    }

    /// All broadcasters by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn broadcasters(&self) -> Result<Vec<Broadcaster>> {
        self.storage.list_broadcasters()
    }

    // === Inspections ===

    /// Validate and store a new inspection.
    ///
    /// # Errors
    ///
    /// Returns a validation error for invalid fields or an unknown
    /// broadcaster.
    pub fn create_inspection(&self, mut inspection: Inspection) -> Result<Inspection> {
        let broadcaster_check = self.check_broadcaster(&inspection);
        let field_check = validate_inspection(&mut inspection, None);
        merge_errors(broadcaster_check?, field_check)?;

        if inspection.status == InspectionStatus::Completed {
            inspection.completed_at = Some(Utc::now());
        }
        let stored = self.storage.insert_inspection(&inspection)?;
        info!(id = ?stored.id, form_number = ?stored.form_number, "Created inspection");
        Ok(stored)
    }

    /// Validate and replace a stored inspection.
    ///
    /// The completion time is set the first time the status becomes
    /// `completed` and kept afterwards.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id, or a validation error.
    pub fn update_inspection(&self, id: i64, mut inspection: Inspection) -> Result<Inspection> {
        let existing = self.inspection(id)?;
        let broadcaster_check = self.check_broadcaster(&inspection);
        let field_check = validate_inspection(&mut inspection, Some(&existing));
        merge_errors(broadcaster_check?, field_check)?;

        inspection.completed_at = existing.completed_at.or_else(|| {
            (inspection.status == InspectionStatus::Completed).then(Utc::now)
        });
        self.storage.update_inspection(id, &inspection)
    }

    /// Get an inspection.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub fn inspection(&self, id: i64) -> Result<Inspection> {
        self.storage
            .get_inspection(id)?
            .ok_or_else(|| Error::not_found("inspection", id))
    }

    /// Most recent inspections.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn inspections(&self, limit: usize) -> Result<Vec<Inspection>> {
        self.storage.list_inspections(limit)
    }

    fn check_broadcaster(&self, inspection: &Inspection) -> Result<FieldErrors> {
        let mut errors = FieldErrors::default();
        if let Some(id) = inspection.broadcaster_id {
            if self.storage.get_broadcaster(id)?.is_none() {
                errors.add("broadcaster_id", format!("Broadcaster {id} does not exist."));
            }
        }
        Ok(errors)
    }

    // === Reports ===

    /// Get a report.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown id.
    pub fn report(&self, id: i64) -> Result<InspectionReport> {
        self.storage
            .get_report(id)?
            .ok_or_else(|| Error::not_found("report", id))
    }

    /// Most recent reports.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn reports(&self, limit: usize) -> Result<Vec<InspectionReport>> {
        self.storage.list_reports(limit)
    }

    /// Stored ERP rows of a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn erp_calculations(&self, report_id: i64) -> Result<Vec<ErpCalculation>> {
        self.storage.erp_calculations(report_id)
    }

    /// Create the report for an inspection, or return the existing one.
    ///
    /// A new report gets its title, type, findings and, when a forward power
    /// was recorded, a `CH.1` ERP row.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown inspection.
    pub fn create_report_from_inspection(&self, inspection_id: i64) -> Result<ReportCreation> {
        let inspection = self.inspection(inspection_id)?;

        if let Some(report) = self.storage.report_for_inspection(inspection_id)? {
            debug!(inspection_id, report_id = ?report.id, "Report already exists");
            return Ok(ReportCreation {
                violations_detected: report.violations.len(),
                report,
                created: false,
            });
        }

        let broadcaster = self.broadcaster_name(&inspection)?;
        let mut report = InspectionReport::new(
            inspection_id,
            ReportType::for_station(inspection.station_type()),
            report_title(&inspection, &broadcaster),
        );
        let summary = self.detector.analyze(&inspection);
        report.violations = summary.violations;
        report.compliance_status = summary.compliance_status;

        let report = self.storage.insert_report(&report)?;
        let report_id = report
            .id
            .ok_or_else(|| Error::internal("stored report has no id"))?;

        let rules = self.rules();
        if let Some(input) = inspection.erp_input(rules.default_gain_dbd, rules.default_losses_db) {
            let calculation = ErpCalculation::compute(
                report_id,
                "CH.1",
                inspection.transmit_frequency().unwrap_or("Unknown"),
                input,
                rules.authorized_erp_kw,
            )?;
            self.storage.upsert_erp_calculation(&calculation)?;
        }

        info!(
            report_id,
            reference = %report.reference_number,
            compliance = %report.compliance_status,
            "Created report from inspection"
        );
        Ok(ReportCreation {
            violations_detected: report.violations.len(),
            report,
            created: true,
        })
    }

    /// Broadcaster record name, else the name on the form, else `Unknown`.
    fn broadcaster_name(&self, inspection: &Inspection) -> Result<String> {
        let record = match inspection.broadcaster_id {
            Some(id) => self.storage.get_broadcaster(id)?,
            None => None,
        };
        Ok(record
            .map(|b| b.name)
            .filter(|name| !name.trim().is_empty())
            .or_else(|| inspection.broadcaster_name().map(str::to_string))
            .unwrap_or_else(|| "Unknown".to_string()))
    }

    /// Re-run violation detection and store the findings on the report.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown report or inspection.
    pub fn analyze_violations(&self, report_id: i64) -> Result<ViolationSummary> {
        let mut report = self.report(report_id)?;
        let inspection = self.inspection(report.inspection_id)?;

        let summary = self.detector.analyze(&inspection);
        report.violations.clone_from(&summary.violations);
        report.compliance_status = summary.compliance_status;
        self.storage.update_report(&mut report)?;

        info!(
            report_id,
            total = summary.total_violations,
            major = summary.major_violations,
            "Analyzed violations"
        );
        Ok(summary)
    }

    /// Assemble and write the report document.
    ///
    /// Custom text in `options` is saved on the report. Conclusions and
    /// recommendations the report does not hold are generated from the
    /// current findings on every run and are not saved. On failure the
    /// report reverts to `draft` and the error is returned.
    ///
    /// # Errors
    ///
    /// Returns invalid-input when no supported format is requested,
    /// not-found for unknown records, or the generation error.
    pub fn generate_documents(
        &self,
        report_id: i64,
        options: &GenerationOptions,
    ) -> Result<GeneratedDocument> {
        let formats: Vec<String> = options
            .formats
            .iter()
            .map(|f| f.trim().to_ascii_lowercase())
            .filter(|f| SUPPORTED_FORMATS.contains(&f.as_str()))
            .collect();
        if formats.is_empty() {
            return Err(Error::invalid_input(
                "at least one valid format (docx) must be specified",
            ));
        }

        let mut report = self.report(report_id)?;
        let inspection = self.inspection(report.inspection_id)?;

        for (custom, stored) in [
            (&options.custom_observations, &mut report.observations),
            (&options.custom_conclusions, &mut report.conclusions),
            (&options.custom_recommendations, &mut report.recommendations),
        ] {
            if let Some(text) = filled(custom.as_deref()) {
                *stored = text.to_string();
            }
        }

        match self.write_document(&report, &inspection, options) {
            Ok(written) => {
                report.status = ReportStatus::Completed;
                report.generated_docx = Some(written.path.clone());
                report.date_completed = Some(Utc::now());
                self.storage.update_report(&mut report)?;
                info!(
                    report_id,
                    path = %written.path.display(),
                    size_bytes = written.size_bytes,
                    "Generated report document"
                );
                Ok(GeneratedDocument {
                    report,
                    path: written.path,
                    formats,
                    total_images: written.total_images,
                    size_bytes: written.size_bytes,
                    conclusions: written.conclusions,
                    recommendations: written.recommendations,
                })
            }
            Err(e) => {
                error!(report_id, error = %e, "Document generation failed");
                report.status = ReportStatus::Draft;
                if let Err(save_error) = self.storage.update_report(&mut report) {
                    warn!(report_id, error = %save_error, "Could not revert report to draft");
                }
                Err(e)
            }
        }
    }

    /// Assemble and write the document. Missing narrative is generated
    /// for the document only.
    fn write_document(
        &self,
        report: &InspectionReport,
        inspection: &Inspection,
        options: &GenerationOptions,
    ) -> Result<WrittenDocument> {
        let report_id = report
            .id
            .ok_or_else(|| Error::internal("report has no id"))?;
        let broadcaster = match inspection.broadcaster_id {
            Some(id) => self.storage.get_broadcaster(id)?,
            None => None,
        };
        let calculations = self.storage.erp_calculations(report_id)?;
        let images = self.storage.images_for_report(report_id)?;

        let observations = filled(Some(report.observations.as_str()))
            .or_else(|| inspection.observations())
            .map(str::to_string);
        let inputs = NarrativeInputs {
            calculations: &calculations,
            violations: &report.violations,
            observations: observations.as_deref(),
            authorized_kw: self.rules().authorized_erp_kw,
        };
        let mut rendered = report.clone();
        if rendered.conclusions.trim().is_empty() {
            rendered.conclusions = join_bullets(&auto_conclusions(&inputs));
        }
        if rendered.recommendations.trim().is_empty() {
            rendered.recommendations = join_bullets(&auto_recommendations(&inputs));
        }

        let context = ReportContext {
            report: &rendered,
            inspection,
            broadcaster: broadcaster.as_ref(),
            calculations: &calculations,
            images: &images,
        };
        let bytes = self.assembler.assemble(&context, options)?;

        let dir = self.config.output_dir();
        fs::create_dir_all(&dir).map_err(|source| Error::DirectoryCreate {
            path: dir.clone(),
            source,
        })?;
        let path = dir.join(report.document_file_name());
        fs::write(&path, &bytes)?;
        Ok(WrittenDocument {
            path,
            size_bytes: bytes.len(),
            total_images: images.len(),
            conclusions: rendered.conclusions,
            recommendations: rendered.recommendations,
        })
    }

    /// Location and download name of a report's generated document.
    ///
    /// # Errors
    ///
    /// Returns not-found if the report is unknown, was never generated, or
    /// its file is gone.
    pub fn document(&self, report_id: i64) -> Result<(PathBuf, String)> {
        let report = self.report(report_id)?;
        let path = report
            .generated_docx
            .clone()
            .filter(|path| path.exists())
            .ok_or_else(|| Error::not_found("document for report", report_id))?;
        Ok((path, report.document_file_name()))
    }

    // === ERP ===

    /// Calculate ERP without storing anything.
    ///
    /// # Errors
    ///
    /// Returns invalid-input for non-positive power or non-finite values.
    pub fn calculate_erp(&self, request: &ErpRequest) -> Result<ErpSummary> {
        let rules = self.rules();
        let input = ErpInput {
            forward_power_w: request.forward_power_w,
            antenna_gain_dbd: request.antenna_gain_dbd.unwrap_or(rules.default_gain_dbd),
            losses_db: request.losses_db.unwrap_or(rules.default_losses_db),
        };
        let authorized_kw = request.authorized_kw.unwrap_or(rules.authorized_erp_kw);
        if !authorized_kw.is_finite() || authorized_kw <= 0.0 {
            return Err(Error::invalid_input("authorized ERP must be greater than 0 kW"));
        }
        Ok(ErpAssessment::assess(input, authorized_kw)?.summary())
    }

    /// Calculate and store ERP rows for several channels of a report.
    ///
    /// Channels that fail are reported individually; the rest are stored.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown report.
    pub fn bulk_calculate(
        &self,
        report_id: i64,
        channels: &[ChannelInput],
    ) -> Result<BulkCalculation> {
        self.report(report_id)?;
        let authorized_kw = self.rules().authorized_erp_kw;

        let mut calculations = Vec::new();
        let mut errors = Vec::new();
        for channel in channels {
            let computed = ErpCalculation::compute(
                report_id,
                channel.channel_number.clone(),
                channel.frequency_mhz.clone(),
                channel.erp_input(),
                authorized_kw,
            );
            match computed {
                Ok(calculation) => {
                    let (calculation, created) = self.storage.upsert_erp_calculation(&calculation)?;
                    calculations.push(CalculatedChannel {
                        calculation,
                        created,
                    });
                }
                Err(e) if e.is_client_error() => {
                    debug!(channel = %channel.channel_number, error = %e, "Skipping channel");
                    errors.push(ChannelError {
                        channel: channel.channel_number.clone(),
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        Ok(BulkCalculation {
            total_calculated: calculations.len(),
            total_errors: errors.len(),
            calculations,
            errors,
        })
    }

    // === Images ===

    /// Store several images for a report.
    ///
    /// Each file is checked on its own; rejected files are listed in the
    /// result and the rest are stored.
    ///
    /// # Errors
    ///
    /// Returns not-found for an unknown report, or a database error.
    pub fn upload_images(&self, report_id: i64, uploads: Vec<ImageUpload>) -> Result<BulkUpload> {
        self.report(report_id)?;

        let mut uploaded_images = Vec::new();
        let mut errors = Vec::new();
        for upload in uploads {
            match self.store_upload(report_id, &upload) {
                Ok(image) => uploaded_images.push(image),
                Err(e)
                    if e.is_client_error()
                        || matches!(e, Error::Io(_) | Error::DirectoryCreate { .. }) =>
                {
                    warn!(report_id, file = %upload.file_name, error = %e, "Rejected upload");
                    errors.push(UploadError {
                        filename: upload.file_name,
                        error: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        info!(
            report_id,
            uploaded = uploaded_images.len(),
            rejected = errors.len(),
            "Processed image upload"
        );
        Ok(BulkUpload {
            report_id,
            total_uploaded: uploaded_images.len(),
            total_errors: errors.len(),
            uploaded_images,
            errors,
        })
    }

    fn store_upload(&self, report_id: i64, upload: &ImageUpload) -> Result<UploadedImage> {
        let category = match filled(upload.category.as_deref()) {
            Some(name) => name
                .parse::<ImageCategory>()
                .map_err(|_| Error::invalid_input(format!("Invalid image type: {name}")))?,
            None => ImageCategory::OtherEquipment,
        };
        let position = match filled(upload.position.as_deref()) {
            Some(name) => name
                .parse::<ImagePosition>()
                .map_err(|_| Error::invalid_input(format!("Invalid position: {name}")))?,
            None => ImagePosition::default(),
        };

        let stored = self
            .media
            .store(report_id, upload.content_type.as_deref(), &upload.bytes)?;
        let caption = filled(upload.caption.as_deref())
            .map_or_else(|| upload.default_caption(), str::to_string);

        let mut image = ReportImage::new(report_id, category, stored.relative_path, caption);
        image.position = position;
        image.order_in_section = self.storage.count_images(report_id, category)? + 1;
        let image = self.storage.insert_image(&image)?;

        Ok(UploadedImage {
            id: image.id,
            filename: upload.file_name.clone(),
            category,
            caption: image.caption,
            position,
            order_in_section: image.order_in_section,
            file_size: upload.bytes.len(),
            file_path: image.file_path,
        })
    }

    /// Images of a report.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn images(&self, report_id: i64) -> Result<Vec<ReportImage>> {
        self.storage.images_for_report(report_id)
    }

    /// Which image categories the report needs and how many it has.
    ///
    /// # Errors
    ///
    /// Returns not-found for unknown records.
    pub fn image_requirements(&self, report_id: i64) -> Result<ImageRequirements> {
        let report = self.report(report_id)?;
        let station_type = self.inspection(report.inspection_id)?.station_type();

        let requirements = ImageCategory::ALL
            .iter()
            .map(|&category| {
                Ok(ImageRequirement {
                    category,
                    label: category.label(),
                    required: category.is_required_for(station_type),
                    count: self.storage.count_images(report_id, category)?,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(ImageRequirements {
            station_type,
            total_required: requirements.iter().filter(|r| r.required).count(),
            total_completed: requirements
                .iter()
                .filter(|r| r.required && r.count > 0)
                .count(),
            requirements,
        })
    }

    // === Validation ===

    /// Check report data before generation.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    pub fn validate_report(&self, draft: &ReportDraft) -> Result<ReportValidation> {
        let inspection = match draft.inspection_id {
            Some(id) => self.storage.get_inspection(id)?,
            None => None,
        };
        let mut validation = validate_report_data(draft, inspection.as_ref());
        if let (Some(id), None) = (draft.inspection_id, &inspection) {
            validation.errors.push(format!("Inspection {id} does not exist"));
            validation.valid = false;
            validation.can_generate = false;
            validation.total_issues += 1;
        }
        Ok(validation)
    }
}

/// Combine broadcaster and field errors into one validation result.
fn merge_errors(
    mut errors: FieldErrors,
    fields: std::result::Result<(), FieldErrors>,
) -> Result<()> {
    if let Err(field_errors) = fields {
        errors.merge(field_errors);
    }
    Ok(errors.into_result()?)
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::config::StorageConfig;
    use crate::docx::image::fixtures::png;
    use crate::model::AirStatus;
    use crate::validation::OFF_AIR_REASON_PLACEHOLDER;

    fn service(dir: &std::path::Path) -> ReportService {
        let config = Config {
            storage: StorageConfig {
                database_path: None,
                media_dir: Some(dir.join("media")),
                output_dir: Some(dir.join("out")),
            },
            ..Config::default()
        };
        ReportService::new(Storage::open_in_memory().unwrap(), config)
    }

    fn fm_inspection() -> Inspection {
        let mut inspection =
            Inspection::new(NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(), "Jane Wanjiru");
        inspection.site.station_type = Some(StationType::Fm);
        inspection.site.transmitting_site_name = Some("Limuru Hill".to_string());
        inspection.transmitter.amplifier.actual_reading = Some("3000".to_string());
        inspection.transmitter.amplifier.transmit_frequency = Some("98.4".to_string());
        inspection.tower.has_lightning_protection = true;
        inspection.tower.is_electrically_grounded = true;
        inspection
    }

    fn report_for(service: &ReportService) -> InspectionReport {
        let inspection = service.create_inspection(fm_inspection()).unwrap();
        service
            .create_report_from_inspection(inspection.id.unwrap())
            .unwrap()
            .report
    }

    #[test]
    fn test_create_inspection_validates() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let mut draft = fm_inspection();
        draft.air_status = AirStatus::OffAir;
        let stored = service.create_inspection(draft).unwrap();
        assert_eq!(stored.off_air_reason.as_deref(), Some(OFF_AIR_REASON_PLACEHOLDER));
        assert!(stored.form_number.is_some());
        assert!(stored.completed_at.is_none());

        let mut invalid = fm_inspection();
        invalid.broadcaster_id = Some(99);
        invalid.administrative.contact_email = Some("nope".to_string());
        let err = service.create_inspection(invalid).unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("broadcaster_id").is_some());
        assert!(errors.get("contact_email").is_some());
    }

    #[test]
    fn test_completed_at_set_once() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let stored = service.create_inspection(fm_inspection()).unwrap();
        let id = stored.id.unwrap();

        let mut completed = stored.clone();
        completed.status = InspectionStatus::Completed;
        let first = service.update_inspection(id, completed.clone()).unwrap();
        let completed_at = first.completed_at.unwrap();

        let again = service.update_inspection(id, completed).unwrap();
        assert_eq!(again.completed_at, Some(completed_at));
    }

    #[test]
    fn test_report_from_inspection_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let broadcaster = service
            .add_broadcaster(&Broadcaster::new("Radio Citizen"))
            .unwrap();
        let mut inspection = fm_inspection();
        inspection.broadcaster_id = broadcaster.id;
        let inspection = service.create_inspection(inspection).unwrap();
        let id = inspection.id.unwrap();

        let first = service.create_report_from_inspection(id).unwrap();
        assert!(first.created);
        assert_eq!(first.report.reference_number, "CA/FSM/BC/001 Vol. II");
        assert_eq!(
            first.report.title,
            "INSPECTION OF 98.4 MHZ TRANSMITTER (Radio Citizen) IN LIMURU HILL"
        );
        assert_eq!(first.report.report_type, ReportType::FmRadio);
        assert!(first.violations_detected > 0);

        let report_id = first.report.id.unwrap();
        let calcs = service.erp_calculations(report_id).unwrap();
        assert_eq!(calcs.len(), 1);
        assert_eq!(calcs[0].channel_number, "CH.1");
        assert!(!calcs[0].is_compliant);

        let second = service.create_report_from_inspection(id).unwrap();
        assert!(!second.created);
        assert_eq!(second.report.id, Some(report_id));
        assert_eq!(service.reports(10).unwrap().len(), 1);
    }

    #[test]
    fn test_unknown_inspection_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        assert!(service
            .create_report_from_inspection(404)
            .unwrap_err()
            .is_not_found());
    }

    #[test]
    fn test_bulk_calculate_collects_errors() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report_id = report_for(&service).id.unwrap();

        let channels = vec![
            ChannelInput {
                channel_number: "CH.21".to_string(),
                forward_power_w: 300.0,
                ..ChannelInput::default()
            },
            ChannelInput {
                channel_number: "CH.27".to_string(),
                forward_power_w: 0.0,
                ..ChannelInput::default()
            },
            ChannelInput {
                forward_power_w: 500.0,
                ..ChannelInput::default()
            },
        ];
        let result = service.bulk_calculate(report_id, &channels).unwrap();
        assert_eq!(result.total_calculated, 2);
        assert_eq!(result.total_errors, 1);
        assert_eq!(result.errors[0].channel, "CH.27");
        assert!(result.calculations[0].created);
        // CH.1 existed from report creation.
        assert!(!result.calculations[1].created);
        assert!(result.calculations[1].calculation.is_compliant);
    }

    #[test]
    fn test_calculate_erp_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let summary = service
            .calculate_erp(&ErpRequest {
                forward_power_w: 3000.0,
                ..ErpRequest::default()
            })
            .unwrap();
        assert!((summary.erp_dbw - 44.27).abs() < 1e-9);
        assert!(!summary.is_compliant);

        assert!(service.calculate_erp(&ErpRequest::default()).is_err());
    }

    #[test]
    fn test_upload_images_and_requirements() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report_id = report_for(&service).id.unwrap();

        let upload = |name: &str, category: Option<&str>, bytes: Vec<u8>| ImageUpload {
            file_name: name.to_string(),
            content_type: Some("image/png".to_string()),
            category: category.map(str::to_string),
            bytes,
            ..ImageUpload::default()
        };
        let result = service
            .upload_images(
                report_id,
                vec![
                    upload("mast.png", Some("tower_mast"), png(20, 20)),
                    upload("mast2.png", Some("tower_mast"), png(30, 20)),
                    upload("odd.png", Some("cat_photo"), png(20, 20)),
                    upload("text.png", None, b"hello".to_vec()),
                ],
            )
            .unwrap();
        assert_eq!(result.total_uploaded, 2);
        assert_eq!(result.total_errors, 2);
        assert_eq!(result.uploaded_images[0].caption, "mast");
        assert_eq!(result.uploaded_images[1].order_in_section, 2);

        let requirements = service.image_requirements(report_id).unwrap();
        assert_eq!(requirements.total_required, 3);
        assert_eq!(requirements.total_completed, 1);
        let tower = requirements
            .requirements
            .iter()
            .find(|r| r.category == ImageCategory::TowerMast)
            .unwrap();
        assert_eq!(tower.count, 2);
        assert!(!tower.is_missing());
    }

    #[test]
    fn test_completing_off_air_draft_requires_reason() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());

        let mut draft = fm_inspection();
        draft.air_status = AirStatus::OffAir;
        let stored = service.create_inspection(draft).unwrap();
        let id = stored.id.unwrap();

        let mut update = stored.clone();
        update.status = InspectionStatus::Completed;
        update.off_air_reason = Some(String::new());
        let err = service.update_inspection(id, update).unwrap_err();
        let Error::Validation(errors) = err else {
            panic!("expected validation error");
        };
        assert!(errors.get("off_air_reason").is_some());
        assert_eq!(service.inspection(id).unwrap().status, InspectionStatus::Draft);

        let mut update = stored;
        update.status = InspectionStatus::Completed;
        update.off_air_reason = Some("Generator fault".to_string());
        let completed = service.update_inspection(id, update).unwrap();
        assert_eq!(completed.off_air_reason.as_deref(), Some("Generator fault"));
    }

    #[test]
    fn test_generate_and_locate_document() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report_id = report_for(&service).id.unwrap();

        assert!(service.document(report_id).unwrap_err().is_not_found());

        let generated = service
            .generate_documents(report_id, &GenerationOptions::default())
            .unwrap();
        assert_eq!(generated.report.status, ReportStatus::Completed);
        assert!(generated.report.date_completed.is_some());
        assert!(generated.conclusions.contains("operating above"));
        assert!(generated.report.conclusions.is_empty());
        assert!(generated.path.ends_with("CA_FSM_BC_001 Vol. II.docx"));

        let (path, name) = service.document(report_id).unwrap();
        assert_eq!(path, generated.path);
        assert_eq!(name, "CA_FSM_BC_001 Vol. II.docx");
    }

    #[test]
    fn test_regenerated_narrative_follows_erp_changes() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report = report_for(&service);
        let report_id = report.id.unwrap();

        let first = service
            .generate_documents(report_id, &GenerationOptions::default())
            .unwrap();
        assert!(first.conclusions.contains("26.738 kW (CH.1)"));

        let result = service
            .bulk_calculate(
                report_id,
                &[ChannelInput {
                    forward_power_w: 300.0,
                    ..ChannelInput::default()
                }],
            )
            .unwrap();
        assert_eq!(result.total_calculated, 1);
        let mut inspection = service.inspection(report.inspection_id).unwrap();
        inspection.transmitter.amplifier.actual_reading = Some("300".to_string());
        service
            .update_inspection(report.inspection_id, inspection)
            .unwrap();
        service.analyze_violations(report_id).unwrap();

        let second = service
            .generate_documents(report_id, &GenerationOptions::default())
            .unwrap();
        assert!(!second.conclusions.contains("operating above"));
        assert_ne!(second.recommendations, first.recommendations);
        assert!(service.report(report_id).unwrap().conclusions.is_empty());
    }

    #[test]
    fn test_custom_narrative_is_kept_across_generations() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report_id = report_for(&service).id.unwrap();
        let options = GenerationOptions {
            custom_conclusions: Some("Site inspected at night.".to_string()),
            ..GenerationOptions::default()
        };
        service.generate_documents(report_id, &options).unwrap();

        let again = service
            .generate_documents(report_id, &GenerationOptions::default())
            .unwrap();
        assert_eq!(again.conclusions, "Site inspected at night.");
        assert_eq!(again.report.conclusions, "Site inspected at night.");
        assert!(again.report.recommendations.is_empty());
        assert!(!again.recommendations.is_empty());
    }

    #[test]
    fn test_default_caption_keeps_inner_dots() {
        let upload = |name: &str| ImageUpload {
            file_name: name.to_string(),
            ..ImageUpload::default()
        };
        assert_eq!(upload("site.view.png").default_caption(), "site.view");
        assert_eq!(upload("tower.jpg").default_caption(), "tower");
        assert_eq!(upload("mast").default_caption(), "mast");
        assert_eq!(upload("").default_caption(), "");
    }

    #[test]
    fn test_generate_rejects_unknown_formats() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let report_id = report_for(&service).id.unwrap();
        let options = GenerationOptions {
            formats: vec!["pdf".to_string()],
            ..GenerationOptions::default()
        };
        let err = service.generate_documents(report_id, &options).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_generation_failure_reverts_to_draft() {
        let dir = tempfile::tempdir().unwrap();
        // Output directory path is occupied by a file.
        std::fs::write(dir.path().join("out"), b"").unwrap();
        let service = service(dir.path());
        let mut report = report_for(&service);
        report.status = ReportStatus::PendingReview;
        service.storage.update_report(&mut report).unwrap();
        let report_id = report.id.unwrap();

        assert!(service
            .generate_documents(report_id, &GenerationOptions::default())
            .is_err());
        assert_eq!(service.report(report_id).unwrap().status, ReportStatus::Draft);
    }

    #[test]
    fn test_validate_report_unknown_inspection() {
        let dir = tempfile::tempdir().unwrap();
        let service = service(dir.path());
        let draft = ReportDraft {
            inspection_id: Some(77),
            report_type: Some("fm_radio".to_string()),
            title: Some("Report".to_string()),
            erp_calculations: Vec::new(),
        };
        let validation = service.validate_report(&draft).unwrap();
        assert!(!validation.valid);
        assert_eq!(validation.errors, vec!["Inspection 77 does not exist".to_string()]);
    }
}
