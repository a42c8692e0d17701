//! Inspection reports, per-channel ERP rows and report images.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::StationType;
use crate::erp::{ErpAssessment, ErpInput, DEFAULT_ANTENNA_GAIN_DBD, DEFAULT_LOSSES_DB};
use crate::error::Result;
use crate::violations::{ComplianceStatus, Violation};

/// Kind of report, derived from the station type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportType {
    /// FM radio inspection.
    #[default]
    FmRadio,
    /// Television inspection.
    TvBroadcast,
    /// AM radio inspection.
    AmRadio,
}

string_enum!(ReportType {
    FmRadio => "fm_radio",
    TvBroadcast => "tv_broadcast",
    AmRadio => "am_radio",
});

impl ReportType {
    /// Map a station type; unknown or radio-like services default to FM.
    #[must_use]
    pub fn for_station(station_type: Option<StationType>) -> Self {
        match station_type {
            Some(StationType::Tv | StationType::Dtt) => Self::TvBroadcast,
            Some(StationType::Am) => Self::AmRadio,
            Some(StationType::Fm | StationType::Dab) | None => Self::FmRadio,
        }
    }
}

/// Report workflow state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Editable; also the state after a failed generation.
    #[default]
    Draft,
    /// Awaiting review.
    PendingReview,
    /// Document generated.
    Completed,
    /// No longer active.
    Archived,
}

string_enum!(ReportStatus {
    Draft => "draft",
    PendingReview => "pending_review",
    Completed => "completed",
    Archived => "archived",
});

/// An inspection report and its narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InspectionReport {
    /// Identifier assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// The inspection this report documents.
    pub inspection_id: i64,
    /// Report kind.
    pub report_type: ReportType,
    /// Workflow state.
    pub status: ReportStatus,
    /// `RE:` line of the letter.
    pub title: String,
    /// `CA/FSM/BC/{NNN} Vol. II`, assigned on insert.
    pub reference_number: String,
    /// Free-text findings.
    pub findings: String,
    /// Observation lines.
    pub observations: String,
    /// Conclusion lines; generated when empty.
    pub conclusions: String,
    /// Recommendation lines; generated when empty.
    pub recommendations: String,
    /// Findings from the last violation analysis.
    pub violations: Vec<Violation>,
    /// Summary of `violations`.
    pub compliance_status: ComplianceStatus,
    /// Path of the last generated document.
    pub generated_docx: Option<PathBuf>,
    /// When the record was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// When a document was last generated successfully.
    pub date_completed: Option<DateTime<Utc>>,
}

impl InspectionReport {
    /// Create a draft report for an inspection.
    #[must_use]
    pub fn new(inspection_id: i64, report_type: ReportType, title: impl Into<String>) -> Self {
        Self {
            inspection_id,
            report_type,
            title: title.into(),
            ..Self::default()
        }
    }

    /// File name of the generated document.
    ///
    /// Reference numbers contain `/`, which is replaced by `_`.
    #[must_use]
    pub fn document_file_name(&self) -> String {
        format!("{}.docx", self.reference_number.replace('/', "_"))
    }
}

/// Stored ERP calculation for one channel of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErpCalculation {
    /// Identifier assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning report.
    pub report_id: i64,
    /// Channel label, e.g. `CH.1`; unique per report.
    pub channel_number: String,
    /// Channel frequency as recorded.
    pub frequency_mhz: String,
    /// Forward power in W.
    pub forward_power_w: f64,
    /// Antenna gain in dB.
    pub antenna_gain_dbd: f64,
    /// Losses in dB.
    pub losses_db: f64,
    /// ERP in dBW.
    pub erp_dbw: f64,
    /// ERP in kW.
    pub erp_kw: f64,
    /// Authorized limit in kW.
    pub authorized_erp_kw: f64,
    /// Whether `erp_kw` is within the limit.
    pub is_compliant: bool,
    /// Excess over the limit in kW.
    pub excess_power_kw: f64,
}

impl ErpCalculation {
    /// Calculate a channel's ERP against `authorized_kw`.
    ///
    /// # Errors
    ///
    /// Returns an invalid-input error for non-positive forward power.
    pub fn compute(
        report_id: i64,
        channel_number: impl Into<String>,
        frequency_mhz: impl Into<String>,
        input: ErpInput,
        authorized_kw: f64,
    ) -> Result<Self> {
        let assessment = ErpAssessment::assess(input, authorized_kw)?;
        Ok(Self {
            id: None,
            report_id,
            channel_number: channel_number.into(),
            frequency_mhz: frequency_mhz.into(),
            forward_power_w: input.forward_power_w,
            antenna_gain_dbd: input.antenna_gain_dbd,
            losses_db: input.losses_db,
            erp_dbw: assessment.result.erp_dbw,
            erp_kw: assessment.result.erp_kw,
            authorized_erp_kw: authorized_kw,
            is_compliant: assessment.compliance.is_compliant,
            excess_power_kw: assessment.compliance.excess_kw,
        })
    }

    /// The inputs this row was computed from.
    #[must_use]
    pub fn input(&self) -> ErpInput {
        ErpInput {
            forward_power_w: self.forward_power_w,
            antenna_gain_dbd: self.antenna_gain_dbd,
            losses_db: self.losses_db,
        }
    }
}

/// One channel submitted for calculation; gaps are filled with defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelInput {
    /// Channel label, default `CH.1`.
    pub channel_number: String,
    /// Frequency as recorded, default `Unknown`.
    pub frequency_mhz: String,
    /// Forward power in W; must be positive.
    pub forward_power_w: f64,
    /// Antenna gain in dB.
    pub antenna_gain_dbd: f64,
    /// Losses in dB.
    pub losses_db: f64,
}

impl Default for ChannelInput {
    fn default() -> Self {
        Self {
            channel_number: "CH.1".to_string(),
            frequency_mhz: "Unknown".to_string(),
            forward_power_w: 0.0,
            antenna_gain_dbd: DEFAULT_ANTENNA_GAIN_DBD,
            losses_db: DEFAULT_LOSSES_DB,
        }
    }
}

impl ChannelInput {
    /// The ERP inputs of this channel.
    #[must_use]
    pub fn erp_input(&self) -> ErpInput {
        ErpInput {
            forward_power_w: self.forward_power_w,
            antenna_gain_dbd: self.antenna_gain_dbd,
            losses_db: self.losses_db,
        }
    }
}

/// What a report image shows; decides the section it is printed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageCategory {
    /// Overview of the site.
    SiteOverview,
    /// Tower or mast.
    TowerMast,
    /// Transmitter rack and equipment.
    TransmitterEquipment,
    /// Antenna system.
    Antenna,
    /// Studio-to-transmitter link equipment.
    StudioTransmitterLink,
    /// Filter.
    FilterEquipment,
    /// Anything else.
    #[default]
    OtherEquipment,
}

string_enum!(ImageCategory {
    SiteOverview => "site_overview",
    TowerMast => "tower_mast",
    TransmitterEquipment => "transmitter_equipment",
    Antenna => "antenna",
    StudioTransmitterLink => "studio_transmitter_link",
    FilterEquipment => "filter_equipment",
    OtherEquipment => "other_equipment",
});

impl ImageCategory {
    /// Human-readable name.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::SiteOverview => "Site Overview",
            Self::TowerMast => "Tower/Mast",
            Self::TransmitterEquipment => "Transmitter Equipment",
            Self::Antenna => "Antenna System",
            Self::StudioTransmitterLink => "Studio Transmitter Link",
            Self::FilterEquipment => "Filter Equipment",
            Self::OtherEquipment => "Other Equipment",
        }
    }

    /// Whether a report for this kind of station needs such an image.
    #[must_use]
    pub fn is_required_for(self, station_type: Option<StationType>) -> bool {
        match self {
            Self::TowerMast | Self::TransmitterEquipment | Self::Antenna => true,
            Self::FilterEquipment => station_type.is_some_and(StationType::is_television),
            Self::SiteOverview | Self::StudioTransmitterLink | Self::OtherEquipment => false,
        }
    }
}

/// Where an image is placed in the document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImagePosition {
    /// Top of the report.
    Header,
    /// With the site details.
    SiteSection,
    /// With the tower details.
    TowerSection,
    /// With the transmitter details.
    TransmitterSection,
    /// With the antenna details.
    AntennaSection,
    /// With the equipment photographs.
    #[default]
    EquipmentSection,
    /// With the observations.
    ObservationsSection,
    /// With the conclusions.
    ConclusionSection,
}

string_enum!(ImagePosition {
    Header => "header",
    SiteSection => "site_section",
    TowerSection => "tower_section",
    TransmitterSection => "transmitter_section",
    AntennaSection => "antenna_section",
    EquipmentSection => "equipment_section",
    ObservationsSection => "observations_section",
    ConclusionSection => "conclusion_section",
});

/// Horizontal alignment of an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImageAlignment {
    /// Left aligned.
    Left,
    /// Centered.
    #[default]
    Center,
    /// Right aligned.
    Right,
}

string_enum!(ImageAlignment {
    Left => "left",
    Center => "center",
    Right => "right",
});

/// An uploaded photograph attached to a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportImage {
    /// Identifier assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// Owning report.
    pub report_id: i64,
    /// What the image shows.
    #[serde(rename = "image_type")]
    pub category: ImageCategory,
    /// Stored file.
    pub file_path: PathBuf,
    /// Caption printed under the image.
    pub caption: String,
    /// Longer description.
    pub description: Option<String>,
    /// Placement hint.
    pub position: ImagePosition,
    /// 1-based order among images of the same category.
    pub order_in_section: u32,
    /// Width as a percentage of the text width.
    pub width_percentage: u32,
    /// Horizontal alignment.
    pub alignment: ImageAlignment,
    /// When the file was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uploaded_at: Option<DateTime<Utc>>,
}

impl ReportImage {
    /// Default printed width, percent of the text width.
    pub const DEFAULT_WIDTH_PERCENTAGE: u32 = 80;

    /// Create an image record with default placement.
    #[must_use]
    pub fn new(
        report_id: i64,
        category: ImageCategory,
        file_path: PathBuf,
        caption: impl Into<String>,
    ) -> Self {
        Self {
            id: None,
            report_id,
            category,
            file_path,
            caption: caption.into(),
            description: None,
            position: ImagePosition::default(),
            order_in_section: 1,
            width_percentage: Self::DEFAULT_WIDTH_PERCENTAGE,
            alignment: ImageAlignment::default(),
            uploaded_at: None,
        }
    }
}
