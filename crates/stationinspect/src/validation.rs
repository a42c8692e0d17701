//! Field validation for inspections and pre-generation checks for reports.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::model::{filled, AirStatus, ChannelInput, Inspection, InspectionStatus, ReportType};

/// Message attached to `off_air_reason` when it is required but missing.
pub const OFF_AIR_REASON_REQUIRED: &str = "This field is required when station is OFF AIR.";

/// Stored in place of a missing off-air reason while the form is a draft.
pub const OFF_AIR_REASON_PLACEHOLDER: &str = "Pending completion";

/// Field name to messages.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    /// Record a message against a field.
    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    /// Take over every message of `other`.
    pub fn merge(&mut self, other: FieldErrors) {
        for (field, messages) in other.0 {
            self.0.entry(field).or_default().extend(messages);
        }
    }

    /// Whether nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages for one field.
    #[must_use]
    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(Vec::as_slice)
    }

    /// `Ok(())` when empty, otherwise `Err(self)`.
    ///
    /// # Errors
    ///
    /// Returns `self` if any field has messages.
    pub fn into_result(self) -> std::result::Result<(), Self> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl std::fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

fn email_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("Invalid email pattern"))
}

/// A reason actually given; the placeholder counts as none.
fn off_air_reason(reason: Option<&str>) -> Option<&str> {
    filled(reason).filter(|r| *r != OFF_AIR_REASON_PLACEHOLDER)
}

/// Validate a submitted inspection, normalizing the off-air reason.
///
/// `existing` is the stored version when updating. For an off-air station
/// without a reason, a stored reason is kept; a draft gets
/// [`OFF_AIR_REASON_PLACEHOLDER`]; a final submission is rejected.
///
/// # Errors
///
/// Returns the field messages when the submission is invalid. The
/// submission may have been partially normalized.
pub fn validate_inspection(
    submitted: &mut Inspection,
    existing: Option<&Inspection>,
) -> std::result::Result<(), FieldErrors> {
    let mut errors = FieldErrors::default();

    if submitted.air_status == AirStatus::OffAir
        && off_air_reason(submitted.off_air_reason.as_deref()).is_none()
    {
        let stored = existing.and_then(|e| off_air_reason(e.off_air_reason.as_deref()));
        if let Some(reason) = stored {
            debug!("Keeping stored off-air reason");
            submitted.off_air_reason = Some(reason.to_string());
        } else if submitted.has_final_data() {
            errors.add("off_air_reason", OFF_AIR_REASON_REQUIRED);
        } else {
            submitted.off_air_reason = Some(OFF_AIR_REASON_PLACEHOLDER.to_string());
        }
    }

    if let Some(email) = filled(submitted.administrative.contact_email.as_deref()) {
        if !email_pattern().is_match(email) {
            errors.add("contact_email", "Enter a valid email address.");
        }
    }

    if let Some(year) = filled(submitted.tower.installation_year.as_deref()) {
        if year.len() != 4 || !year.bytes().all(|b| b.is_ascii_digit()) {
            errors.add("installation_year", "Enter a four-digit year.");
        }
    }

    if submitted.status == InspectionStatus::Completed && submitted.inspector_name.trim().is_empty()
    {
        errors.add("inspector_name", "This field is required.");
    }

    errors.into_result()
}

/// Report fields submitted for a pre-generation check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportDraft {
    /// Inspection the report documents.
    pub inspection_id: Option<i64>,
    /// Report type as submitted.
    pub report_type: Option<String>,
    /// Report title.
    pub title: Option<String>,
    /// Channels that will be calculated.
    pub erp_calculations: Vec<ChannelInput>,
}

/// Outcome of a pre-generation check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportValidation {
    /// No errors.
    pub valid: bool,
    /// Problems that block generation.
    pub errors: Vec<String>,
    /// Gaps that make the document less useful.
    pub warnings: Vec<String>,
    /// Same as `valid`.
    pub can_generate: bool,
    /// Errors plus warnings.
    pub total_issues: usize,
}

/// Check report data and its inspection before generating a document.
#[must_use]
pub fn validate_report_data(draft: &ReportDraft, inspection: Option<&Inspection>) -> ReportValidation {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if draft.inspection_id.is_none() {
        errors.push("Missing required field: inspection_id".to_string());
    }
    match filled(draft.report_type.as_deref()) {
        None => errors.push("Missing required field: report_type".to_string()),
        Some(text) if text.parse::<ReportType>().is_err() => {
            errors.push(format!("Unknown report type: {text}"));
        }
        Some(_) => {}
    }
    if filled(draft.title.as_deref()).is_none() {
        errors.push("Missing required field: title".to_string());
    }

    for (index, channel) in draft.erp_calculations.iter().enumerate() {
        if channel.forward_power_w.is_nan() || channel.forward_power_w <= 0.0 {
            errors.push(format!(
                "ERP calculation {}: Forward power must be greater than 0",
                index + 1
            ));
        }
    }

    if let Some(inspection) = inspection {
        if filled(inspection.site.transmitting_site_name.as_deref()).is_none() {
            warnings.push("Missing transmitting site name".to_string());
        }
        if inspection.forward_power_w().is_none() {
            warnings.push("Missing amplifier power reading".to_string());
        }
        if inspection.antenna.gain_dbd().is_none() {
            warnings.push("Missing antenna gain information".to_string());
        }
        if filled(inspection.administrative.contact_name.as_deref()).is_none() {
            warnings.push("Missing contact person information".to_string());
        }
    }

    let valid = errors.is_empty();
    ReportValidation {
        valid,
        can_generate: valid,
        total_issues: errors.len() + warnings.len(),
        errors,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn off_air_draft() -> Inspection {
        let mut inspection =
            Inspection::new(NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(), "Inspector");
        inspection.air_status = AirStatus::OffAir;
        inspection
    }

    #[test]
    fn test_off_air_draft_gets_placeholder() {
        let mut inspection = off_air_draft();
        validate_inspection(&mut inspection, None).unwrap();
        assert_eq!(
            inspection.off_air_reason.as_deref(),
            Some(OFF_AIR_REASON_PLACEHOLDER)
        );
    }

    #[test]
    fn test_off_air_completed_without_reason_rejected() {
        let mut inspection = off_air_draft();
        inspection.status = InspectionStatus::Completed;
        inspection.off_air_reason = Some("   ".to_string());

        let errors = validate_inspection(&mut inspection, None).unwrap_err();
        assert_eq!(
            errors.get("off_air_reason"),
            Some([OFF_AIR_REASON_REQUIRED.to_string()].as_slice())
        );
    }

    #[test]
    fn test_off_air_with_observations_rejected() {
        let mut inspection = off_air_draft();
        inspection.final_info.other_observations = Some("Transmitter removed".to_string());
        assert!(validate_inspection(&mut inspection, None).is_err());
    }

    #[test]
    fn test_off_air_keeps_stored_reason() {
        let mut stored = off_air_draft();
        stored.off_air_reason = Some("Power outage".to_string());

        let mut update = off_air_draft();
        update.status = InspectionStatus::Completed;
        validate_inspection(&mut update, Some(&stored)).unwrap();
        assert_eq!(update.off_air_reason.as_deref(), Some("Power outage"));
    }

    #[test]
    fn test_off_air_placeholder_is_not_a_reason() {
        let mut stored = off_air_draft();
        validate_inspection(&mut stored, None).unwrap();

        let mut update = off_air_draft();
        update.status = InspectionStatus::Completed;
        let errors = validate_inspection(&mut update, Some(&stored)).unwrap_err();
        assert!(errors.get("off_air_reason").is_some());

        let mut echoed = off_air_draft();
        echoed.status = InspectionStatus::Completed;
        echoed.off_air_reason = Some(OFF_AIR_REASON_PLACEHOLDER.to_string());
        assert!(validate_inspection(&mut echoed, Some(&stored)).is_err());
    }

    #[test]
    fn test_on_air_needs_no_reason() {
        let mut inspection = off_air_draft();
        inspection.air_status = AirStatus::OnAir;
        inspection.status = InspectionStatus::Completed;
        validate_inspection(&mut inspection, None).unwrap();
        assert!(inspection.off_air_reason.is_none());
    }

    #[test]
    fn test_invalid_email_and_year() {
        let mut inspection = off_air_draft();
        inspection.air_status = AirStatus::OnAir;
        inspection.administrative.contact_email = Some("not-an-email".to_string());
        inspection.tower.installation_year = Some("98".to_string());

        let errors = validate_inspection(&mut inspection, None).unwrap_err();
        assert!(errors.get("contact_email").is_some());
        assert!(errors.get("installation_year").is_some());
        assert!(errors.to_string().contains("contact_email"));
    }

    #[test]
    fn test_field_errors_json() {
        let mut errors = FieldErrors::default();
        errors.add("off_air_reason", OFF_AIR_REASON_REQUIRED);
        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["off_air_reason"][0], OFF_AIR_REASON_REQUIRED);
    }

    #[test]
    fn test_validate_report_data_missing_fields() {
        let draft = ReportDraft {
            erp_calculations: vec![ChannelInput::default()],
            ..ReportDraft::default()
        };
        let result = validate_report_data(&draft, None);
        assert!(!result.valid);
        assert!(!result.can_generate);
        assert_eq!(result.errors.len(), 4);
        assert!(result.errors[3].contains("Forward power must be greater than 0"));
    }

    #[test]
    fn test_validate_report_data_warnings() {
        let draft = ReportDraft {
            inspection_id: Some(1),
            report_type: Some("fm_radio".to_string()),
            title: Some("INSPECTION".to_string()),
            erp_calculations: Vec::new(),
        };
        let inspection = off_air_draft();
        let result = validate_report_data(&draft, Some(&inspection));
        assert!(result.valid);
        assert_eq!(result.warnings.len(), 4);
        assert_eq!(result.total_issues, 4);
    }

    #[test]
    fn test_validate_report_data_unknown_type() {
        let draft = ReportDraft {
            inspection_id: Some(1),
            report_type: Some("satellite".to_string()),
            title: Some("INSPECTION".to_string()),
            erp_calculations: Vec::new(),
        };
        let result = validate_report_data(&draft, None);
        assert_eq!(result.errors, vec!["Unknown report type: satellite".to_string()]);
    }
}
