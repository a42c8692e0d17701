//! Generated wording for reports: titles, dates, conclusions and
//! recommendations.

use chrono::{Datelike, NaiveDate};

use crate::erp::kw_to_dbw;
use crate::model::{filled, ErpCalculation, Inspection, StationType};
use crate::units::{format_number, round_to};
use crate::violations::{Violation, ViolationRule};

/// Report title derived from the station type, frequency and site.
#[must_use]
pub fn report_title(inspection: &Inspection, broadcaster: &str) -> String {
    let location = inspection.location_name().to_uppercase();
    let frequency = inspection.transmit_frequency().unwrap_or("UNKNOWN");
    match inspection.station_type() {
        Some(StationType::Fm) => {
            format!("INSPECTION OF {frequency} MHZ TRANSMITTER ({broadcaster}) IN {location}")
        }
        Some(StationType::Tv | StationType::Dtt) => {
            format!("INSPECTION OF {broadcaster} TV TRANSMITTER {frequency} IN {location}")
        }
        _ => format!("INSPECTION OF {broadcaster} TRANSMITTER IN {location}"),
    }
}

/// English ordinal suffix for a day of the month.
#[must_use]
pub fn ordinal_suffix(day: u32) -> &'static str {
    match (day % 10, day % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    }
}

/// Date as printed in letters, e.g. `28th October 2024`.
#[must_use]
pub fn ordinal_date(date: NaiveDate) -> String {
    format!(
        "{}{} {}",
        date.day(),
        ordinal_suffix(date.day()),
        date.format("%B %Y")
    )
}

/// Split stored narrative text into bullet items.
///
/// Leading bullet markers (`•`, `-`, `*`) are removed and blank lines dropped.
#[must_use]
pub fn bullet_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(|line| {
            line.trim()
                .trim_start_matches(['•', '-', '*'])
                .trim()
                .to_string()
        })
        .filter(|line| !line.is_empty())
        .collect()
}

/// Join bullet items back into stored narrative text.
#[must_use]
pub fn join_bullets(items: &[String]) -> String {
    items
        .iter()
        .map(|item| format!("• {item}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// What the generated conclusions and recommendations are based on.
#[derive(Debug, Clone, Copy)]
pub struct NarrativeInputs<'a> {
    /// Stored per-channel ERP rows.
    pub calculations: &'a [ErpCalculation],
    /// Stored findings.
    pub violations: &'a [Violation],
    /// Observations from the report or the inspection.
    pub observations: Option<&'a str>,
    /// Authorized ERP in kW.
    pub authorized_kw: f64,
}

impl NarrativeInputs<'_> {
    fn over_limit(&self) -> impl Iterator<Item = &ErpCalculation> {
        self.calculations.iter().filter(|calc| !calc.is_compliant)
    }

    fn erp_violation(&self) -> Option<&Violation> {
        self.violations
            .iter()
            .find(|v| matches!(v.rule, ViolationRule::ErpViolation { .. }))
    }

    fn non_approved_equipment(&self) -> Vec<String> {
        self.violations
            .iter()
            .filter_map(|v| match &v.rule {
                ViolationRule::TypeApprovalViolation {
                    equipment_type,
                    equipment_model,
                } => Some(format!("{equipment_type} {equipment_model}")),
                _ => None,
            })
            .collect()
    }

    fn safety_issues(&self) -> Vec<&str> {
        self.violations
            .iter()
            .filter(|v| matches!(v.rule, ViolationRule::SafetyViolation { .. }))
            .map(|v| v.description.as_str())
            .collect()
    }

    fn observation_mentions(&self, word: &str) -> bool {
        self.observations
            .and_then(|text| filled(Some(text)))
            .is_some_and(|text| text.to_lowercase().contains(word))
    }

    fn limit_label(&self) -> String {
        format!(
            "{} dBW ({} kW)",
            format_number(round_to(kw_to_dbw(self.authorized_kw), 2)),
            format_number(self.authorized_kw)
        )
    }
}

/// Conclusions generated from the findings.
#[must_use]
pub fn auto_conclusions(inputs: &NarrativeInputs<'_>) -> Vec<String> {
    let mut conclusions = Vec::new();
    let limit = inputs.limit_label();

    let mut any_channel = false;
    for calc in inputs.over_limit() {
        any_channel = true;
        conclusions.push(format!(
            "The licensee is operating above the maximum authorized ERP limit of {limit} by transmitting at {} kW ({}).",
            format_number(round_to(calc.erp_kw, 3)),
            calc.channel_number
        ));
    }
    if !any_channel {
        if let Some(ViolationRule::ErpViolation { measured_value, .. }) =
            inputs.erp_violation().map(|v| &v.rule)
        {
            conclusions.push(format!(
                "The licensee is operating above the maximum authorized ERP limit of {limit} by transmitting at {} kW.",
                format_number(*measured_value)
            ));
        }
    }

    let equipment = inputs.non_approved_equipment();
    if !equipment.is_empty() {
        conclusions.push(format!(
            "The licensee is operating non-type approved transmitter(s): {}.",
            equipment.join(", ")
        ));
    }

    let safety = inputs.safety_issues();
    if !safety.is_empty() {
        conclusions.push(format!(
            "The transmitter site has safety deficiencies: {}.",
            safety
                .iter()
                .map(|s| s.to_lowercase())
                .collect::<Vec<_>>()
                .join("; ")
        ));
    }

    if conclusions.is_empty() {
        conclusions.push("The station is operating within authorized parameters.".to_string());
    }
    conclusions
}

/// Recommendations generated from the findings.
#[must_use]
pub fn auto_recommendations(inputs: &NarrativeInputs<'_>) -> Vec<String> {
    let mut recommendations = Vec::new();
    let limit = format_number(inputs.authorized_kw);

    let channels: Vec<&str> = inputs
        .over_limit()
        .map(|calc| calc.channel_number.as_str())
        .collect();
    if !channels.is_empty() {
        recommendations.push(format!(
            "The licensee to be issued with notice of violation for exceeding authorized ERP limit of {limit}kW for {}.",
            channels.join(", ")
        ));
    } else if inputs.erp_violation().is_some() {
        recommendations.push(format!(
            "The licensee to be issued with notice of violation for exceeding authorized ERP limit of {limit}kW."
        ));
    }

    if !inputs.non_approved_equipment().is_empty() {
        recommendations.push(
            "The licensee to be issued with notice of violation for operating non-type approved transmitter equipment."
                .to_string(),
        );
    }

    if !inputs.safety_issues().is_empty() {
        recommendations.push(
            "The licensee should rectify the tower safety deficiencies noted above.".to_string(),
        );
    }

    if inputs.observation_mentions("rust") {
        recommendations.push("The licensee should address tower rust protection issues.".to_string());
    }
    if inputs.observation_mentions("filter") {
        recommendations
            .push("The licensee should ensure proper filter installation and maintenance.".to_string());
    }

    if recommendations.is_empty() {
        recommendations.push(
            "The licensee should continue to maintain the station within authorized parameters."
                .to_string(),
        );
    }
    recommendations
}
