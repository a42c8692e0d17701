//! Rule-based violation detection over an inspection.
//!
//! Each [`ComplianceCheck`] looks at one concern and reports zero or more
//! [`Violation`]s. Checks are independent of each other and of their order;
//! [`ViolationDetector`] runs the standard set and concatenates the results.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::ComplianceConfig;
use crate::erp::ErpAssessment;
use crate::model::{filled, Inspection};
use crate::units::{format_number, round_to};

/// How serious a finding is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Needs correction but does not make the station non-compliant on its own.
    Minor,
    /// Breach of license conditions.
    Major,
}

/// Safety feature a tower lacks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SafetyCategory {
    /// No lightning arrestor.
    LightningProtection,
    /// Tower not earthed.
    Grounding,
    /// Tall tower without an aviation obstruction light.
    AviationWarning,
}

/// The rule that was broken, with its measurements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ViolationRule {
    /// ERP above the authorized limit.
    ErpViolation {
        /// Measured ERP in kW.
        measured_value: f64,
        /// Authorized ERP in kW.
        authorized_value: f64,
        /// Excess in kW.
        excess: f64,
    },
    /// Equipment without type approval.
    TypeApprovalViolation {
        /// `exciter` or `amplifier`.
        equipment_type: String,
        /// Manufacturer and model as recorded.
        equipment_model: String,
    },
    /// Missing safety feature.
    SafetyViolation {
        /// Which feature is missing.
        safety_category: SafetyCategory,
    },
}

/// A single finding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    /// Rule and measurements; serialized inline with a `type` tag.
    #[serde(flatten)]
    pub rule: ViolationRule,
    /// How serious it is.
    pub severity: Severity,
    /// Sentence for people.
    pub description: String,
}

impl Violation {
    /// The `type` tag, e.g. `ERP_VIOLATION`.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self.rule {
            ViolationRule::ErpViolation { .. } => "ERP_VIOLATION",
            ViolationRule::TypeApprovalViolation { .. } => "TYPE_APPROVAL_VIOLATION",
            ViolationRule::SafetyViolation { .. } => "SAFETY_VIOLATION",
        }
    }

    /// Whether this is a major finding.
    #[must_use]
    pub fn is_major(&self) -> bool {
        self.severity == Severity::Major
    }
}

/// Overall verdict for a report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplianceStatus {
    /// Nothing found.
    #[default]
    Compliant,
    /// Only minor findings.
    MinorViolations,
    /// At least one major finding.
    MajorViolations,
    /// Set by reviewers; never derived automatically.
    NonCompliant,
}

crate::model::string_enum!(ComplianceStatus {
    Compliant => "compliant",
    MinorViolations => "minor_violations",
    MajorViolations => "major_violations",
    NonCompliant => "non_compliant",
});

impl ComplianceStatus {
    /// Derive the verdict from a set of findings.
    #[must_use]
    pub fn from_violations(violations: &[Violation]) -> Self {
        if violations.is_empty() {
            Self::Compliant
        } else if violations.iter().any(Violation::is_major) {
            Self::MajorViolations
        } else {
            Self::MinorViolations
        }
    }
}

/// Counts and verdict for a set of findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationSummary {
    /// The findings.
    pub violations: Vec<Violation>,
    /// Derived verdict.
    pub compliance_status: ComplianceStatus,
    /// Number of findings.
    pub total_violations: usize,
    /// Number of major findings.
    pub major_violations: usize,
    /// Number of minor findings.
    pub minor_violations: usize,
}

impl ViolationSummary {
    /// Summarize a set of findings.
    #[must_use]
    pub fn new(violations: Vec<Violation>) -> Self {
        let major = violations.iter().filter(|v| v.is_major()).count();
        Self {
            compliance_status: ComplianceStatus::from_violations(&violations),
            total_violations: violations.len(),
            major_violations: major,
            minor_violations: violations.len() - major,
            violations,
        }
    }
}

/// Thresholds and lists the checks apply.
#[derive(Debug, Clone, PartialEq)]
pub struct RuleSet {
    /// Authorized ERP in kW.
    pub authorized_erp_kw: f64,
    /// Gain used when the form has none, in dBd.
    pub default_gain_dbd: f64,
    /// Losses used when the form has none, in dB.
    pub default_losses_db: f64,
    /// Towers taller than this need an aviation light, in metres.
    pub aviation_light_height_m: f64,
    /// Normalized descriptions of equipment without type approval.
    pub non_approved_equipment: Vec<String>,
}

impl Default for RuleSet {
    fn default() -> Self {
        Self::from_config(&ComplianceConfig::default())
    }
}

impl RuleSet {
    /// Build the rule set from configuration.
    #[must_use]
    pub fn from_config(config: &ComplianceConfig) -> Self {
        Self {
            authorized_erp_kw: config.authorized_erp_kw,
            default_gain_dbd: config.default_antenna_gain_dbd,
            default_losses_db: config.default_losses_db,
            aviation_light_height_m: config.aviation_light_height_m,
            non_approved_equipment: config
                .non_approved_equipment
                .iter()
                .map(|entry| normalize_equipment(entry))
                .collect(),
        }
    }

    /// Whether a manufacturer/model description is on the deny list.
    #[must_use]
    pub fn is_non_approved(&self, description: &str) -> bool {
        let normalized = normalize_equipment(description);
        !normalized.is_empty()
            && self
                .non_approved_equipment
                .iter()
                .any(|entry| normalized.contains(entry.as_str()))
    }
}

/// Uppercase and collapse whitespace so that matching ignores formatting.
fn normalize_equipment(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// One independent compliance concern.
pub trait ComplianceCheck: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Inspect the form and return any findings.
    fn check(&self, inspection: &Inspection, rules: &RuleSet) -> Vec<Violation>;
}

/// Flags ERP above the authorized limit.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErpCheck;

impl ComplianceCheck for ErpCheck {
    fn name(&self) -> &'static str {
        "erp"
    }

    fn check(&self, inspection: &Inspection, rules: &RuleSet) -> Vec<Violation> {
        let Some(input) = inspection.erp_input(rules.default_gain_dbd, rules.default_losses_db)
        else {
            return Vec::new();
        };
        let Ok(assessment) = ErpAssessment::assess(input, rules.authorized_erp_kw) else {
            return Vec::new();
        };
        if assessment.compliance.is_compliant {
            return Vec::new();
        }

        let excess = round_to(assessment.compliance.excess_kw, 3);
        vec![Violation {
            rule: ViolationRule::ErpViolation {
                measured_value: round_to(assessment.result.erp_kw, 3),
                authorized_value: rules.authorized_erp_kw,
                excess,
            },
            severity: Severity::Major,
            description: format!(
                "Operating above authorized ERP limit by {} kW",
                format_number(excess)
            ),
        }]
    }
}

/// Flags exciters and amplifiers on the non-approved list.
#[derive(Debug, Clone, Copy, Default)]
pub struct TypeApprovalCheck;

impl ComplianceCheck for TypeApprovalCheck {
    fn name(&self) -> &'static str {
        "type_approval"
    }

    fn check(&self, inspection: &Inspection, rules: &RuleSet) -> Vec<Violation> {
        let transmitter = &inspection.transmitter;
        [
            (
                "exciter",
                transmitter.exciter.manufacturer.as_deref(),
                transmitter.exciter.model_number.as_deref(),
            ),
            (
                "amplifier",
                transmitter.amplifier.manufacturer.as_deref(),
                transmitter.amplifier.model_number.as_deref(),
            ),
        ]
        .into_iter()
        .filter_map(|(equipment_type, manufacturer, model)| {
            let description = [filled(manufacturer), filled(model)]
                .into_iter()
                .flatten()
                .collect::<Vec<_>>()
                .join(" ");
            rules.is_non_approved(&description).then(|| Violation {
                description: format!("Operating non-type approved {equipment_type}: {description}"),
                rule: ViolationRule::TypeApprovalViolation {
                    equipment_type: equipment_type.to_string(),
                    equipment_model: description,
                },
                severity: Severity::Major,
            })
        })
        .collect()
    }
}

/// Flags missing tower safety features.
#[derive(Debug, Clone, Copy, Default)]
pub struct SafetyCheck;

impl ComplianceCheck for SafetyCheck {
    fn name(&self) -> &'static str {
        "safety"
    }

    fn check(&self, inspection: &Inspection, rules: &RuleSet) -> Vec<Violation> {
        let tower = &inspection.tower;
        let mut violations = Vec::new();

        if !tower.has_lightning_protection {
            violations.push(safety(
                SafetyCategory::LightningProtection,
                Severity::Minor,
                "Lightning protection not provided".to_string(),
            ));
        }

        if !tower.is_electrically_grounded {
            violations.push(safety(
                SafetyCategory::Grounding,
                Severity::Minor,
                "Tower not electrically grounded".to_string(),
            ));
        }

        let height = tower.height_m().unwrap_or(0.0);
        if height > rules.aviation_light_height_m && !tower.has_aviation_warning_light {
            violations.push(safety(
                SafetyCategory::AviationWarning,
                Severity::Major,
                format!(
                    "Aviation warning light required for tower height {}m",
                    format_number(height)
                ),
            ));
        }

        violations
    }
}

fn safety(category: SafetyCategory, severity: Severity, description: String) -> Violation {
    Violation {
        rule: ViolationRule::SafetyViolation {
            safety_category: category,
        },
        severity,
        description,
    }
}

/// Runs a set of checks against inspections.
pub struct ViolationDetector {
    rules: RuleSet,
    checks: Vec<Box<dyn ComplianceCheck>>,
}

impl std::fmt::Debug for ViolationDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViolationDetector")
            .field("rules", &self.rules)
            .field(
                "checks",
                &self.checks.iter().map(|c| c.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl Default for ViolationDetector {
    fn default() -> Self {
        Self::new(RuleSet::default())
    }
}

impl ViolationDetector {
    /// Create a detector with the ERP, type approval and safety checks.
    #[must_use]
    pub fn new(rules: RuleSet) -> Self {
        Self {
            rules,
            checks: vec![
                Box::new(ErpCheck),
                Box::new(TypeApprovalCheck),
                Box::new(SafetyCheck),
            ],
        }
    }

    /// Create a detector with custom checks.
    #[must_use]
    pub fn with_checks(rules: RuleSet, checks: Vec<Box<dyn ComplianceCheck>>) -> Self {
        Self { rules, checks }
    }

    /// The rules in use.
    #[must_use]
    pub fn rules(&self) -> &RuleSet {
        &self.rules
    }

    /// Run every check and collect the findings.
    #[must_use]
    pub fn detect(&self, inspection: &Inspection) -> Vec<Violation> {
        self.checks
            .iter()
            .flat_map(|check| {
                let found = check.check(inspection, &self.rules);
                debug!(check = check.name(), found = found.len(), "Ran compliance check");
                found
            })
            .collect()
    }

    /// Run every check and summarize.
    #[must_use]
    pub fn analyze(&self, inspection: &Inspection) -> ViolationSummary {
        ViolationSummary::new(self.detect(inspection))
    }
}
