//! Effective radiated power (ERP) calculation and compliance checking.
//!
//! `ERP(dBW) = 10·log10(P) + G − L`, where `P` is the transmitter forward
//! power in watts, `G` the antenna gain and `L` the system losses in dB.
//! Values are kept unrounded; [`ErpSummary`] rounds for presentation.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::units::round_to;

/// System losses assumed when none were recorded (dB).
pub const DEFAULT_LOSSES_DB: f64 = 1.5;

/// Antenna gain assumed when none was recorded (dBd).
pub const DEFAULT_ANTENNA_GAIN_DBD: f64 = 11.0;

/// Maximum authorized ERP for broadcast stations (kW).
pub const DEFAULT_AUTHORIZED_ERP_KW: f64 = 10.0;

/// Inputs to an ERP calculation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErpInput {
    /// Transmitter forward power in watts.
    pub forward_power_w: f64,
    /// Antenna gain in dB (dBd or dBi as recorded).
    pub antenna_gain_dbd: f64,
    /// Total system losses in dB.
    pub losses_db: f64,
}

impl ErpInput {
    /// Create an input with the default gain and losses.
    #[must_use]
    pub fn with_defaults(forward_power_w: f64) -> Self {
        Self {
            forward_power_w,
            antenna_gain_dbd: DEFAULT_ANTENNA_GAIN_DBD,
            losses_db: DEFAULT_LOSSES_DB,
        }
    }
}

/// Computed ERP.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ErpResult {
    /// ERP in dBW.
    pub erp_dbw: f64,
    /// ERP in kW.
    pub erp_kw: f64,
}

impl ErpResult {
    /// Build a result from a dBW value.
    #[must_use]
    pub fn from_dbw(erp_dbw: f64) -> Self {
        Self {
            erp_dbw,
            erp_kw: dbw_to_kw(erp_dbw),
        }
    }

    /// ERP in watts.
    #[must_use]
    pub fn erp_watts(&self) -> f64 {
        self.erp_kw * 1000.0
    }
}

/// Outcome of comparing an ERP against the authorized limit.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Compliance {
    /// Whether the ERP is within the limit.
    pub is_compliant: bool,
    /// The authorized limit in kW.
    pub authorized_kw: f64,
    /// Amount over the limit in kW (0 when compliant).
    pub excess_kw: f64,
    /// Excess as a percentage of the limit (0 when compliant).
    pub percentage_over: f64,
}

/// Convert dBW to kW.
#[must_use]
pub fn dbw_to_kw(dbw: f64) -> f64 {
    10f64.powf(dbw / 10.0) / 1000.0
}

/// Convert kW to dBW.
#[must_use]
pub fn kw_to_dbw(kw: f64) -> f64 {
    10.0 * (kw * 1000.0).log10()
}

/// Calculate ERP from forward power, gain and losses.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] if the forward power is not a positive
/// finite number, or if gain or losses are not finite.
pub fn calculate(input: &ErpInput) -> Result<ErpResult> {
    if !input.forward_power_w.is_finite() || input.forward_power_w <= 0.0 {
        return Err(Error::invalid_input(format!(
            "forward power must be greater than 0 W, got {}",
            input.forward_power_w
        )));
    }
    if !input.antenna_gain_dbd.is_finite() || !input.losses_db.is_finite() {
        return Err(Error::invalid_input(
            "antenna gain and losses must be finite numbers",
        ));
    }

    let erp_dbw = 10.0 * input.forward_power_w.log10() + input.antenna_gain_dbd - input.losses_db;
    Ok(ErpResult::from_dbw(erp_dbw))
}

/// Compare an ERP in kW against the authorized limit.
#[must_use]
pub fn check_compliance(erp_kw: f64, authorized_kw: f64) -> Compliance {
    let is_compliant = erp_kw <= authorized_kw;
    let (excess_kw, percentage_over) = if is_compliant {
        (0.0, 0.0)
    } else {
        let excess = erp_kw - authorized_kw;
        (excess, excess / authorized_kw * 100.0)
    };

    Compliance {
        is_compliant,
        authorized_kw,
        excess_kw,
        percentage_over,
    }
}

/// Human-readable rendering of the formula with the values substituted.
#[must_use]
pub fn formula(input: &ErpInput, result: &ErpResult) -> String {
    format!(
        "ERP = 10*log10({}) + {} - {} = {:.2} dBW ({:.3} kW)",
        input.forward_power_w,
        input.antenna_gain_dbd,
        input.losses_db,
        result.erp_dbw,
        result.erp_kw
    )
}

/// A full calculation: inputs, result and compliance.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ErpAssessment {
    /// Inputs used.
    pub input: ErpInput,
    /// Computed ERP.
    pub result: ErpResult,
    /// Compliance against the authorized limit.
    pub compliance: Compliance,
}

impl ErpAssessment {
    /// Calculate and check an input against `authorized_kw`.
    ///
    /// # Errors
    ///
    /// Propagates [`calculate`] input errors.
    pub fn assess(input: ErpInput, authorized_kw: f64) -> Result<Self> {
        let result = calculate(&input)?;
        let compliance = check_compliance(result.erp_kw, authorized_kw);
        Ok(Self {
            input,
            result,
            compliance,
        })
    }

    /// Rounded view of the assessment for display and API responses.
    #[must_use]
    pub fn summary(&self) -> ErpSummary {
        ErpSummary {
            forward_power_w: self.input.forward_power_w,
            antenna_gain_dbd: self.input.antenna_gain_dbd,
            losses_db: self.input.losses_db,
            erp_dbw: round_to(self.result.erp_dbw, 2),
            erp_kw: round_to(self.result.erp_kw, 3),
            authorized_erp_kw: self.compliance.authorized_kw,
            is_compliant: self.compliance.is_compliant,
            excess_power_kw: round_to(self.compliance.excess_kw, 3),
            percentage_over: round_to(self.compliance.percentage_over, 1),
            formula: formula(&self.input, &self.result),
        }
    }
}

/// Presentation form of an [`ErpAssessment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErpSummary {
    /// Forward power in W.
    pub forward_power_w: f64,
    /// Antenna gain in dB.
    pub antenna_gain_dbd: f64,
    /// Losses in dB.
    pub losses_db: f64,
    /// ERP in dBW, 2 decimals.
    pub erp_dbw: f64,
    /// ERP in kW, 3 decimals.
    pub erp_kw: f64,
    /// Authorized limit in kW.
    pub authorized_erp_kw: f64,
    /// Whether the ERP is within the limit.
    pub is_compliant: bool,
    /// Excess over the limit in kW, 3 decimals.
    pub excess_power_kw: f64,
    /// Excess as a percentage of the limit, 1 decimal.
    pub percentage_over: f64,
    /// Formula with substituted values.
    pub formula: String,
}
