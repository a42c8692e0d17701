//! Inspection forms and their sections.
//!
//! Measurements are kept as the inspector typed them (`"3000"`, `"72 m"`);
//! the accessor methods parse what computation needs via
//! [`parse_field`](crate::units::parse_field).

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::filled;
use crate::erp::ErpInput;
use crate::units::parse_field;

/// Workflow state of an inspection form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InspectionStatus {
    /// Being filled in.
    #[default]
    Draft,
    /// Submitted by the inspector.
    Completed,
    /// Reviewed by a supervisor.
    Reviewed,
}

string_enum!(InspectionStatus {
    Draft => "draft",
    Completed => "completed",
    Reviewed => "reviewed",
});

/// Whether the station was transmitting during the visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AirStatus {
    /// Transmitting.
    #[default]
    OnAir,
    /// Not transmitting.
    OffAir,
}

string_enum!(AirStatus {
    OnAir => "on_air",
    OffAir => "off_air",
});

/// Broadcast service of the station.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StationType {
    /// AM radio.
    Am,
    /// FM radio.
    Fm,
    /// Analogue television.
    Tv,
    /// Digital audio broadcasting.
    Dab,
    /// Digital terrestrial television.
    Dtt,
}

string_enum!(StationType {
    Am => "AM",
    Fm => "FM",
    Tv => "TV",
    Dab => "DAB",
    Dtt => "DTT",
});

impl StationType {
    /// Whether the station carries television (one column per channel).
    #[must_use]
    pub fn is_television(self) -> bool {
        matches!(self, Self::Tv | Self::Dtt)
    }
}

/// Tower construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TowerType {
    /// Guyed mast.
    Guyed,
    /// Self-supporting lattice or monopole.
    SelfSupporting,
    /// Anything else (see `tower_type_other`).
    Others,
}

string_enum!(TowerType {
    Guyed => "guyed",
    SelfSupporting => "self_supporting",
    Others => "others",
});

impl TowerType {
    /// Name as printed in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Guyed => "Guyed",
            Self::SelfSupporting => "Self-Supporting",
            Self::Others => "Others",
        }
    }
}

/// Corrosion treatment of the tower.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RustProtection {
    /// Hot-dip galvanized.
    Galvanized,
    /// Painted.
    Painted,
    /// No protection.
    NotProtected,
}

/// Filter design.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterType {
    /// Band-pass filter.
    BandPass,
    /// Notch filter.
    Notch,
    /// Other design.
    Others,
}

/// Antenna polarization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Polarization {
    /// Horizontal.
    Horizontal,
    /// Vertical.
    Vertical,
    /// Circular.
    Circular,
    /// Elliptical.
    Elliptical,
}

string_enum!(Polarization {
    Horizontal => "horizontal",
    Vertical => "vertical",
    Circular => "circular",
    Elliptical => "elliptical",
});

impl Polarization {
    /// Name as printed in reports.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Horizontal => "Horizontal",
            Self::Vertical => "Vertical",
            Self::Circular => "Circular",
            Self::Elliptical => "Elliptical",
        }
    }
}

/// Horizontal radiation pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HorizontalPattern {
    /// Omni-directional.
    OmniDirectional,
    /// Directional.
    Directional,
}

/// Broadcaster details as copied onto the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdministrativeSection {
    /// Registered name of the broadcaster.
    pub broadcaster_name: Option<String>,
    /// P.O. box number.
    pub po_box: Option<String>,
    /// Postal code.
    pub postal_code: Option<String>,
    /// Town of the postal address.
    pub town: Option<String>,
    /// Office location.
    pub location: Option<String>,
    /// Office street.
    pub street: Option<String>,
    /// Office phone numbers.
    pub phone_numbers: Option<String>,
    /// Person met at the site.
    pub contact_name: Option<String>,
    /// Address of the contact person.
    pub contact_address: Option<String>,
    /// Phone number of the contact person.
    pub contact_phone: Option<String>,
    /// Email of the contact person.
    pub contact_email: Option<String>,
}

/// General data about the transmitting site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteSection {
    /// Kind of station.
    pub station_type: Option<StationType>,
    /// Name of the transmitting site.
    pub transmitting_site_name: Option<String>,
    /// Longitude as recorded.
    pub longitude: Option<String>,
    /// Latitude as recorded.
    pub latitude: Option<String>,
    /// Physical location of the site.
    pub physical_location: Option<String>,
    /// Street or road leading to the site.
    pub physical_street: Option<String>,
    /// Area or county.
    pub physical_area: Option<String>,
    /// Altitude above sea level in metres.
    pub altitude: Option<String>,
    /// Owner of the land.
    pub land_owner_name: Option<String>,
    /// Whether another operator shares the site.
    pub other_telecoms_operator: bool,
    /// Who the other operators are.
    pub telecoms_operator_details: Option<String>,
}

/// Tower or mast at the site.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TowerSection {
    /// Owner of the tower.
    pub owner_name: Option<String>,
    /// Height above ground in metres.
    pub height_above_ground: Option<String>,
    /// Whether the tower stands on a roof.
    pub above_building_roof: bool,
    /// Building height in metres.
    pub building_height: Option<String>,
    /// Construction type.
    pub tower_type: Option<TowerType>,
    /// Type named when `tower_type` is `others`.
    pub tower_type_other: Option<String>,
    /// Rust protection used.
    pub rust_protection: Option<RustProtection>,
    /// Four-digit year of installation.
    pub installation_year: Option<String>,
    /// Tower manufacturer.
    pub manufacturer_name: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Rated wind load.
    pub maximum_wind_load: Option<String>,
    /// Rated load.
    pub maximum_load_charge: Option<String>,
    /// Whether the tower is insured.
    pub has_insurance: bool,
    /// Insurer.
    pub insurance_company: Option<String>,
    /// Whether the tower has a concrete base.
    pub has_concrete_base: bool,
    /// Whether lightning protection is fitted.
    pub has_lightning_protection: bool,
    /// Whether the tower is grounded.
    pub is_electrically_grounded: bool,
    /// Whether an aviation warning light is fitted.
    pub has_aviation_warning_light: bool,
    /// Whether other antennas share the tower.
    pub has_other_antennas: bool,
    /// Which other antennas are mounted.
    pub other_antennas_details: Option<String>,
}

impl TowerSection {
    /// Height above ground in metres, when recorded as a number.
    #[must_use]
    pub fn height_m(&self) -> Option<f64> {
        parse_field(self.height_above_ground.as_deref())
    }

    /// Tower type as printed in reports.
    #[must_use]
    pub fn type_label(&self) -> Option<String> {
        match self.tower_type? {
            TowerType::Others => Some(
                filled(self.tower_type_other.as_deref())
                    .unwrap_or(TowerType::Others.label())
                    .to_string(),
            ),
            other => Some(other.label().to_string()),
        }
    }
}

/// Exciter (drive) stage of the transmitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExciterSection {
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// Nominal power in watts.
    pub nominal_power: Option<String>,
    /// Measured output in watts.
    pub actual_reading: Option<String>,
}

/// Power amplifier stage of the transmitter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AmplifierSection {
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// Nominal power in watts.
    pub nominal_power: Option<String>,
    /// Measured forward power in watts.
    pub actual_reading: Option<String>,
    /// RF output connector.
    pub rf_output_connector_type: Option<String>,
    /// Tunable frequency range.
    pub frequency_range: Option<String>,
    /// Transmit frequency, MHz for FM.
    pub transmit_frequency: Option<String>,
    /// Frequency stability.
    pub frequency_stability: Option<String>,
    /// Harmonics suppression level.
    pub harmonics_suppression_level: Option<String>,
    /// Spurious emission level.
    pub spurious_emission_level: Option<String>,
    /// Occupied bandwidth.
    pub transmit_bandwidth: Option<String>,
    /// Whether an audio limiter is built in.
    pub has_internal_audio_limiter: bool,
    /// Whether a stereo coder is built in.
    pub has_internal_stereo_coder: bool,
    /// Whether the transmitter catalogue is attached.
    pub transmitter_catalog_attached: bool,
}

/// Output filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterSection {
    /// Filter type.
    pub filter_type: Option<FilterType>,
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// Frequency as recorded.
    pub frequency: Option<String>,
}

/// Transmitter chain.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransmitterSection {
    /// Exciter stage.
    pub exciter: ExciterSection,
    /// Power amplifier stage.
    pub amplifier: AmplifierSection,
    /// Output filter.
    pub filter: FilterSection,
}

/// Transmitting antenna and feeder losses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AntennaSection {
    /// Mounting height on the tower in metres.
    pub height_on_tower: Option<String>,
    /// Antenna type.
    pub antenna_type: Option<String>,
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Polarization.
    pub polarization: Option<Polarization>,
    /// Horizontal radiation pattern.
    pub horizontal_pattern: Option<HorizontalPattern>,
    /// Half-power beam width in degrees.
    pub beam_width_3db: Option<String>,
    /// Azimuth of maximum gain in degrees.
    pub max_gain_azimuth: Option<String>,
    /// Whether mechanical tilt is applied.
    pub has_mechanical_tilt: bool,
    /// Mechanical tilt in degrees.
    pub mechanical_tilt_degree: Option<String>,
    /// Whether electrical tilt is applied.
    pub has_electrical_tilt: bool,
    /// Electrical tilt in degrees.
    pub electrical_tilt_degree: Option<String>,
    /// Whether null fill is applied.
    pub has_null_fill: bool,
    /// Null fill in percent.
    pub null_fill_percentage: Option<String>,
    /// Gain in dBd.
    pub gain: Option<String>,
    /// Antenna losses in dB.
    pub estimated_antenna_losses: Option<String>,
    /// Feeder cable losses in dB.
    pub estimated_feeder_losses: Option<String>,
    /// Multiplexer losses in dB.
    pub estimated_multiplexer_losses: Option<String>,
    /// Total system losses in dB; wins over the parts.
    pub estimated_system_losses: Option<String>,
    /// ERP recorded on the form, in kW.
    pub effective_radiated_power: Option<String>,
    /// ERP recorded on the form, in dBW.
    pub effective_radiated_power_dbw: Option<String>,
    /// Whether the antenna catalogue is attached.
    pub antenna_catalog_attached: bool,
}

impl AntennaSection {
    /// Gain in dBd, when recorded as a number.
    #[must_use]
    pub fn gain_dbd(&self) -> Option<f64> {
        parse_field(self.gain.as_deref())
    }

    /// System losses in dB.
    ///
    /// The recorded system total wins; otherwise the antenna, feeder and
    /// multiplexer losses are summed when at least one of them is present.
    #[must_use]
    pub fn system_losses_db(&self) -> Option<f64> {
        if let Some(total) = parse_field(self.estimated_system_losses.as_deref()) {
            return Some(total);
        }
        let parts: Vec<f64> = [
            &self.estimated_antenna_losses,
            &self.estimated_feeder_losses,
            &self.estimated_multiplexer_losses,
        ]
        .into_iter()
        .filter_map(|field| parse_field(field.as_deref()))
        .collect();
        (!parts.is_empty()).then(|| parts.iter().sum())
    }
}

/// Studio-to-transmitter link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StudioLinkSection {
    /// Manufacturer.
    pub manufacturer: Option<String>,
    /// Model number.
    pub model_number: Option<String>,
    /// Serial number.
    pub serial_number: Option<String>,
    /// Frequency as recorded.
    pub frequency: Option<String>,
    /// Polarization.
    pub polarization: Option<Polarization>,
    /// Link medium, e.g. microwave, satellite, IP.
    pub stl_type: Option<String>,
    /// Description of the carried signal.
    pub signal_description: Option<String>,
}

impl StudioLinkSection {
    /// Whether anything about the link was recorded.
    #[must_use]
    pub fn is_recorded(&self) -> bool {
        [
            &self.manufacturer,
            &self.model_number,
            &self.serial_number,
            &self.frequency,
            &self.signal_description,
        ]
        .into_iter()
        .any(|field| filled(field.as_deref()).is_some())
    }
}

/// Closing part of the form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FinalSection {
    /// Technical staff present at the visit.
    pub technical_personnel: Option<String>,
    /// Observations by the inspector.
    pub other_observations: Option<String>,
    /// Date the inspector signed.
    pub inspector_signature_date: Option<NaiveDate>,
    /// Date the contact person signed.
    pub contact_signature_date: Option<NaiveDate>,
}

/// A completed or in-progress inspection form.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inspection {
    /// Identifier assigned by storage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    /// `CA/F/PSM/{YY}/{NNNN}`, assigned on first save.
    pub form_number: Option<String>,
    /// Broadcaster being inspected, if registered.
    pub broadcaster_id: Option<i64>,
    /// Day of the visit.
    pub inspection_date: NaiveDate,
    /// Workflow state.
    pub status: InspectionStatus,
    /// Name of the inspecting officer.
    pub inspector_name: String,
    /// Program or channel name.
    pub program_name: Option<String>,
    /// Whether the station was transmitting.
    pub air_status: AirStatus,
    /// Why the station was off air.
    pub off_air_reason: Option<String>,
    /// Administrative data.
    pub administrative: AdministrativeSection,
    /// Site data.
    pub site: SiteSection,
    /// Tower data.
    pub tower: TowerSection,
    /// Transmitter chain.
    pub transmitter: TransmitterSection,
    /// Antenna system.
    pub antenna: AntennaSection,
    /// Studio-to-transmitter link.
    pub studio_link: StudioLinkSection,
    /// Closing section; serialized as `final`.
    #[serde(rename = "final")]
    pub final_info: FinalSection,
    /// When the record was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// When the record was last changed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// When the status first became completed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Inspection {
    /// Create an empty draft for the given date and inspector.
    #[must_use]
    pub fn new(inspection_date: NaiveDate, inspector_name: impl Into<String>) -> Self {
        Self {
            inspection_date,
            inspector_name: inspector_name.into(),
            ..Self::default()
        }
    }

    /// Station type recorded on the form.
    #[must_use]
    pub fn station_type(&self) -> Option<StationType> {
        self.site.station_type
    }

    /// Forward power in watts: the amplifier reading, else the exciter's.
    ///
    /// Only positive readings count.
    #[must_use]
    pub fn forward_power_w(&self) -> Option<f64> {
        let transmitter = &self.transmitter;
        parse_field(transmitter.amplifier.actual_reading.as_deref())
            .filter(|p| *p > 0.0)
            .or_else(|| {
                parse_field(transmitter.exciter.actual_reading.as_deref()).filter(|p| *p > 0.0)
            })
    }

    /// ERP inputs from the recorded equipment, filling gaps with defaults.
    ///
    /// Returns `None` when no usable forward power was recorded.
    #[must_use]
    pub fn erp_input(&self, default_gain_dbd: f64, default_losses_db: f64) -> Option<ErpInput> {
        Some(ErpInput {
            forward_power_w: self.forward_power_w()?,
            antenna_gain_dbd: self.antenna.gain_dbd().unwrap_or(default_gain_dbd),
            losses_db: self.antenna.system_losses_db().unwrap_or(default_losses_db),
        })
    }

    /// Broadcaster name as recorded on the form.
    #[must_use]
    pub fn broadcaster_name(&self) -> Option<&str> {
        filled(self.administrative.broadcaster_name.as_deref())
    }

    /// Site name, else physical location, else `"Unknown Location"`.
    #[must_use]
    pub fn location_name(&self) -> &str {
        filled(self.site.transmitting_site_name.as_deref())
            .or_else(|| filled(self.site.physical_location.as_deref()))
            .unwrap_or("Unknown Location")
    }

    /// Transmit frequency as recorded.
    #[must_use]
    pub fn transmit_frequency(&self) -> Option<&str> {
        filled(self.transmitter.amplifier.transmit_frequency.as_deref())
    }

    /// Observations recorded on the form.
    #[must_use]
    pub fn observations(&self) -> Option<&str> {
        filled(self.final_info.other_observations.as_deref())
    }

    /// Whether the form holds data that only a finished visit would have.
    ///
    /// Such submissions must satisfy the off-air reason requirement instead
    /// of receiving a placeholder.
    #[must_use]
    pub fn has_final_data(&self) -> bool {
        self.status == InspectionStatus::Completed
            || filled(self.final_info.technical_personnel.as_deref()).is_some()
            || filled(self.final_info.other_observations.as_deref()).is_some()
            || self.final_info.inspector_signature_date.is_some()
    }

    /// Whether any filter details were recorded.
    #[must_use]
    pub fn has_filter(&self) -> bool {
        let filter = &self.transmitter.filter;
        filled(filter.manufacturer.as_deref()).is_some()
            || filled(filter.model_number.as_deref()).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Inspection {
        let mut inspection = Inspection::new(
            NaiveDate::from_ymd_opt(2024, 10, 28).unwrap(),
            "J. Mwangi",
        );
        inspection.site.station_type = Some(StationType::Fm);
        inspection.transmitter.amplifier.actual_reading = Some("3000 W".to_string());
        inspection.antenna.gain = Some("11".to_string());
        inspection
    }

    #[test]
    fn test_station_type_round_trip() {
        assert_eq!(StationType::Dtt.to_string(), "DTT");
        assert_eq!("FM".parse::<StationType>().unwrap(), StationType::Fm);
        assert!("XM".parse::<StationType>().is_err());
        let json = serde_json::to_string(&StationType::Tv).unwrap();
        assert_eq!(json, "\"TV\"");
    }

    #[test]
    fn test_status_strings_match_serde() {
        for status in InspectionStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
        for status in AirStatus::ALL {
            let json = serde_json::to_string(status).unwrap();
            assert_eq!(json, format!("\"{status}\""));
        }
    }

    #[test]
    fn test_forward_power_prefers_amplifier() {
        let mut inspection = sample();
        inspection.transmitter.exciter.actual_reading = Some("50".to_string());
        assert_eq!(inspection.forward_power_w(), Some(3000.0));

        inspection.transmitter.amplifier.actual_reading = Some("Not Seen".to_string());
        assert_eq!(inspection.forward_power_w(), Some(50.0));

        inspection.transmitter.exciter.actual_reading = Some("0".to_string());
        assert_eq!(inspection.forward_power_w(), None);
    }

    #[test]
    fn test_erp_input_defaults() {
        let mut inspection = sample();
        inspection.antenna.gain = None;
        let input = inspection.erp_input(11.0, 1.5).unwrap();
        assert!((input.forward_power_w - 3000.0).abs() < f64::EPSILON);
        assert!((input.antenna_gain_dbd - 11.0).abs() < f64::EPSILON);
        assert!((input.losses_db - 1.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_system_losses_sum_components() {
        let mut antenna = AntennaSection::default();
        assert_eq!(antenna.system_losses_db(), None);

        antenna.estimated_feeder_losses = Some("1.2".to_string());
        antenna.estimated_antenna_losses = Some("0.5".to_string());
        let losses = antenna.system_losses_db().unwrap();
        assert!((losses - 1.7).abs() < 1e-9);

        antenna.estimated_system_losses = Some("2.0 dB".to_string());
        assert_eq!(antenna.system_losses_db(), Some(2.0));
    }

    #[test]
    fn test_location_name_fallbacks() {
        let mut inspection = sample();
        assert_eq!(inspection.location_name(), "Unknown Location");

        inspection.site.physical_location = Some("Limuru".to_string());
        assert_eq!(inspection.location_name(), "Limuru");

        inspection.site.transmitting_site_name = Some("Limuru Hill".to_string());
        assert_eq!(inspection.location_name(), "Limuru Hill");
    }

    #[test]
    fn test_has_final_data() {
        let mut inspection = sample();
        assert!(!inspection.has_final_data());

        inspection.final_info.technical_personnel = Some("  ".to_string());
        assert!(!inspection.has_final_data());

        inspection.final_info.other_observations = Some("Rusty mast".to_string());
        assert!(inspection.has_final_data());

        let mut completed = sample();
        completed.status = InspectionStatus::Completed;
        assert!(completed.has_final_data());
    }

    #[test]
    fn test_tower_type_label() {
        let mut tower = TowerSection::default();
        assert_eq!(tower.type_label(), None);

        tower.tower_type = Some(TowerType::SelfSupporting);
        assert_eq!(tower.type_label().as_deref(), Some("Self-Supporting"));

        tower.tower_type = Some(TowerType::Others);
        tower.tower_type_other = Some("Monopole".to_string());
        assert_eq!(tower.type_label().as_deref(), Some("Monopole"));
    }

    #[test]
    fn test_studio_link_recorded() {
        let mut link = StudioLinkSection::default();
        assert!(!link.is_recorded());
        link.frequency = Some("7.5 GHz".to_string());
        assert!(link.is_recorded());
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{
            "inspection_date": "2024-10-28",
            "inspector_name": "J. Mwangi",
            "air_status": "off_air",
            "site": {"station_type": "FM"},
            "tower": {"height_above_ground": "72", "has_lightning_protection": true}
        }"#;
        let inspection: Inspection = serde_json::from_str(json).unwrap();
        assert_eq!(inspection.air_status, AirStatus::OffAir);
        assert_eq!(inspection.status, InspectionStatus::Draft);
        assert_eq!(inspection.tower.height_m(), Some(72.0));
        assert!(inspection.tower.has_lightning_protection);
        assert!(!inspection.tower.is_electrically_grounded);
    }
}
