//! Record types persisted by the storage layer.
//!
//! Records are flat with integer foreign keys. An inspection embeds its form
//! sections (tower, transmitter, antenna, studio link) because they are only
//! ever read and written together with the inspection.

/// Declare a string-backed enum's `as_str`, `Display` and `FromStr`.
///
/// The string forms match the serde representation so that database
/// columns and JSON agree.
macro_rules! string_enum {
    ($name:ident { $($variant:ident => $text:literal),+ $(,)? }) => {
        impl $name {
            /// Every variant, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant),+];

            /// The stored string form.
            #[must_use]
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $text),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = crate::error::Error;

            fn from_str(s: &str) -> crate::error::Result<Self> {
                match s {
                    $($text => Ok(Self::$variant),)+
                    other => Err(crate::error::Error::invalid_input(format!(
                        "unknown {}: {other}",
                        stringify!($name)
                    ))),
                }
            }
        }
    };
}

pub(crate) use string_enum;

mod broadcaster;
mod inspection;
mod report;

pub use broadcaster::Broadcaster;
pub use inspection::{
    AdministrativeSection, AirStatus, AmplifierSection, AntennaSection, ExciterSection,
    FilterSection, FilterType, FinalSection, HorizontalPattern, Inspection, InspectionStatus,
    Polarization, RustProtection, SiteSection, StationType, StudioLinkSection, TowerSection,
    TowerType, TransmitterSection,
};
pub use report::{
    ChannelInput, ErpCalculation, ImageAlignment, ImageCategory, ImagePosition, InspectionReport,
    ReportImage, ReportStatus, ReportType,
};

/// Trimmed contents of an optional form field, or `None` when blank.
#[must_use]
pub fn filled(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
