//! Lenient parsing of measurements typed into inspection forms.
//!
//! Inspectors record values such as `"3000"`, `"3,000 W"`, `"72m"` or
//! `" 11.5 dBd"`. Only the leading number matters for computation; anything
//! without one is treated as not recorded.

use std::sync::OnceLock;

use regex::Regex;

fn leading_number() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^\s*([-+]?(?:\d{1,3}(?:,\d{3})+|\d+)(?:\.\d+)?|[-+]?\.\d+)")
            .expect("Invalid leading number pattern")
    })
}

/// Parse the leading number of a free-text measurement.
///
/// Thousands separators are accepted. Returns `None` for blank input, input
/// that does not start with a number, and non-finite results.
#[must_use]
pub fn parse_measurement(text: &str) -> Option<f64> {
    let captures = leading_number().captures(text)?;
    let digits = captures.get(1)?.as_str().replace(',', "");
    digits.parse::<f64>().ok().filter(|value| value.is_finite())
}

/// Parse an optional form field.
#[must_use]
pub fn parse_field(field: Option<&str>) -> Option<f64> {
    field.and_then(parse_measurement)
}

/// Format a number for display without a trailing `.0` on whole values.
#[must_use]
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{value:.0}")
    } else {
        let text = format!("{value:.3}");
        text.trim_end_matches('0').trim_end_matches('.').to_string()
    }
}

/// Round to the given number of decimal places.
#[must_use]
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
