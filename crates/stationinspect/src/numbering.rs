//! Reference and form number sequences.
//!
//! Report reference numbers look like `CA/FSM/BC/007 Vol. II`; inspection
//! form numbers like `CA/F/PSM/24/0012` and restart every year. The next
//! number is one past the highest existing sequence, so numbers are never
//! reused even after gaps. Callers must compute and insert inside a single
//! write transaction (see [`Storage`](crate::storage::Storage)).

use std::sync::OnceLock;

use regex::Regex;

/// Prefix of report reference numbers.
pub const REFERENCE_PREFIX: &str = "CA/FSM/BC/";

/// Suffix of report reference numbers.
pub const REFERENCE_SUFFIX: &str = " Vol. II";

/// Prefix of inspection form numbers.
pub const FORM_PREFIX: &str = "CA/F/PSM/";

fn reference_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^CA/FSM/BC/(\d+)(?:\s|$)").expect("Invalid reference number pattern")
    })
}

fn form_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^CA/F/PSM/(\d{2})/(\d+)$").expect("Invalid form number pattern")
    })
}

/// Sequence part of a reference number, if it has the expected shape.
#[must_use]
pub fn reference_sequence(reference: &str) -> Option<u32> {
    reference_pattern()
        .captures(reference.trim())
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Format a reference number for a sequence value.
#[must_use]
pub fn format_reference(sequence: u32) -> String {
    format!("{REFERENCE_PREFIX}{sequence:03}{REFERENCE_SUFFIX}")
}

/// Next reference number after all `existing` ones.
///
/// Values that do not parse are ignored.
#[must_use]
pub fn next_reference_number<'a>(existing: impl IntoIterator<Item = &'a str>) -> String {
    let highest = existing
        .into_iter()
        .filter_map(reference_sequence)
        .max()
        .unwrap_or(0);
    format_reference(highest.saturating_add(1))
}

/// Year and sequence of a form number, if it has the expected shape.
#[must_use]
pub fn form_sequence(form_number: &str) -> Option<(u32, u32)> {
    let captures = form_pattern().captures(form_number.trim())?;
    let year = captures.get(1)?.as_str().parse().ok()?;
    let sequence = captures.get(2)?.as_str().parse().ok()?;
    Some((year, sequence))
}

/// Format a form number for a calendar year and sequence value.
#[must_use]
pub fn format_form_number(year: i32, sequence: u32) -> String {
    format!("{FORM_PREFIX}{:02}/{sequence:04}", year.rem_euclid(100))
}

/// Next form number for `year` after all `existing` ones of that year.
#[must_use]
pub fn next_form_number<'a>(year: i32, existing: impl IntoIterator<Item = &'a str>) -> String {
    let short_year = u32::try_from(year.rem_euclid(100)).unwrap_or(0);
    let highest = existing
        .into_iter()
        .filter_map(form_sequence)
        .filter(|(y, _)| *y == short_year)
        .map(|(_, sequence)| sequence)
        .max()
        .unwrap_or(0);
    format_form_number(year, highest.saturating_add(1))
}
