//! Numeric and date normalization
//!
//! Vendor exports disagree on number formatting (thousands separators, blank
//! cells) and encode dates in folder names like `25Nov2025`. Everything here
//! normalizes those into canonical forms; "could not parse" is always an
//! explicit absence, never a silent zero.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Folders whose name carries no date token but whose contents belong to a
/// known day anyway.
static FOLDER_DATE_EXCEPTIONS: Lazy<HashMap<&'static str, NaiveDate>> = Lazy::new(|| {
    let mut map = HashMap::new();
    if let Some(date) = NaiveDate::from_ymd_opt(2025, 11, 25) {
        map.insert("inverter wms and meter data", date);
    }
    map
});

const MONTH_CODES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov", "dec",
];

/// Parse a possibly locale-formatted number.
///
/// Strips thousands-separator commas and surrounding whitespace. Empty input
/// and anything that does not parse to a finite number yield `None`.
pub fn parse_numeric(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// [`parse_numeric`] with a caller-supplied substitute for absence.
pub fn to_number(raw: &str, fallback: f64) -> f64 {
    parse_numeric(raw).unwrap_or(fallback)
}

/// Decode a `DDMonYYYY`-style token embedded anywhere in a folder name.
///
/// Month codes are matched case-insensitively. Names in the exception table
/// resolve to their hard-coded dates. Returns `None` when no date token is
/// found; callers skip such folders rather than guessing.
pub fn iso_date_from_folder_name(name: &str) -> Option<NaiveDate> {
    let normalized = name.trim().to_lowercase();
    if let Some(date) = FOLDER_DATE_EXCEPTIONS.get(normalized.as_str()) {
        return Some(*date);
    }

    let bytes = normalized.as_bytes();
    for start in 0..bytes.len() {
        if let Some(date) = try_date_token(bytes, start) {
            return Some(date);
        }
    }
    None
}

/// Try to read `<1-2 digits><month code><4 digits>` beginning at `start`.
fn try_date_token(bytes: &[u8], start: usize) -> Option<NaiveDate> {
    // digits further left would make this the tail of a longer number
    if start > 0 && bytes[start - 1].is_ascii_digit() {
        return None;
    }

    let mut i = start;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    let day_len = i - start;
    if day_len == 0 || day_len > 2 {
        return None;
    }
    let day: u32 = std::str::from_utf8(&bytes[start..i]).ok()?.parse().ok()?;

    if i + 3 > bytes.len() {
        return None;
    }
    let code = std::str::from_utf8(&bytes[i..i + 3]).ok()?;
    let month = MONTH_CODES.iter().position(|m| *m == code)? as u32 + 1;
    i += 3;

    let year_start = i;
    while i < bytes.len() && bytes[i].is_ascii_digit() {
        i += 1;
    }
    if i - year_start != 4 {
        return None;
    }
    let year: i32 = std::str::from_utf8(&bytes[year_start..i]).ok()?.parse().ok()?;

    NaiveDate::from_ymd_opt(year, month, day)
}

/// Stable id from free text: lowercase, non-alphanumeric runs collapse to a
/// single `-`, leading/trailing separators trimmed. Idempotent.
pub fn slugify(value: &str) -> String {
    slugify_with(value, '-')
}

/// [`slugify`] with a custom separator.
pub fn slugify_with(value: &str, delimiter: char) -> String {
    let mut out = String::with_capacity(value.len());
    let mut pending_delim = false;
    for ch in value.chars() {
        if ch.is_ascii_alphanumeric() {
            if pending_delim && !out.is_empty() {
                out.push(delimiter);
            }
            pending_delim = false;
            out.push(ch.to_ascii_lowercase());
        } else {
            pending_delim = true;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rstest::rstest;

    #[rstest]
    #[case("1,234.5", Some(1234.5))]
    #[case(" 42 ", Some(42.0))]
    #[case("", None)]
    #[case("   ", None)]
    #[case("abc", None)]
    #[case("1,2,3", Some(123.0))]
    #[case("-15.5", Some(-15.5))]
    #[case("NaN", None)]
    #[case("inf", None)]
    fn test_parse_numeric(#[case] raw: &str, #[case] expected: Option<f64>) {
        assert_eq!(parse_numeric(raw), expected);
    }

    #[test]
    fn test_to_number_fallback() {
        assert_eq!(to_number("1,500", 0.0), 1500.0);
        assert_eq!(to_number("n/a", 7.5), 7.5);
        assert_eq!(to_number("", -1.0), -1.0);
    }

    #[test]
    fn test_folder_date_plain_token() {
        assert_eq!(
            iso_date_from_folder_name("25Nov2025"),
            NaiveDate::from_ymd_opt(2025, 11, 25)
        );
        assert_eq!(
            iso_date_from_folder_name("export_3jan2024_final"),
            NaiveDate::from_ymd_opt(2024, 1, 3)
        );
        assert_eq!(
            iso_date_from_folder_name("Report 14AUG2025"),
            NaiveDate::from_ymd_opt(2025, 8, 14)
        );
    }

    #[test]
    fn test_folder_date_exception_table() {
        assert_eq!(
            iso_date_from_folder_name("inverter wms and meter data"),
            NaiveDate::from_ymd_opt(2025, 11, 25)
        );
        assert_eq!(
            iso_date_from_folder_name("  Inverter WMS and Meter Data  "),
            NaiveDate::from_ymd_opt(2025, 11, 25)
        );
    }

    #[test]
    fn test_folder_date_rejects_noise() {
        assert_eq!(iso_date_from_folder_name("randomfolder"), None);
        assert_eq!(iso_date_from_folder_name(""), None);
        // month code without surrounding digits is not a token
        assert_eq!(iso_date_from_folder_name("november-data"), None);
        // too many leading digits means this is a serial number, not a day
        assert_eq!(iso_date_from_folder_name("123Nov2025"), None);
        // calendar-invalid day
        assert_eq!(iso_date_from_folder_name("32Nov2025"), None);
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Desert Bloom Solar"), "desert-bloom-solar");
        assert_eq!(slugify("  DC Capacity 1 "), "dc-capacity-1");
        assert_eq!(slugify("a//b__c"), "a-b-c");
        assert_eq!(slugify("!!!"), "");
        assert_eq!(slugify_with("Active Power", '_'), "active_power");
    }

    proptest! {
        #[test]
        fn slugify_is_idempotent(input in ".{0,64}") {
            let once = slugify(&input);
            prop_assert_eq!(slugify(&once), once.clone());
        }

        #[test]
        fn slugify_output_is_clean(input in ".{0,64}") {
            let slug = slugify(&input);
            prop_assert!(!slug.starts_with('-') && !slug.ends_with('-'));
            prop_assert!(slug.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        }
    }
}
