//
// pseudonym.rs
// Dicom-Deid-rs
//
// Pure derivations of replacement identifiers: pseudo patient IDs, truncated dates and compacted UIDs.
//
// Thales Matheus Mendonça Santos - November 2025

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use chrono::{Local, NaiveDate};
use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;
use regex::Regex;
use serde::Serialize;
use tracing::warn;

use crate::error::{DeidError, Result};

/// Replacement patient identifier: an integer rendered as uppercase hex without prefix.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct PseudoIdentifier(String);

impl PseudoIdentifier {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PseudoIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lossy digest of a UID: the sum of its digit runs, in uppercase hex.
///
/// A negative sum keeps a leading `-` in front of the magnitude, so the
/// value is not always a clean hex string; check [`CompactedUid::is_clean_hex`]
/// before relying on that.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CompactedUid(String);

impl CompactedUid {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    pub fn is_clean_hex(&self) -> bool {
        !self.0.is_empty() && self.0.chars().all(|c| c.is_ascii_hexdigit())
    }
}

impl fmt::Display for CompactedUid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Derive the pseudo patient identifier from the device serial number and study date/time.
///
/// A serial number that is not purely decimal is replaced by today's date
/// (`%y%m%d`), which makes the result depend on the wall clock.
pub fn new_pid(serial_number: &str, study_date: &str, study_time: &str) -> Result<PseudoIdentifier> {
    new_pid_with_fallback(
        serial_number,
        study_date,
        study_time,
        Local::now().date_naive(),
    )
}

/// Same as [`new_pid`] with the substitute date for non-numeric serials supplied by the caller.
pub fn new_pid_with_fallback(
    serial_number: &str,
    study_date: &str,
    study_time: &str,
    fallback_date: NaiveDate,
) -> Result<PseudoIdentifier> {
    let serial: Cow<str> = if is_decimal(serial_number) {
        Cow::Borrowed(serial_number)
    } else {
        let substitute = fallback_date.format("%y%m%d").to_string();
        warn!(
            substitute = %substitute,
            "DeviceSerialNumber is not numeric; pseudo ID will depend on the current date"
        );
        Cow::Owned(substitute)
    };

    let digits = format!(
        "{}{}{}",
        serial,
        skip_chars(study_date, 2),
        head(study_time, 4)
    );

    let value: u128 = digits.parse().map_err(|e| DeidError::InvalidValue {
        tag: "PatientID".to_string(),
        reason: format!("cannot derive pseudo ID from {:?}: {}", digits, e),
    })?;

    Ok(PseudoIdentifier(format!("{:X}", value)))
}

/// Keep the year of a DA value and reset month and day to January 1st.
pub fn truncate_date(date: &str) -> String {
    if date.is_empty() {
        return String::new();
    }
    format!("{}0101", head(date, 4))
}

fn digit_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"[+-]?\d+").expect("static pattern"))
}

/// Sum every digit run of a UID and render the total in uppercase hex.
///
/// `"1.2.840.10008"` sums to 10851 and compacts to `2A63`. A value with no
/// digits at all compacts to an empty string.
pub fn compact_uid(raw_uid: &str) -> CompactedUid {
    let sentinel = raw_uid.trim().replace('.', "+");

    let mut found = false;
    let mut sum = BigInt::zero();
    for run in digit_runs().find_iter(&sentinel) {
        if let Some(value) = parse_signed(run.as_str()) {
            sum += value;
            found = true;
        }
    }

    if !found {
        return CompactedUid(String::new());
    }
    CompactedUid(sum.to_str_radix(16).to_uppercase())
}

fn parse_signed(run: &str) -> Option<BigInt> {
    let (sign, digits) = match run.as_bytes().first() {
        Some(b'-') => (Sign::Minus, &run[1..]),
        Some(b'+') => (Sign::Plus, &run[1..]),
        _ => (Sign::Plus, run),
    };
    let magnitude = BigUint::parse_bytes(digits.as_bytes(), 10)?;
    Some(BigInt::from_biguint(sign, magnitude))
}

fn is_decimal(value: &str) -> bool {
    !value.is_empty() && value.chars().all(|c| c.is_ascii_digit())
}

/// First `n` characters of `value`, or all of it when shorter.
pub(crate) fn head(value: &str, n: usize) -> &str {
    match value.char_indices().nth(n) {
        Some((idx, _)) => &value[..idx],
        None => value,
    }
}

/// Last `n` characters of `value`, or all of it when shorter.
pub(crate) fn tail(value: &str, n: usize) -> &str {
    let count = value.chars().count();
    if count <= n {
        return value;
    }
    skip_chars(value, count - n)
}

fn skip_chars(value: &str, n: usize) -> &str {
    match value.char_indices().nth(n) {
        Some((idx, _)) => &value[idx..],
        None => "",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixed_day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 9).unwrap()
    }

    #[test]
    fn pid_is_hex_of_concatenated_digits() {
        let pid = new_pid("123456", "20230615", "101112").unwrap();
        let expected = format!("{:X}", 1234562306151011_u128);
        assert_eq!(pid.as_str(), expected);
        assert_eq!(pid.as_str(), "462D3EFB61263");
    }

    #[test]
    fn pid_is_deterministic_for_numeric_serials() {
        let first = new_pid("98765", "19991231", "235959").unwrap();
        let second = new_pid("98765", "19991231", "235959").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn non_numeric_serial_falls_back_to_date() {
        let pid = new_pid_with_fallback("SN-01", "20230615", "101112", fixed_day()).unwrap();
        let expected = format!("{:X}", 2402092306151011_u128);
        assert_eq!(pid.as_str(), expected);
        assert_eq!(pid.as_str(), "888B0B2A03663");

        let empty = new_pid_with_fallback("", "20230615", "101112", fixed_day()).unwrap();
        assert_eq!(empty, pid);
    }

    #[test]
    fn pid_rejects_non_decimal_dates() {
        let err = new_pid("1", "2023-06-15", "1011").unwrap_err();
        assert!(matches!(err, DeidError::InvalidValue { .. }));
    }

    #[test]
    fn pid_accepts_short_date_and_time() {
        let pid = new_pid("7", "20", "1").unwrap();
        assert_eq!(pid.as_str(), "47");
    }

    #[test]
    fn truncate_date_keeps_the_year() {
        assert_eq!(truncate_date("20230615"), "20230101");
        assert_eq!(truncate_date("19800229"), "19800101");
        assert_eq!(truncate_date(""), "");
    }

    #[test]
    fn compact_uid_sums_digit_groups() {
        let compacted = compact_uid("1.2.840.10008");
        assert_eq!(compacted.as_str(), "2A63");
        assert!(compacted.is_clean_hex());
    }

    #[test]
    fn compact_uid_handles_long_components() {
        // 2.25 UUID-derived UIDs carry components beyond u64.
        let compacted = compact_uid("2.25.329800735698586629295641978511506172918");
        let expected = BigInt::parse_bytes(b"329800735698586629295641978511506172945", 10)
            .unwrap()
            .to_str_radix(16)
            .to_uppercase();
        assert_eq!(compacted.as_str(), expected);
    }

    #[test]
    fn compact_uid_keeps_sign_of_negative_sums() {
        let compacted = compact_uid("1.-20");
        assert_eq!(compacted.as_str(), "-13");
        assert!(!compacted.is_clean_hex());
        assert_eq!(compact_uid("0.0").as_str(), "0");
        assert_eq!(compact_uid("").as_str(), "");
    }

    #[test]
    fn head_and_tail_are_char_bounded() {
        assert_eq!(head("2023", 8), "2023");
        assert_eq!(tail("ABCDEFGHIJKLMNOPQRS", 16), "DEFGHIJKLMNOPQRS");
        assert_eq!(tail("ABC", 16), "ABC");
    }
}
