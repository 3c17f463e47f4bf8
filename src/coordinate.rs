//! # Coordinate Normalizer
//!
//! Validates and repairs single latitude/longitude cells as they arrive from a
//! spreadsheet export.
//!
//! Two entry points share the same text pre-processing but differ in how they
//! treat stray characters:
//!
//! | Function | Stray characters | Result |
//! |----------|------------------|--------|
//! | [`validate`] | rejected | [`ValidationOutcome`] with a reason |
//! | [`clean`] | stripped, remainder parsed | `Option<f64>` |
//!
//! `validate` reports problems to the operator, `clean` attempts a best-effort
//! repair. Neither checks the value against the [-90, 90] / [-180, 180] degree
//! ranges.
//!
//! ## Example
//!
//! ```rust
//! use outlet_proximity::coordinate::{clean, validate, InvalidReason, ValidationOutcome};
//! use outlet_proximity::RawValue;
//!
//! let raw = RawValue::from(" 3,5952 ");
//! assert_eq!(validate(&raw), ValidationOutcome::Valid(3.5952));
//!
//! let typo = RawValue::from("98.67a22");
//! assert_eq!(validate(&typo), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
//! assert_eq!(clean(&typo), Some(98.6722));
//! ```

use std::fmt;

use crate::RawValue;

/// Tokens that spreadsheet users type to mean "no value".
const EMPTY_SENTINELS: [&str; 6] = ["", "NULL", "NA", "N/A", "NONE", "-"];

/// Where an empty value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum EmptySource {
    /// No cell at all, or a NaN number.
    Missing,
    /// Text such as `NA`, `-` or blank.
    Sentinel,
}

/// Why a raw coordinate cell was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InvalidReason {
    EmptyValue(EmptySource),
    /// Text contains something other than digits, `.` and `-`.
    IllegalCharacter,
    /// Only legal characters, but not a number (`1.2.3`, `--5`).
    UnparseableNumber,
}

impl InvalidReason {
    /// Operator-facing message, in the language of the source spreadsheets.
    pub fn message(&self) -> &'static str {
        match self {
            InvalidReason::EmptyValue(EmptySource::Missing) => "Nilai kosong",
            InvalidReason::EmptyValue(EmptySource::Sentinel) => "Nilai kosong atau tidak valid",
            InvalidReason::IllegalCharacter => "Mengandung karakter tidak valid (spasi/tanda baca)",
            InvalidReason::UnparseableNumber => "Format angka tidak valid",
        }
    }
}

impl fmt::Display for InvalidReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Result of validating one coordinate cell.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub enum ValidationOutcome {
    Valid(f64),
    Invalid(InvalidReason),
}

impl ValidationOutcome {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationOutcome::Valid(_))
    }

    /// The rejection reason, if any.
    pub fn reason(&self) -> Option<InvalidReason> {
        match self {
            ValidationOutcome::Valid(_) => None,
            ValidationOutcome::Invalid(reason) => Some(*reason),
        }
    }
}

/// Strictly validate a raw coordinate cell.
///
/// Text is trimmed, `,` becomes `.`, quote characters are dropped and the
/// result is compared case-insensitively against the empty sentinels before
/// any character check is made.
pub fn validate(raw: &RawValue) -> ValidationOutcome {
    match raw {
        RawValue::Missing => ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Missing)),
        RawValue::Number(value) => validate_number(*value),
        RawValue::Text(text) => {
            let Some(normalized) = normalize_text(text) else {
                return ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Sentinel));
            };
            if normalized.chars().any(|c| !is_numeric_char(c)) {
                return ValidationOutcome::Invalid(InvalidReason::IllegalCharacter);
            }
            match parse_finite(&normalized) {
                Some(value) => ValidationOutcome::Valid(value),
                None => ValidationOutcome::Invalid(InvalidReason::UnparseableNumber),
            }
        }
    }
}

/// Best-effort repair of a raw coordinate cell.
///
/// Same pre-processing as [`validate`], but characters outside digits, `.` and
/// `-` are removed instead of rejected. Returns `None` when nothing parseable
/// remains.
///
/// # Example
///
/// ```rust
/// use outlet_proximity::coordinate::clean;
/// use outlet_proximity::RawValue;
///
/// assert_eq!(clean(&RawValue::from("3,5")), Some(3.5));
/// assert_eq!(clean(&RawValue::from(" n/a ")), None);
/// assert_eq!(clean(&RawValue::from("'98.6800'")), Some(98.68));
/// ```
pub fn clean(raw: &RawValue) -> Option<f64> {
    match raw {
        RawValue::Missing => None,
        RawValue::Number(value) => value.is_finite().then_some(*value),
        RawValue::Text(text) => {
            let normalized = normalize_text(text)?;
            let stripped: String = normalized.chars().filter(|c| is_numeric_char(*c)).collect();
            parse_finite(&stripped)
        }
    }
}

fn validate_number(value: f64) -> ValidationOutcome {
    if value.is_nan() {
        // Spreadsheet readers surface blank numeric cells as NaN
        ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Missing))
    } else if value.is_finite() {
        ValidationOutcome::Valid(value)
    } else {
        ValidationOutcome::Invalid(InvalidReason::UnparseableNumber)
    }
}

/// Shared text pre-processing. Returns `None` for empty sentinels.
fn normalize_text(text: &str) -> Option<String> {
    let normalized: String = text
        .trim()
        .replace(',', ".")
        .chars()
        .filter(|c| *c != '"' && *c != '\'')
        .collect::<String>()
        .to_uppercase();

    if EMPTY_SENTINELS.contains(&normalized.as_str()) {
        None
    } else {
        Some(normalized)
    }
}

#[inline]
fn is_numeric_char(c: char) -> bool {
    c.is_ascii_digit() || c == '.' || c == '-'
}

fn parse_finite(text: &str) -> Option<f64> {
    text.parse::<f64>().ok().filter(|v| v.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> RawValue {
        RawValue::Text(s.to_string())
    }

    #[test]
    fn test_comma_decimal_separator() {
        assert_eq!(clean(&text("3,5")), Some(3.5));
        assert_eq!(validate(&text("3,5")), ValidationOutcome::Valid(3.5));
        assert_eq!(clean(&text("-0,25")), Some(-0.25));
    }

    #[test]
    fn test_sentinels_are_empty() {
        for token in ["", "NA", "-", " na ", "n/a", "Null", "none", "  -  ", "\"\""] {
            assert_eq!(
                validate(&text(token)),
                ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Sentinel)),
                "token {:?}",
                token
            );
            assert_eq!(clean(&text(token)), None, "token {:?}", token);
        }
    }

    #[test]
    fn test_missing_cell() {
        assert_eq!(
            validate(&RawValue::Missing),
            ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Missing))
        );
        assert_eq!(clean(&RawValue::Missing), None);
    }

    #[test]
    fn test_illegal_characters_rejected_then_stripped() {
        let raw = text("3.59 52");
        assert_eq!(validate(&raw), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
        assert_eq!(clean(&raw), Some(3.5952));

        let raw = text("98.6722°");
        assert_eq!(validate(&raw), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
        assert_eq!(clean(&raw), Some(98.6722));
    }

    #[test]
    fn test_quotes_are_dropped() {
        assert_eq!(validate(&text("\"3.6\"")), ValidationOutcome::Valid(3.6));
        assert_eq!(validate(&text("'98.68'")), ValidationOutcome::Valid(98.68));
    }

    #[test]
    fn test_unparseable_number() {
        assert_eq!(validate(&text("1.2.3")), ValidationOutcome::Invalid(InvalidReason::UnparseableNumber));
        assert_eq!(validate(&text("--5")), ValidationOutcome::Invalid(InvalidReason::UnparseableNumber));
        assert_eq!(clean(&text("1.2.3")), None);
    }

    #[test]
    fn test_clean_gives_up_when_nothing_left() {
        assert_eq!(clean(&text("abc")), None);
        assert_eq!(validate(&text("abc")), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
    }

    #[test]
    fn test_scientific_and_infinity_text_rejected() {
        // Letters are outside the accepted alphabet even when Rust could parse them
        assert_eq!(validate(&text("1e5")), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
        assert_eq!(validate(&text("inf")), ValidationOutcome::Invalid(InvalidReason::IllegalCharacter));
    }

    #[test]
    fn test_numeric_input() {
        assert_eq!(validate(&RawValue::Number(3.5952)), ValidationOutcome::Valid(3.5952));
        assert_eq!(
            validate(&RawValue::Number(f64::NAN)),
            ValidationOutcome::Invalid(InvalidReason::EmptyValue(EmptySource::Missing))
        );
        assert_eq!(
            validate(&RawValue::Number(f64::INFINITY)),
            ValidationOutcome::Invalid(InvalidReason::UnparseableNumber)
        );
        assert_eq!(clean(&RawValue::Number(f64::NEG_INFINITY)), None);
        assert_eq!(clean(&RawValue::Number(-1.25)), Some(-1.25));
    }

    #[test]
    fn test_empty_messages_depend_on_source() {
        let missing = validate(&RawValue::Missing).reason().map(|r| r.message());
        assert_eq!(missing, Some("Nilai kosong"));
        let nan = validate(&RawValue::Number(f64::NAN)).reason().map(|r| r.message());
        assert_eq!(nan, Some("Nilai kosong"));
        let sentinel = validate(&text("N/A")).reason().map(|r| r.message());
        assert_eq!(sentinel, Some("Nilai kosong atau tidak valid"));
    }

    #[test]
    fn test_no_range_check() {
        assert_eq!(validate(&text("123.0")), ValidationOutcome::Valid(123.0));
        assert_eq!(clean(&text("-500")), Some(-500.0));
    }

    #[test]
    fn test_outcome_helpers() {
        assert!(ValidationOutcome::Valid(1.0).is_valid());
        assert_eq!(ValidationOutcome::Valid(1.0).reason(), None);
        let invalid = ValidationOutcome::Invalid(InvalidReason::IllegalCharacter);
        assert!(!invalid.is_valid());
        assert_eq!(invalid.reason(), Some(InvalidReason::IllegalCharacter));
    }
}
