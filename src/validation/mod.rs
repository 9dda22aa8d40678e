//! # Field validators
//!
//! Pure, single-field parsers shared by every retriever. Each validator turns a
//! textual field into a typed value or fails with an
//! [`ObservationValidationError`]; none of them returns a sentinel for bad input.
//!
//! ## Overview
//! -----------------
//! * [`JulianDayValidator`] – finite decimal Julian Day.
//! * [`MagnitudeFieldValidator`] – `[<|>]value[:]` magnitude strings, range checked.
//! * [`UncertaintyValueValidator`] – decimal inside a caller supplied closed range.
//! * [`ValflagValidator`], [`MTypeValidator`], [`TransformedValidator`] – AAVSO flag columns.
//! * [`ObserverCodeValidator`], [`OptionalFieldValidator`], [`NonEmptyFieldValidator`] –
//!   free text columns.
//!
//! Validators are stateless apart from their configuration, so one instance is built
//! per retriever and reused for every record.
mod range;

pub use range::InclusiveRange;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{JulianDay, MAX_MAGNITUDE, MIN_MAGNITUDE};
use crate::observations::{DateInfo, MType, Magnitude, MagnitudeModifier, ValidationType};
use crate::varstar_errors::ObservationValidationError;

/// Single field parser.
pub trait FieldValidator {
    type Output;

    fn validate(&self, field: &str) -> Result<Self::Output, ObservationValidationError>;
}

/// Parse a float, reporting failures against `field`.
pub(crate) fn parse_real(field: &'static str, text: &str) -> Result<f64, ObservationValidationError> {
    let trimmed = text.trim();
    trimmed
        .parse::<f64>()
        .map_err(|_| ObservationValidationError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        })
}

/// Parse an integer, reporting failures against `field`.
pub(crate) fn parse_int(field: &'static str, text: &str) -> Result<i64, ObservationValidationError> {
    let trimmed = text.trim();
    trimmed
        .parse::<i64>()
        .map_err(|_| ObservationValidationError::InvalidNumber {
            field,
            value: trimmed.to_string(),
        })
}

// -------------------------------------------------------------------------------------------------
// Julian Day
// -------------------------------------------------------------------------------------------------

/// Julian Day field.
///
/// With [`JulianDayValidator::optional`], an empty field yields `None` instead of an error.
#[derive(Debug, Clone, Copy, Default)]
pub struct JulianDayValidator {
    can_be_empty: bool,
}

impl JulianDayValidator {
    pub fn new() -> Self {
        Self { can_be_empty: false }
    }

    pub fn optional() -> Self {
        Self { can_be_empty: true }
    }

    pub fn parse(&self, field: &str) -> Result<JulianDay, ObservationValidationError> {
        let trimmed = field.trim();
        match trimmed.parse::<f64>() {
            Ok(jd) if jd.is_finite() => Ok(jd),
            _ => Err(ObservationValidationError::InvalidJulianDay(trimmed.to_string())),
        }
    }
}

impl FieldValidator for JulianDayValidator {
    type Output = Option<DateInfo>;

    fn validate(&self, field: &str) -> Result<Self::Output, ObservationValidationError> {
        if field.trim().is_empty() {
            return if self.can_be_empty {
                Ok(None)
            } else {
                Err(ObservationValidationError::EmptyField("Julian Day"))
            };
        }
        self.parse(field).map(|jd| Some(DateInfo::new(jd)))
    }
}

// -------------------------------------------------------------------------------------------------
// Magnitude
// -------------------------------------------------------------------------------------------------

static MAGNITUDE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(<|>)?(-?\d+(?:\.\d+)?)(:)?$").expect("valid magnitude regex")
});

/// Magnitude field with optional `<`/`>` prefix and `:` suffix.
///
/// The returned [`Magnitude`] has a zero uncertainty; retrievers fill it in from their
/// own uncertainty column.
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeFieldValidator {
    range: InclusiveRange,
}

impl Default for MagnitudeFieldValidator {
    fn default() -> Self {
        Self {
            range: InclusiveRange::new(MIN_MAGNITUDE, MAX_MAGNITUDE),
        }
    }
}

impl MagnitudeFieldValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_range(range: InclusiveRange) -> Self {
        Self { range }
    }
}

impl FieldValidator for MagnitudeFieldValidator {
    type Output = Magnitude;

    fn validate(&self, field: &str) -> Result<Magnitude, ObservationValidationError> {
        let trimmed = field.trim();
        let caps = MAGNITUDE_PATTERN
            .captures(trimmed)
            .ok_or_else(|| ObservationValidationError::InvalidMagnitude(trimmed.to_string()))?;

        let modifier = match caps.get(1).map(|m| m.as_str()) {
            Some("<") => MagnitudeModifier::FainterThan,
            Some(">") => MagnitudeModifier::BrighterThan,
            _ => MagnitudeModifier::NoDelta,
        };
        let value = parse_real("magnitude", &caps[2])?;
        self.range.check("magnitude", value)?;

        Ok(Magnitude::new(value, 0.0)
            .with_modifier(modifier)
            .with_uncertain(caps.get(3).is_some()))
    }
}

// -------------------------------------------------------------------------------------------------
// Uncertainty
// -------------------------------------------------------------------------------------------------

/// Uncertainty value inside a closed range.
#[derive(Debug, Clone, Copy)]
pub struct UncertaintyValueValidator {
    range: InclusiveRange,
    can_be_empty: bool,
}

impl UncertaintyValueValidator {
    pub fn new(range: InclusiveRange) -> Self {
        Self {
            range,
            can_be_empty: false,
        }
    }

    /// Empty fields are read as a zero uncertainty.
    pub fn optional(range: InclusiveRange) -> Self {
        Self {
            range,
            can_be_empty: true,
        }
    }

    /// Range check an already numeric uncertainty.
    pub fn check(&self, value: f64) -> Result<f64, ObservationValidationError> {
        self.range.check("uncertainty", value)
    }
}

impl FieldValidator for UncertaintyValueValidator {
    type Output = f64;

    fn validate(&self, field: &str) -> Result<f64, ObservationValidationError> {
        if field.trim().is_empty() {
            return if self.can_be_empty {
                Ok(0.0)
            } else {
                Err(ObservationValidationError::EmptyField("uncertainty"))
            };
        }
        let value = parse_real("uncertainty", field)?;
        self.check(value)
    }
}

// -------------------------------------------------------------------------------------------------
// Flags
// -------------------------------------------------------------------------------------------------

/// Validation flag column.
///
/// `allowed` restricts the letters accepted (e.g. only `D` for the simple text format).
#[derive(Debug, Clone)]
pub struct ValflagValidator {
    allowed: &'static str,
}

impl ValflagValidator {
    /// Letters accepted by the AAVSO download format.
    pub const DOWNLOAD_FLAGS: &'static str = "GDTPVZU";

    /// Letters accepted by the simple text format.
    pub const SIMPLE_FLAGS: &'static str = "D";

    pub fn new(allowed: &'static str) -> Self {
        Self { allowed }
    }
}

impl FieldValidator for ValflagValidator {
    type Output = ValidationType;

    fn validate(&self, field: &str) -> Result<ValidationType, ObservationValidationError> {
        let flag = field.trim().to_ascii_uppercase();
        if flag.is_empty() {
            return Ok(ValidationType::Good);
        }
        if flag.len() != 1 || !self.allowed.contains(flag.as_str()) {
            return Err(ObservationValidationError::InvalidValflag(flag));
        }
        ValidationType::from_download_flag(&flag).ok_or(ObservationValidationError::InvalidValflag(flag))
    }
}

/// Magnitude type column (STD, DIFF, STEP; empty means STD).
#[derive(Debug, Clone, Copy, Default)]
pub struct MTypeValidator;

impl FieldValidator for MTypeValidator {
    type Output = MType;

    fn validate(&self, field: &str) -> Result<MType, ObservationValidationError> {
        MType::from_code(field).ok_or_else(|| ObservationValidationError::InvalidMType(field.trim().to_string()))
    }
}

/// Transformed column: yes/no, true/false, 1/0; empty means not transformed.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransformedValidator;

impl FieldValidator for TransformedValidator {
    type Output = bool;

    fn validate(&self, field: &str) -> Result<bool, ObservationValidationError> {
        match field.trim().to_ascii_lowercase().as_str() {
            "" | "no" | "false" | "0" | "n" => Ok(false),
            "yes" | "true" | "1" | "y" => Ok(true),
            other => Err(ObservationValidationError::InvalidTransformed(other.to_string())),
        }
    }
}

// -------------------------------------------------------------------------------------------------
// Free text
// -------------------------------------------------------------------------------------------------

static OBSERVER_CODE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9_\-]{1,10}$").expect("valid observer code regex"));

/// AAVSO observer code: up to ten alphanumeric characters, optional.
#[derive(Debug, Clone, Copy, Default)]
pub struct ObserverCodeValidator;

impl FieldValidator for ObserverCodeValidator {
    type Output = Option<String>;

    fn validate(&self, field: &str) -> Result<Option<String>, ObservationValidationError> {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        if !OBSERVER_CODE_PATTERN.is_match(trimmed) {
            return Err(ObservationValidationError::Other(format!(
                "Invalid observer code: '{trimmed}'"
            )));
        }
        Ok(Some(trimmed.to_string()))
    }
}

/// Trimmed text, `None` when empty.
#[derive(Debug, Clone, Copy, Default)]
pub struct OptionalFieldValidator;

impl FieldValidator for OptionalFieldValidator {
    type Output = Option<String>;

    fn validate(&self, field: &str) -> Result<Option<String>, ObservationValidationError> {
        let trimmed = field.trim();
        Ok((!trimmed.is_empty()).then(|| trimmed.to_string()))
    }
}

/// Trimmed text that must not be empty.
#[derive(Debug, Clone, Copy)]
pub struct NonEmptyFieldValidator {
    name: &'static str,
}

impl NonEmptyFieldValidator {
    pub fn new(name: &'static str) -> Self {
        Self { name }
    }
}

impl FieldValidator for NonEmptyFieldValidator {
    type Output = String;

    fn validate(&self, field: &str) -> Result<String, ObservationValidationError> {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            Err(ObservationValidationError::EmptyField(self.name))
        } else {
            Ok(trimmed.to_string())
        }
    }
}

#[cfg(test)]
mod validation_test {
    use super::*;

    #[test]
    fn test_julian_day() {
        let v = JulianDayValidator::new();
        assert_eq!(v.parse("2450000.5").unwrap(), 2_450_000.5);
        assert!(v.parse("abc").is_err());
        assert!(v.parse("NaN").is_err());
        assert!(v.parse("inf").is_err());
        assert!(v.validate("").is_err());
        assert_eq!(JulianDayValidator::optional().validate("  ").unwrap(), None);
        let info = v.validate("2458849.5").unwrap().unwrap();
        assert_eq!(info.calendar_date, "2020-01-01.00000");
    }

    #[test]
    fn test_magnitude_modifiers() {
        let v = MagnitudeFieldValidator::new();
        let m = v.validate("<12.5:").unwrap();
        assert_eq!(m.value, 12.5);
        assert!(m.is_fainter_than());
        assert!(m.is_uncertain);

        let m = v.validate(">8").unwrap();
        assert!(m.is_brighter_than());
        assert!(!m.is_uncertain);

        let m = v.validate(" -1.25 ").unwrap();
        assert_eq!(m.value, -1.25);
        assert_eq!(m.modifier, MagnitudeModifier::NoDelta);
    }

    #[test]
    fn test_magnitude_rejections() {
        let v = MagnitudeFieldValidator::new();
        for bad in ["", "abc", "12.", "1e3", "<>12", "12::", "30.0", "-6"] {
            assert!(v.validate(bad).is_err(), "{bad} should be rejected");
        }
    }

    #[test]
    fn test_magnitude_round_trip() {
        let v = MagnitudeFieldValidator::new();
        for text in ["10", "<12.5", ">3.25:", "-4.75", "24.999:", "0.001", "<-2"] {
            let first = v.validate(text).unwrap();
            let second = v.validate(&first.to_string()).unwrap();
            assert_eq!(first.value, second.value, "{text}");
            assert_eq!(first.modifier, second.modifier, "{text}");
            assert_eq!(first.is_uncertain, second.is_uncertain, "{text}");
        }
    }

    #[test]
    fn test_uncertainty_range() {
        let v = UncertaintyValueValidator::new(InclusiveRange::new(0.0, 1.0));
        for inside in ["0", "0.0", "0.5", "1", "1.0", "0.999"] {
            let expected: f64 = inside.parse().unwrap();
            assert_eq!(v.validate(inside).unwrap(), expected);
        }
        for outside in ["-0.001", "1.0001", "2", "-1", "nan", "x"] {
            assert!(v.validate(outside).is_err(), "{outside} should be rejected");
        }
        assert!(v.validate("").is_err());
        assert_eq!(
            UncertaintyValueValidator::optional(InclusiveRange::new(0.0, 1.0))
                .validate("")
                .unwrap(),
            0.0
        );
    }

    #[test]
    fn test_valflag() {
        let download = ValflagValidator::new(ValflagValidator::DOWNLOAD_FLAGS);
        assert_eq!(download.validate("D").unwrap(), ValidationType::Discrepant);
        assert_eq!(download.validate("g").unwrap(), ValidationType::Good);
        assert_eq!(download.validate("P").unwrap(), ValidationType::Prevalidation);
        assert_eq!(download.validate("").unwrap(), ValidationType::Good);
        assert!(download.validate("X").is_err());

        let simple = ValflagValidator::new(ValflagValidator::SIMPLE_FLAGS);
        assert_eq!(simple.validate("D").unwrap(), ValidationType::Discrepant);
        assert!(simple.validate("G").is_err());
    }

    #[test]
    fn test_misc_fields() {
        assert_eq!(MTypeValidator.validate("").unwrap(), MType::Std);
        assert_eq!(MTypeValidator.validate("diff").unwrap(), MType::Diff);
        assert!(MTypeValidator.validate("abs").is_err());

        assert!(TransformedValidator.validate("yes").unwrap());
        assert!(!TransformedValidator.validate("").unwrap());
        assert!(TransformedValidator.validate("maybe").is_err());

        assert_eq!(ObserverCodeValidator.validate(" ABC ").unwrap(), Some("ABC".into()));
        assert_eq!(ObserverCodeValidator.validate("").unwrap(), None);
        assert!(ObserverCodeValidator.validate("has space").is_err());

        assert_eq!(OptionalFieldValidator.validate("  ").unwrap(), None);
        assert!(NonEmptyFieldValidator::new("name").validate(" ").is_err());
    }
}
