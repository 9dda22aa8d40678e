//! # Observation record model
//!
//! Every retriever in the crate produces the same two record kinds:
//!
//! * [`ValidObservation`] – an accepted brightness measurement (date, magnitude, band,
//!   observer metadata and an open map of source specific [`ObservationDetail`]s),
//! * [`InvalidObservation`] – the raw offending input of a rejected record and the
//!   reason it was rejected.
//!
//! Per-record parse functions return a [`ParsedRecord`], the tagged union of both, so
//! that a single malformed record never aborts a retrieval.
//!
//! ## Magnitudes
//! -----------------
//! [`Magnitude`] bundles the value, its uncertainty, a [`MagnitudeModifier`]
//! (fainter-than / brighter-than limits) and an "uncertain" flag. Its `Display` form
//! (`<12.3:` for an uncertain fainter-than estimate) is accepted back by
//! [`MagnitudeFieldValidator`](crate::validation::MagnitudeFieldValidator).
//!
//! ## Time flavours
//! -----------------
//! The primary Julian Day of an observation may be geocentric, heliocentric or
//! barycentric depending on the source. The flavour is tracked per retrieval with
//! [`JdFlavour`]; an additional heliocentric JD may be attached to AAVSO records.
pub mod display;
pub mod series;

use std::fmt;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::constants::{JulianDay, Mag};
use crate::time::jd_to_calendar_date;

pub use series::{Rgb, SeriesRegistry, SeriesType};

/// Limit semantics of a magnitude.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MagnitudeModifier {
    #[default]
    NoDelta,
    FainterThan,
    BrighterThan,
}

impl MagnitudeModifier {
    pub fn prefix(&self) -> &'static str {
        match self {
            MagnitudeModifier::NoDelta => "",
            MagnitudeModifier::FainterThan => "<",
            MagnitudeModifier::BrighterThan => ">",
        }
    }
}

/// A magnitude value with its uncertainty and qualifiers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnitude {
    pub value: Mag,
    pub uncertainty: f64,
    pub modifier: MagnitudeModifier,
    pub is_uncertain: bool,
}

impl Magnitude {
    pub fn new(value: Mag, uncertainty: f64) -> Self {
        Magnitude {
            value,
            uncertainty,
            modifier: MagnitudeModifier::NoDelta,
            is_uncertain: false,
        }
    }

    pub fn with_modifier(mut self, modifier: MagnitudeModifier) -> Self {
        self.modifier = modifier;
        self
    }

    pub fn with_uncertain(mut self, is_uncertain: bool) -> Self {
        self.is_uncertain = is_uncertain;
        self
    }

    pub fn is_fainter_than(&self) -> bool {
        self.modifier == MagnitudeModifier::FainterThan
    }

    pub fn is_brighter_than(&self) -> bool {
        self.modifier == MagnitudeModifier::BrighterThan
    }
}

impl fmt::Display for Magnitude {
    /// `[<|>]value[:]`; the uncertainty is not part of the textual form.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.modifier.prefix(),
            self.value,
            if self.is_uncertain { ":" } else { "" }
        )
    }
}

/// AAVSO validation state of an observation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValidationType {
    #[default]
    Good,
    Discrepant,
    Prevalidation,
    Bad,
}

impl ValidationType {
    /// Map an AID validation letter.
    ///
    /// V, Z and U are validated, T and N discrepant, P pre-validated; any other value,
    /// including an empty one, is treated as bad.
    pub fn from_aid_flag(flag: &str) -> Self {
        match flag.trim().to_ascii_uppercase().as_str() {
            "V" | "Z" | "U" => ValidationType::Good,
            "T" | "N" => ValidationType::Discrepant,
            "P" => ValidationType::Prevalidation,
            _ => ValidationType::Bad,
        }
    }

    /// Map a validation letter of the AAVSO download file format.
    ///
    /// Same as [`Self::from_aid_flag`] except that `G` means good and `D` discrepant.
    pub fn from_download_flag(flag: &str) -> Option<Self> {
        match flag.trim().to_ascii_uppercase().as_str() {
            "" | "G" | "V" | "Z" | "U" => Some(ValidationType::Good),
            "D" | "T" | "N" => Some(ValidationType::Discrepant),
            "P" => Some(ValidationType::Prevalidation),
            _ => None,
        }
    }
}

impl fmt::Display for ValidationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValidationType::Good => "Good",
            ValidationType::Discrepant => "Discrepant",
            ValidationType::Prevalidation => "Prevalidated",
            ValidationType::Bad => "Bad",
        };
        f.write_str(label)
    }
}

/// Magnitude type: standard, differential or step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MType {
    #[default]
    Std,
    Diff,
    Step,
}

impl MType {
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "" | "STD" | "0" => Some(MType::Std),
            "DIFF" | "1" => Some(MType::Diff),
            "STEP" | "2" => Some(MType::Step),
            _ => None,
        }
    }
}

impl fmt::Display for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            MType::Std => "STD",
            MType::Diff => "DIFF",
            MType::Step => "STEP",
        })
    }
}

/// Reference frame of the primary Julian Day of a retrieval.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JdFlavour {
    #[default]
    Jd,
    Hjd,
    Bjd,
    Unknown,
}

impl JdFlavour {
    pub fn label(&self) -> &'static str {
        match self {
            JdFlavour::Jd => "JD",
            JdFlavour::Hjd => "HJD",
            JdFlavour::Bjd => "BJD",
            JdFlavour::Unknown => "Time",
        }
    }
}

/// Julian Day with its calendar rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DateInfo {
    pub jd: JulianDay,
    pub calendar_date: String,
}

impl DateInfo {
    pub fn new(jd: JulianDay) -> Self {
        DateInfo {
            jd,
            calendar_date: jd_to_calendar_date(jd),
        }
    }
}

/// Typed value of an [`ObservationDetail`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DetailValue {
    Int(i64),
    Real(f64),
    Text(String),
    Bool(bool),
}

impl fmt::Display for DetailValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DetailValue::Int(v) => write!(f, "{v}"),
            DetailValue::Real(v) => write!(f, "{v}"),
            DetailValue::Text(v) => f.write_str(v),
            DetailValue::Bool(v) => write!(f, "{v}"),
        }
    }
}

/// Source specific annotation of a valid observation (Gaia flux, TESS quality flags, …).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObservationDetail {
    pub title: String,
    pub value: DetailValue,
}

/// An accepted brightness measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidObservation {
    /// 1-based position in the source, or a database row id.
    pub record_number: usize,
    pub date_info: DateInfo,
    pub magnitude: Magnitude,
    pub band: SeriesType,
    pub name: String,
    pub obs_code: Option<String>,
    pub validation_type: ValidationType,
    pub transformed: bool,
    pub mtype: MType,
    /// Heliocentric JD when supplied next to the primary JD.
    pub hjd: Option<DateInfo>,
    pub comment_code: Option<String>,
    pub comp_star1: Option<String>,
    pub comp_star2: Option<String>,
    pub charts: Option<String>,
    pub comments: Option<String>,
    pub airmass: Option<String>,
    pub cmag: Option<String>,
    pub kmag: Option<String>,
    pub obs_type: Option<String>,
    pub group: Option<String>,
    pub ads_reference: Option<String>,
    pub digitizer: Option<String>,
    pub credit: Option<String>,
    pub affiliation: Option<String>,
    /// Source specific annotations, in the order they were added.
    pub details: IndexMap<String, ObservationDetail>,
}

impl ValidObservation {
    pub fn new(record_number: usize, jd: JulianDay, magnitude: Magnitude, band: SeriesType) -> Self {
        ValidObservation {
            record_number,
            date_info: DateInfo::new(jd),
            magnitude,
            band,
            name: String::new(),
            obs_code: None,
            validation_type: ValidationType::Good,
            transformed: false,
            mtype: MType::Std,
            hjd: None,
            comment_code: None,
            comp_star1: None,
            comp_star2: None,
            charts: None,
            comments: None,
            airmass: None,
            cmag: None,
            kmag: None,
            obs_type: None,
            group: None,
            ads_reference: None,
            digitizer: None,
            credit: None,
            affiliation: None,
            details: IndexMap::new(),
        }
    }

    #[inline]
    pub fn jd(&self) -> JulianDay {
        self.date_info.jd
    }

    #[inline]
    pub fn mag(&self) -> Mag {
        self.magnitude.value
    }

    #[inline]
    pub fn uncertainty(&self) -> f64 {
        self.magnitude.uncertainty
    }

    pub fn is_discrepant(&self) -> bool {
        self.validation_type == ValidationType::Discrepant
    }

    /// Toggle the discrepant state; clearing it marks the observation as good.
    pub fn set_discrepant(&mut self, discrepant: bool) {
        self.validation_type = if discrepant {
            ValidationType::Discrepant
        } else {
            ValidationType::Good
        };
    }

    pub fn add_detail(&mut self, key: &str, title: &str, value: DetailValue) {
        self.details.insert(
            key.to_string(),
            ObservationDetail {
                title: title.to_string(),
                value,
            },
        );
    }

    pub fn detail(&self, key: &str) -> Option<&DetailValue> {
        self.details.get(key).map(|d| &d.value)
    }
}

/// A rejected record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvalidObservation {
    pub record_number: usize,
    /// The offending line or a description of the record.
    pub input: String,
    pub error: String,
    /// Short tag of the producing source ("Gaia", "ZTF", …).
    pub source: Option<String>,
}

impl InvalidObservation {
    pub fn new(record_number: usize, input: impl Into<String>, error: impl Into<String>) -> Self {
        InvalidObservation {
            record_number,
            input: input.into(),
            error: error.into(),
            source: None,
        }
    }

    pub fn with_source(mut self, source: &str) -> Self {
        self.source = Some(source.to_string());
        self
    }
}

/// Result of parsing one record.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedRecord {
    Valid(ValidObservation),
    Invalid(InvalidObservation),
}

impl ParsedRecord {
    pub fn is_valid(&self) -> bool {
        matches!(self, ParsedRecord::Valid(_))
    }
}

impl From<ValidObservation> for ParsedRecord {
    fn from(ob: ValidObservation) -> Self {
        ParsedRecord::Valid(ob)
    }
}

impl From<InvalidObservation> for ParsedRecord {
    fn from(ob: InvalidObservation) -> Self {
        ParsedRecord::Invalid(ob)
    }
}

#[cfg(test)]
mod observation_test {
    use super::*;

    #[test]
    fn test_magnitude_display() {
        let mag = Magnitude::new(12.3, 0.0)
            .with_modifier(MagnitudeModifier::FainterThan)
            .with_uncertain(true);
        assert_eq!(mag.to_string(), "<12.3:");
        assert_eq!(Magnitude::new(-0.5, 0.01).to_string(), "-0.5");
    }

    #[test]
    fn test_discrepant_toggle() {
        let mut ob = ValidObservation::new(1, 2_450_000.5, Magnitude::new(10.0, 0.1), SeriesType::VISUAL);
        assert!(!ob.is_discrepant());
        ob.set_discrepant(true);
        assert!(ob.is_discrepant());
        assert_eq!(ob.validation_type, ValidationType::Discrepant);
        ob.set_discrepant(false);
        assert_eq!(ob.validation_type, ValidationType::Good);
    }

    #[test]
    fn test_aid_flag_mapping() {
        assert_eq!(ValidationType::from_aid_flag("V"), ValidationType::Good);
        assert_eq!(ValidationType::from_aid_flag("z"), ValidationType::Good);
        assert_eq!(ValidationType::from_aid_flag("U"), ValidationType::Good);
        assert_eq!(ValidationType::from_aid_flag("T"), ValidationType::Discrepant);
        assert_eq!(ValidationType::from_aid_flag("N"), ValidationType::Discrepant);
        assert_eq!(ValidationType::from_aid_flag("P"), ValidationType::Prevalidation);
        assert_eq!(ValidationType::from_aid_flag("Y"), ValidationType::Bad);
        assert_eq!(ValidationType::from_aid_flag(""), ValidationType::Bad);
    }

    #[test]
    fn test_details() {
        let mut ob = ValidObservation::new(1, 2_450_000.5, Magnitude::new(10.0, 0.1), SeriesType::VISUAL);
        ob.add_detail("FLUX", "Flux", DetailValue::Real(1234.5));
        assert_eq!(ob.detail("FLUX"), Some(&DetailValue::Real(1234.5)));
        assert!(ob.detail("QUALITY").is_none());
    }

    #[test]
    fn test_details_keep_insertion_order() {
        let mut ob = ValidObservation::new(1, 2_450_000.5, Magnitude::new(10.0, 0.1), SeriesType::VISUAL);
        ob.add_detail("HEADER_MAG", "TESS Magnitude", DetailValue::Real(9.5));
        ob.add_detail("FLUX", "Flux", DetailValue::Real(1234.5));
        ob.add_detail("CATFLAGS", "catflags", DetailValue::Int(0));
        ob.add_detail("FLUX", "Flux", DetailValue::Real(99.0));

        let keys: Vec<&str> = ob.details.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["HEADER_MAG", "FLUX", "CATFLAGS"]);
        assert_eq!(ob.detail("FLUX"), Some(&DetailValue::Real(99.0)));
    }
}
