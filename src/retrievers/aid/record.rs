//! Field-by-field extraction of one AID observation.
//!
//! Both wire variants end up as a [`NodeSequence`], an ordered list of
//! `(name, value)` pairs: CSV columns, XML attributes, or XML child elements. The
//! [`AidRecordBuilder`] consumes the pairs one at a time. A field that fails to parse
//! is logged and left unset, so that the record can still be judged as a whole.
use std::fmt;

use crate::observations::{
    DateInfo, InvalidObservation, MType, Magnitude, MagnitudeModifier, ParsedRecord, SeriesRegistry,
    SeriesType, ValidObservation, ValidationType,
};
use crate::validation::{parse_real, FieldValidator, InclusiveRange, JulianDayValidator, MagnitudeFieldValidator};
use crate::varstar_errors::ObservationValidationError;

/// Ordered `(name, value)` pairs describing one record.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NodeSequence {
    nodes: Vec<(String, String)>,
}

impl NodeSequence {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.nodes.push((name.into(), value.into()));
    }

    /// First value of `name`, compared case-insensitively.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.nodes
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.nodes.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl fmt::Display for NodeSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (name, value)) in self.nodes.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{name}={value}")?;
        }
        Ok(())
    }
}

/// A record as read from a page, before validation.
#[derive(Debug, Clone)]
pub struct RawAidRecord {
    /// The text of the record as received (CSV line or serialized node sequence).
    pub raw: String,
    pub fields: NodeSequence,
}

fn parse_flag(field: &'static str, value: &str) -> Result<bool, ObservationValidationError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "" | "0" | "false" | "no" => Ok(false),
        other => Err(ObservationValidationError::InvalidNumber {
            field,
            value: other.to_string(),
        }),
    }
}

fn text(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

/// Best-effort accumulator of the fields of one observation.
#[derive(Debug, Clone)]
pub struct AidRecordBuilder {
    uncertainty_range: InclusiveRange,
    id: Option<String>,
    jd: Option<f64>,
    magnitude: Option<Magnitude>,
    uncertainty: Option<f64>,
    fainter_than: bool,
    uncertain: bool,
    band: Option<SeriesType>,
    transformed: bool,
    hjd: Option<f64>,
    validation: Option<ValidationType>,
    mtype: MType,
    obs_code: Option<String>,
    obs_type: Option<String>,
    airmass: Option<String>,
    comp_star1: Option<String>,
    comp_star2: Option<String>,
    cmag: Option<String>,
    kmag: Option<String>,
    group: Option<String>,
    charts: Option<String>,
    comment_code: Option<String>,
    comments: Option<String>,
    credit: Option<String>,
    ads_reference: Option<String>,
    digitizer: Option<String>,
    name: Option<String>,
}

impl AidRecordBuilder {
    pub fn new(uncertainty_range: InclusiveRange) -> Self {
        AidRecordBuilder {
            uncertainty_range,
            id: None,
            jd: None,
            magnitude: None,
            // A record without an uncertainty column has a zero uncertainty.
            uncertainty: Some(0.0),
            fainter_than: false,
            uncertain: false,
            band: None,
            transformed: false,
            hjd: None,
            validation: None,
            mtype: MType::Std,
            obs_code: None,
            obs_type: None,
            airmass: None,
            comp_star1: None,
            comp_star2: None,
            cmag: None,
            kmag: None,
            group: None,
            charts: None,
            comment_code: None,
            comments: None,
            credit: None,
            ads_reference: None,
            digitizer: None,
            name: None,
        }
    }

    /// Apply one field. Unknown names are ignored.
    pub fn set(&mut self, name: &str, value: &str) -> Result<(), ObservationValidationError> {
        match name.to_ascii_lowercase().as_str() {
            "obsid" | "id" => self.id = text(value),
            "jd" => self.jd = Some(JulianDayValidator::new().parse(value)?),
            "mag" => {
                // Unset first: a bad value must leave the record without magnitude.
                self.magnitude = None;
                let magnitude = MagnitudeFieldValidator::new().validate(value)?;
                if magnitude.is_fainter_than() {
                    self.fainter_than = true;
                }
                self.uncertain |= magnitude.is_uncertain;
                self.magnitude = Some(magnitude);
            }
            "uncert" | "uncertainty" => {
                if value.trim().is_empty() {
                    return Ok(());
                }
                self.uncertainty = None;
                let uncertainty = parse_real("uncertainty", value)?;
                self.uncertainty = Some(self.uncertainty_range.check("uncertainty", uncertainty)?);
            }
            "uncertain" => self.uncertain = parse_flag("uncertain", value)?,
            "fainterthan" => self.fainter_than = parse_flag("fainterThan", value)?,
            "band" => {
                let short_name = value.trim();
                let registry = SeriesRegistry::builtin();
                self.band = Some(match registry.by_short_name(short_name) {
                    Some(series) => series.clone(),
                    None => {
                        log::debug!("unknown AID band '{short_name}', using Unspecified");
                        SeriesType::UNSPECIFIED
                    }
                });
            }
            "transformed" => self.transformed = parse_flag("transformed", value)?,
            "hjd" => {
                if !value.trim().is_empty() {
                    self.hjd = Some(JulianDayValidator::new().parse(value)?);
                }
            }
            "val" | "valflag" => self.validation = Some(ValidationType::from_aid_flag(value)),
            "mtype" => {
                self.mtype = MType::from_code(value)
                    .ok_or_else(|| ObservationValidationError::InvalidMType(value.trim().to_string()))?
            }
            "by" | "obscode" => self.obs_code = text(value),
            "obstype" => self.obs_type = text(value),
            "airmass" => self.airmass = text(value),
            "compstar1" | "comp1" => self.comp_star1 = text(value),
            "compstar2" | "comp2" => self.comp_star2 = text(value),
            "cmag" => self.cmag = text(value),
            "kmag" => self.kmag = text(value),
            "group" => self.group = text(value),
            "charts" => self.charts = text(value),
            "comcode" | "commentcode" => self.comment_code = text(value),
            "comment" | "comments" => self.comments = text(value),
            "credit" => self.credit = text(value),
            "adsref" | "pubref" => self.ads_reference = text(value),
            "digitizer" => self.digitizer = text(value),
            "starname" | "name" => self.name = text(value),
            _ => {}
        }
        Ok(())
    }

    /// Apply every field of `fields`, logging the ones that fail.
    pub fn apply(&mut self, fields: &NodeSequence, position: usize) {
        for (name, value) in fields.iter() {
            if let Err(e) = self.set(name, value) {
                log::warn!("Error for column {name}: \"{value}\" (record {position}): {e}");
            }
        }
    }

    /// Judge the record.
    ///
    /// Arguments
    /// -----------------
    /// * `position`: 1-based position of the record in the retrieval, used when the id is
    ///   not numeric.
    /// * `raw`: the record as received, kept for diagnostics.
    /// * `default_name`: star name used when the record carries none.
    pub fn build(self, position: usize, raw: &str, default_name: &str) -> ParsedRecord {
        let Some(id) = self.id else {
            return InvalidObservation::new(position, raw, "Missing observation id").into();
        };
        let record_number = id.parse::<usize>().unwrap_or(position);

        let validation = self.validation.unwrap_or(ValidationType::Good);
        let (Some(jd), Some(magnitude), Some(uncertainty)) = (self.jd, self.magnitude, self.uncertainty) else {
            return InvalidObservation::new(record_number, id, "Invalid").into();
        };
        if validation == ValidationType::Bad {
            return InvalidObservation::new(record_number, id, "Invalid").into();
        }

        let modifier = if self.fainter_than {
            MagnitudeModifier::FainterThan
        } else {
            magnitude.modifier
        };
        let magnitude = Magnitude::new(magnitude.value, uncertainty)
            .with_modifier(modifier)
            .with_uncertain(self.uncertain);

        let mut ob = ValidObservation::new(
            record_number,
            jd,
            magnitude,
            self.band.unwrap_or(SeriesType::UNSPECIFIED),
        );
        ob.name = self.name.unwrap_or_else(|| default_name.to_string());
        ob.validation_type = validation;
        ob.transformed = self.transformed;
        ob.mtype = self.mtype;
        ob.hjd = self.hjd.map(DateInfo::new);
        ob.obs_code = self.obs_code;
        ob.obs_type = self.obs_type;
        ob.airmass = self.airmass;
        ob.comp_star1 = self.comp_star1;
        ob.comp_star2 = self.comp_star2;
        ob.cmag = self.cmag;
        ob.kmag = self.kmag;
        ob.group = self.group;
        ob.charts = self.charts;
        ob.comment_code = self.comment_code;
        ob.comments = self.comments;
        ob.credit = self.credit;
        ob.ads_reference = self.ads_reference;
        ob.digitizer = self.digitizer;
        ob.into()
    }
}

impl RawAidRecord {
    pub fn into_record(self, position: usize, default_name: &str, uncertainty_range: InclusiveRange) -> ParsedRecord {
        let mut builder = AidRecordBuilder::new(uncertainty_range);
        builder.apply(&self.fields, position);
        builder.build(position, &self.raw, default_name)
    }
}
