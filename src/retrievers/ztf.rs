//! # ZTF light curves
//!
//! Reads the ZTF light-curve text exported by IRSA (tab or comma separated), or the same
//! table copied out of an HTML page, where cells end with spaces before the tab.
//!
//! The header is searched line by line; it must contain the columns of
//! [`REQUIRED_COLUMNS`] in any order. Every following non blank line is one observation:
//!
//! | column       | use                                   |
//! |--------------|---------------------------------------|
//! | `oid`        | object name                           |
//! | `hjd`        | heliocentric Julian Day               |
//! | `mag`        | magnitude                             |
//! | `magerr`     | uncertainty, within `[0, 1]`          |
//! | `filtercode` | `zg`, `zr`, `zi` (anything else: unknown) |
//! | `catflags`   | integer detail `CATFLAGS`             |
//! | `exptime`    | real detail `EXPTIME`                 |
//! | `airmass`    | real detail `AIRMASS`                 |
use std::io::BufRead;

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::UNCERTAINTY_RANGE;
use crate::observations::{DetailValue, InvalidObservation, JdFlavour, MType, Rgb, SeriesRegistry, SeriesType, ValidObservation};
use crate::retrievers::{read_lines, ObservationCollector, ObservationRetriever, RetrievalContext, RetrievedObservations};
use crate::validation::{FieldValidator, JulianDayValidator, MagnitudeFieldValidator, UncertaintyValueValidator};
use crate::varstar_errors::{ObservationReadError, ObservationValidationError};

pub const REQUIRED_COLUMNS: [&str; 8] = ["oid", "hjd", "mag", "magerr", "catflags", "filtercode", "exptime", "airmass"];

static SPACED_TAB: Lazy<Regex> = Lazy::new(|| Regex::new(" *\t").expect("valid spaced tab regex"));

/// Field separator of a ZTF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZtfDelimiter {
    Tab,
    Comma,
    /// Spaces followed by a tab, as produced by copying an HTML table.
    SpacedTab,
}

impl ZtfDelimiter {
    pub fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        match self {
            ZtfDelimiter::Tab => line.split('\t').collect(),
            ZtfDelimiter::Comma => line.split(',').collect(),
            ZtfDelimiter::SpacedTab => SPACED_TAB.split(line).collect(),
        }
    }
}

/// Column positions of the required fields, in [`REQUIRED_COLUMNS`] order.
#[derive(Debug, Clone, Copy)]
struct ZtfColumns([usize; 8]);

impl ZtfColumns {
    fn find(fields: &[&str]) -> Option<Self> {
        let mut positions = [0usize; 8];
        for (slot, name) in positions.iter_mut().zip(REQUIRED_COLUMNS) {
            *slot = fields.iter().position(|f| *f == name)?;
        }
        Some(ZtfColumns(positions))
    }

    fn get<'f>(&self, fields: &[&'f str], name: &'static str) -> Result<&'f str, ObservationValidationError> {
        REQUIRED_COLUMNS
            .iter()
            .position(|c| *c == name)
            .and_then(|i| fields.get(self.0[i]))
            .map(|f| f.trim())
            .ok_or(ObservationValidationError::MissingField(name))
    }
}

/// Detect the header line: the first delimiter (tab, comma, spaced tab) exposing every
/// required column wins.
fn detect_header(line: &str) -> Option<(ZtfDelimiter, ZtfColumns)> {
    [ZtfDelimiter::Tab, ZtfDelimiter::Comma, ZtfDelimiter::SpacedTab]
        .into_iter()
        .find_map(|d| ZtfColumns::find(&d.split(line)).map(|c| (d, c)))
}

/// ZTF passbands.
#[derive(Debug, Clone)]
pub struct ZtfSeries {
    pub g: SeriesType,
    pub r: SeriesType,
    pub i: SeriesType,
    pub unknown: SeriesType,
}

impl ZtfSeries {
    /// Register the ZTF series in `registry`.
    pub fn register(registry: &mut SeriesRegistry) -> Self {
        ZtfSeries {
            g: registry.register("ZTF zg", "ZTF zg", Rgb(0, 255, 0)),
            r: registry.register("ZTF zr", "ZTF zr", Rgb(255, 0, 0)),
            i: registry.register("ZTF zi", "ZTF zi", Rgb(192, 64, 0)),
            unknown: registry.register("ZTF unknown", "ZTF unknown", Rgb(255, 255, 0)),
        }
    }

    pub fn for_filter(&self, filtercode: &str) -> &SeriesType {
        match filtercode {
            "zg" => &self.g,
            "zr" => &self.r,
            "zi" => &self.i,
            _ => &self.unknown,
        }
    }
}

/// Retriever over an in-memory copy of a ZTF light-curve file.
pub struct ZtfRetriever {
    lines: Vec<String>,
    registry: SeriesRegistry,
    series: ZtfSeries,
    objects: Vec<String>,
}

impl ZtfRetriever {
    pub fn from_reader<R: BufRead>(reader: R) -> Result<Self, ObservationReadError> {
        let mut registry = SeriesRegistry::with_builtin();
        let series = ZtfSeries::register(&mut registry);
        Ok(ZtfRetriever {
            lines: read_lines(reader)?,
            registry,
            series,
            objects: Vec::new(),
        })
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, ObservationReadError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(std::io::BufReader::new(file))
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    /// Parse one data line.
    ///
    /// Arguments
    /// -----------------
    /// * `fields`: the line split with the header delimiter.
    /// * `record_number`: 1-based line number.
    fn parse_fields(
        &self,
        columns: &ZtfColumns,
        fields: &[&str],
        record_number: usize,
    ) -> Result<ValidObservation, ObservationValidationError> {
        let field = |name| columns.get(fields, name);

        let name = field("oid")?;
        let jd = JulianDayValidator::new().parse(field("hjd")?)?;
        let mut magnitude = MagnitudeFieldValidator::new().validate(field("mag")?)?;
        magnitude.uncertainty = UncertaintyValueValidator::new(UNCERTAINTY_RANGE.into()).validate(field("magerr")?)?;
        let band = self.series.for_filter(field("filtercode")?).clone();

        let mut ob = ValidObservation::new(record_number, jd, magnitude, band);
        ob.name = name.to_string();
        ob.mtype = MType::Std;

        if let Ok(flags) = field("catflags")?.parse::<i64>() {
            ob.add_detail("CATFLAGS", "catflags", DetailValue::Int(flags));
        }
        for key in ["exptime", "airmass"] {
            if let Ok(value) = field(key)?.parse::<f64>() {
                ob.add_detail(&key.to_ascii_uppercase(), key, DetailValue::Real(value));
            }
        }
        Ok(ob)
    }
}

impl ObservationRetriever for ZtfRetriever {
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError> {
        let mut collector = ObservationCollector::for_source("ZTF");
        self.objects.clear();
        if self.lines.is_empty() {
            return Ok(collector.finish(JdFlavour::Hjd, self.source_name(), self.source_type(), false));
        }
        ctx.set_total(self.lines.len());

        let mut header: Option<(ZtfDelimiter, ZtfColumns)> = None;
        let mut interrupted = false;
        for (i, line) in self.lines.iter().enumerate() {
            if ctx.was_cancelled() {
                interrupted = true;
                break;
            }
            ctx.increment_progress(1);

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some((delimiter, columns)) = header else {
                header = detect_header(line);
                if let Some((delimiter, _)) = header {
                    log::debug!("ZTF header found on line {}, {delimiter:?} separated", i + 1);
                }
                continue;
            };

            match self.parse_fields(&columns, &delimiter.split(line), i + 1) {
                Ok(ob) => {
                    if !self.objects.contains(&ob.name) {
                        self.objects.push(ob.name.clone());
                    }
                    collector.add_valid(ob);
                }
                Err(e) => collector.add_invalid(InvalidObservation::new(i + 1, line, e.to_string())),
            }
        }
        ctx.finish();

        if !interrupted {
            if header.is_none() {
                return Err(ObservationReadError::HeaderNotFound("ZTF"));
            }
            collector.ensure_any_valid()?;
        }
        Ok(collector.finish(JdFlavour::Hjd, self.source_name(), self.source_type(), interrupted))
    }

    fn number_of_records(&self) -> Option<usize> {
        Some(self.lines.len())
    }

    /// "ZTF object", "ZTF object <oid>" or "ZTF objects <oid>, <oid>, …".
    fn source_name(&self) -> String {
        match self.objects.len() {
            0 => "ZTF object".to_string(),
            1 => format!("ZTF object {}", self.objects[0]),
            _ => format!("ZTF objects {}", self.objects.join(", ")),
        }
    }

    fn source_type(&self) -> String {
        "ZTF Format".to_string()
    }
}
