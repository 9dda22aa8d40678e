//! # Generic delimited text retriever
//!
//! Reads a line oriented observation file in one of two layouts, recognised from the
//! number of fields of the first data line:
//!
//! * **Simple** (2 to 5 fields): `JD, MAG, [UNCERTAINTY], [OBSCODE], [VALFLAG]`.
//!   Observations are visual, the only accepted validation flag is `D`.
//! * **AAVSO download** (more than 5 fields): the column order of an AAVSO
//!   database export, see [`DownloadField`].
//!
//! Fields may be separated by tabs, commas or runs of spaces (tried in that order).
//! Lines starting with `#` and blank lines are skipped, as is a leading column header
//! line. Only standard (`STD`) magnitudes are kept; differential and step
//! magnitudes are dropped without being reported as invalid unless
//! [`TextFormatOptions::keep_non_std`] is set.
use std::io::BufRead;

use camino::Utf8Path;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::UNCERTAINTY_RANGE;
use crate::observations::{InvalidObservation, JdFlavour, MType, SeriesRegistry, SeriesType, ValidObservation};
use crate::retrievers::{read_lines, ObservationCollector, ObservationRetriever, RetrievalContext, RetrievedObservations};
use crate::validation::{
    FieldValidator, InclusiveRange, JulianDayValidator, MTypeValidator, MagnitudeFieldValidator,
    NonEmptyFieldValidator, ObserverCodeValidator, OptionalFieldValidator, TransformedValidator,
    UncertaintyValueValidator, ValflagValidator,
};
use crate::varstar_errors::{ObservationReadError, ObservationValidationError};

static SPACES: Lazy<Regex> = Lazy::new(|| Regex::new(" +").expect("valid whitespace regex"));
static COLUMN_HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z].*$").expect("valid header regex"));

/// Field separator of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delimiter {
    Tab,
    Comma,
    Spaces,
}

impl Delimiter {
    /// Detect the separator of `line`: the first one yielding more than one field.
    pub fn detect(line: &str) -> Option<Self> {
        [Delimiter::Tab, Delimiter::Comma, Delimiter::Spaces]
            .into_iter()
            .find(|d| d.split(line).len() > 1)
    }

    pub fn split<'l>(&self, line: &'l str) -> Vec<&'l str> {
        match self {
            Delimiter::Tab => line.split('\t').collect(),
            Delimiter::Comma => line.split(',').collect(),
            Delimiter::Spaces => SPACES.split(line.trim()).collect(),
        }
    }
}

/// Column layout of a text file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextLayout {
    Simple,
    AavsoDownload,
}

impl TextLayout {
    /// Allowed field counts.
    pub fn field_range(&self) -> (usize, usize) {
        match self {
            TextLayout::Simple => (2, 5),
            TextLayout::AavsoDownload => (6, DownloadField::COUNT),
        }
    }

    fn from_field_count(n: usize) -> Option<Self> {
        match n {
            2..=5 => Some(TextLayout::Simple),
            n if n > 5 => Some(TextLayout::AavsoDownload),
            _ => None,
        }
    }
}

/// Columns of the AAVSO download layout, in file order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(usize)]
pub enum DownloadField {
    Jd,
    Magnitude,
    Uncertainty,
    HqUncertainty,
    Band,
    ObserverCode,
    CommentCode,
    CompStar1,
    CompStar2,
    Charts,
    Comments,
    Transformed,
    Airmass,
    Valflag,
    CMag,
    KMag,
    Hjd,
    Name,
    Affiliation,
    MType,
    Group,
    AdsReference,
    Digitizer,
    Credit,
}

impl DownloadField {
    pub const COUNT: usize = 24;
}

/// Options of the text retriever.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextFormatOptions {
    pub uncertainty_range: InclusiveRange,
    /// Keep DIFF and STEP magnitudes instead of dropping them.
    pub keep_non_std: bool,
}

impl Default for TextFormatOptions {
    fn default() -> Self {
        TextFormatOptions {
            uncertainty_range: UNCERTAINTY_RANGE.into(),
            keep_non_std: false,
        }
    }
}

impl TextFormatOptions {
    pub fn uncertainty_range(mut self, range: InclusiveRange) -> Self {
        self.uncertainty_range = range;
        self
    }

    pub fn keep_non_std(mut self, keep: bool) -> Self {
        self.keep_non_std = keep;
        self
    }
}

/// Retriever over an in-memory copy of a text file.
pub struct TextFormatRetriever {
    lines: Vec<String>,
    name: String,
    options: TextFormatOptions,
}

impl TextFormatRetriever {
    /// Read every line of `reader`; `name` identifies the source in diagnostics.
    pub fn from_reader<R: BufRead>(reader: R, name: &str) -> Result<Self, ObservationReadError> {
        Ok(TextFormatRetriever {
            lines: read_lines(reader)?,
            name: name.to_string(),
            options: TextFormatOptions::default(),
        })
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, ObservationReadError> {
        let file = std::fs::File::open(path)?;
        let name = path.file_stem().unwrap_or(path.as_str());
        Self::from_reader(std::io::BufReader::new(file), name)
    }

    pub fn with_options(mut self, options: TextFormatOptions) -> Self {
        self.options = options;
        self
    }

    /// Delimiter and layout of the file, `None` if it has no data line.
    pub fn analyse(&self) -> Result<Option<(Delimiter, TextLayout)>, ObservationReadError> {
        let Some(first) = self.lines.iter().map(|l| l.trim()).find(|l| !is_skippable(l)) else {
            return Ok(None);
        };
        let unknown = || ObservationReadError::UnknownFormat(self.name.clone());
        let delimiter = Delimiter::detect(first).ok_or_else(unknown)?;
        let layout = TextLayout::from_field_count(delimiter.split(first).len()).ok_or_else(unknown)?;
        log::debug!("{}: {layout:?} layout, {delimiter:?} separated", self.name);
        Ok(Some((delimiter, layout)))
    }

    fn parse_line(
        &self,
        parser: &LineParser,
        record_number: usize,
        fields: &[&str],
    ) -> Result<Option<ValidObservation>, ObservationValidationError> {
        let (min, max) = parser.layout.field_range();
        if fields.len() < min || fields.len() > max {
            return Err(ObservationValidationError::FieldCount {
                min,
                max,
                found: fields.len(),
            });
        }
        match parser.layout {
            TextLayout::Simple => parser.simple(record_number, fields, &self.name).map(Some),
            TextLayout::AavsoDownload => {
                let ob = parser.download(record_number, fields, &self.name)?;
                Ok((self.options.keep_non_std || ob.mtype == MType::Std).then_some(ob))
            }
        }
    }
}

fn is_skippable(line: &str) -> bool {
    line.is_empty() || line.starts_with('#')
}

/// Validators of one retrieval.
struct LineParser {
    layout: TextLayout,
    jd: JulianDayValidator,
    optional_jd: JulianDayValidator,
    magnitude: MagnitudeFieldValidator,
    uncertainty: UncertaintyValueValidator,
    valflag: ValflagValidator,
    band: NonEmptyFieldValidator,
}

impl LineParser {
    fn new(layout: TextLayout, options: &TextFormatOptions) -> Self {
        let valflags = match layout {
            TextLayout::Simple => ValflagValidator::SIMPLE_FLAGS,
            TextLayout::AavsoDownload => ValflagValidator::DOWNLOAD_FLAGS,
        };
        LineParser {
            layout,
            jd: JulianDayValidator::new(),
            optional_jd: JulianDayValidator::optional(),
            magnitude: MagnitudeFieldValidator::new(),
            uncertainty: UncertaintyValueValidator::optional(options.uncertainty_range),
            valflag: ValflagValidator::new(valflags),
            band: NonEmptyFieldValidator::new("band"),
        }
    }

    fn common(
        &self,
        record_number: usize,
        jd: &str,
        mag: &str,
        uncertainty: &str,
    ) -> Result<ValidObservation, ObservationValidationError> {
        let jd = self.jd.parse(jd)?;
        let mut magnitude = self.magnitude.validate(mag)?;
        if magnitude.is_brighter_than() {
            return Err(ObservationValidationError::BrighterThanNotSupported);
        }
        magnitude.uncertainty = self.uncertainty.validate(uncertainty)?;
        Ok(ValidObservation::new(record_number, jd, magnitude, SeriesType::VISUAL))
    }

    fn simple(&self, record_number: usize, fields: &[&str], name: &str) -> Result<ValidObservation, ObservationValidationError> {
        let field = |i: usize| fields.get(i).copied().unwrap_or("");
        let mut ob = self.common(record_number, field(0), field(1), field(2))?;
        ob.obs_code = ObserverCodeValidator.validate(field(3))?;
        ob.validation_type = self.valflag.validate(field(4))?;
        ob.name = name.to_string();
        Ok(ob)
    }

    fn download(&self, record_number: usize, fields: &[&str], name: &str) -> Result<ValidObservation, ObservationValidationError> {
        use DownloadField as F;
        let field = |f: DownloadField| fields.get(f as usize).copied().unwrap_or("");
        let text = |f: DownloadField| OptionalFieldValidator.validate(field(f));

        let uncertainty = if field(F::Uncertainty).trim().is_empty() {
            field(F::HqUncertainty)
        } else {
            field(F::Uncertainty)
        };
        let mut ob = self.common(record_number, field(F::Jd), field(F::Magnitude), uncertainty)?;

        let band = self.band.validate(field(F::Band))?;
        let registry = SeriesRegistry::builtin();
        ob.band = match registry
            .by_short_name(&band)
            .or_else(|| registry.by_description(&band))
        {
            Some(series) => series.clone(),
            None => {
                log::debug!("unknown band '{band}' in record {record_number}, using Unspecified");
                SeriesType::UNSPECIFIED
            }
        };

        ob.obs_code = ObserverCodeValidator.validate(field(F::ObserverCode))?;
        ob.comment_code = text(F::CommentCode)?;
        ob.comp_star1 = text(F::CompStar1)?;
        ob.comp_star2 = text(F::CompStar2)?;
        ob.charts = text(F::Charts)?;
        ob.comments = text(F::Comments)?;
        ob.transformed = TransformedValidator.validate(field(F::Transformed))?;
        ob.airmass = text(F::Airmass)?;
        ob.validation_type = self.valflag.validate(field(F::Valflag))?;
        ob.cmag = text(F::CMag)?;
        ob.kmag = text(F::KMag)?;
        ob.hjd = self.optional_jd.validate(field(F::Hjd))?;
        ob.name = text(F::Name)?.unwrap_or_else(|| name.to_string());
        ob.affiliation = text(F::Affiliation)?;
        ob.mtype = MTypeValidator.validate(field(F::MType))?;
        ob.group = text(F::Group)?;
        ob.ads_reference = text(F::AdsReference)?;
        ob.digitizer = text(F::Digitizer)?;
        ob.credit = text(F::Credit)?;
        Ok(ob)
    }
}

impl ObservationRetriever for TextFormatRetriever {
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError> {
        let mut collector = ObservationCollector::for_source("Text");
        let Some((delimiter, layout)) = self.analyse()? else {
            return Ok(collector.finish(JdFlavour::Jd, self.source_name(), self.source_type(), false));
        };
        let parser = LineParser::new(layout, &self.options);
        ctx.set_total(self.lines.len());

        let mut interrupted = false;
        for (i, line) in self.lines.iter().enumerate() {
            if ctx.was_cancelled() {
                interrupted = true;
                break;
            }
            ctx.increment_progress(1);

            let trimmed = line.trim();
            if is_skippable(trimmed) || (collector.valid_count() == 0 && COLUMN_HEADER.is_match(trimmed)) {
                continue;
            }

            let record_number = i + 1;
            let fields = delimiter.split(trimmed);
            match self.parse_line(&parser, record_number, &fields) {
                Ok(Some(ob)) => collector.add_valid(ob),
                Ok(None) => {}
                Err(e) => collector.add_invalid(InvalidObservation::new(record_number, line.as_str(), e.to_string())),
            }
        }
        ctx.finish();

        if !interrupted {
            collector.ensure_any_valid()?;
        }
        Ok(collector.finish(JdFlavour::Jd, self.source_name(), self.source_type(), interrupted))
    }

    fn number_of_records(&self) -> Option<usize> {
        Some(self.lines.len())
    }

    fn source_name(&self) -> String {
        self.name.clone()
    }

    fn source_type(&self) -> String {
        match self.analyse() {
            Ok(Some((_, TextLayout::AavsoDownload))) => "AAVSO download file".to_string(),
            _ => "Text file".to_string(),
        }
    }
}

#[cfg(test)]
mod text_format_test {
    use super::*;
    use crate::observations::ValidationType;

    fn retrieve(text: &str) -> Result<RetrievedObservations, ObservationReadError> {
        TextFormatRetriever::from_reader(text.as_bytes(), "test")?.retrieve(&RetrievalContext::new())
    }

    #[test]
    fn test_delimiter_detection() {
        assert_eq!(Delimiter::detect("1\t2"), Some(Delimiter::Tab));
        assert_eq!(Delimiter::detect("1,2,3"), Some(Delimiter::Comma));
        assert_eq!(Delimiter::detect("  1   2  3"), Some(Delimiter::Spaces));
        assert_eq!(Delimiter::detect("123"), None);
        assert_eq!(Delimiter::Spaces.split("  1   2  3"), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_simple_format() {
        let text = "# comment\nJD,MAG,ERR,OBS,FLAG\n2450000.5,10.1,0.05,ABC\n\n2450001.5,<11.0:,,XYZ,D\n2450002.5,abc\n";
        let result = retrieve(text).unwrap();
        assert_eq!(result.valid.len(), 2);
        assert_eq!(result.invalid.len(), 1);

        let first = &result.valid[0];
        assert_eq!(first.record_number, 3);
        assert_eq!(first.mag(), 10.1);
        assert_eq!(first.uncertainty(), 0.05);
        assert_eq!(first.obs_code.as_deref(), Some("ABC"));
        assert_eq!(first.band, SeriesType::VISUAL);
        assert_eq!(first.name, "test");

        let second = &result.valid[1];
        assert!(second.magnitude.is_fainter_than());
        assert!(second.magnitude.is_uncertain);
        assert_eq!(second.validation_type, ValidationType::Discrepant);

        assert_eq!(result.invalid[0].record_number, 6);
        assert_eq!(result.invalid[0].input, "2450002.5,abc");
        assert_eq!(result.source_type, "Text file");
    }

    #[test]
    fn test_brighter_than_is_rejected() {
        let result = retrieve("2450000.5 10.0\n2450001.5 >9.0\n").unwrap();
        assert_eq!(result.valid.len(), 1);
        assert_eq!(result.invalid[0].error, "Was '>' intended (brighter than) or '<'?");
    }

    #[test]
    fn test_download_format() {
        let line1 = "2450000.5\t9.8\t0.01\t\tV\tABC\t\t110\t120\tX123\tgood night\tyes\t1.2\tV\t\t\t\tR Car\t\tSTD";
        let line2 = "2450001.5\t9.9\t\t0.02\tZZ\tABC\t\t\t\t\t\tno\t\tD\t\t\t2450001.4\tR Car";
        let line3 = "2450002.5\t0.1\t0.01\t\tB\tABC\t\t\t\t\t\t\t\tV\t\t\t\tR Car\t\tDIFF";
        let result = retrieve(&format!("{line1}\n{line2}\n{line3}\n")).unwrap();
        assert_eq!(result.source_type, "AAVSO download file");
        assert_eq!(result.valid.len(), 2);
        assert!(result.invalid.is_empty());

        let first = &result.valid[0];
        assert_eq!(first.band, SeriesType::JOHNSON_V);
        assert_eq!(first.comp_star1.as_deref(), Some("110"));
        assert_eq!(first.comments.as_deref(), Some("good night"));
        assert!(first.transformed);
        assert_eq!(first.name, "R Car");

        let second = &result.valid[1];
        assert_eq!(second.band, SeriesType::UNSPECIFIED);
        assert_eq!(second.uncertainty(), 0.02);
        assert!(second.is_discrepant());
        assert_eq!(second.hjd.as_ref().map(|d| d.jd), Some(2_450_001.4));
    }

    #[test]
    fn test_unknown_format() {
        match retrieve("2450000.5\n") {
            Err(ObservationReadError::UnknownFormat(name)) => assert_eq!(name, "test"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_all_invalid_is_read_error() {
        match retrieve("2450000.5,x\n2450001.5,y\n") {
            Err(ObservationReadError::NoObservations(first)) => assert!(first.contains("'x'")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_empty_input() {
        let result = retrieve("# nothing\n\n").unwrap();
        assert!(result.is_empty());
    }
}
