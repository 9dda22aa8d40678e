//! # Observation retrievers
//!
//! One retriever per external source kind. Each consumes an already opened stream
//! (or page supplier), validates records one by one, and returns a
//! [`RetrievedObservations`] holding the valid and the invalid records.
//!
//! ## Overview
//!
//! | Module          | Source                                                        |
//! |-----------------|---------------------------------------------------------------|
//! | [`text_format`] | generic delimited text (simple or AAVSO download layout)      |
//! | [`aid`]         | AAVSO International Database web service (CSV-in-XML and XML) |
//! | [`gaia`]        | Gaia DR2/DR3 epoch photometry CSV, optional V/R/I/B transform |
//! | [`ztf`]         | ZTF light-curve text (tab, comma or HTML-table copy)          |
//! | [`tess`]        | TESS / Kepler / QLP / Lightkurve FITS light curves            |
//!
//! ## Error isolation
//! -----------------
//! Per-record failures become [`InvalidObservation`]s and the retrieval continues.
//! The first such message is retained by the [`ObservationCollector`]; when nothing
//! valid was produced the retrieval fails with
//! [`ObservationReadError::NoObservations`] carrying that message. Structural
//! problems abort immediately with an [`ObservationReadError`].
//!
//! ## Context
//! -----------------
//! Progress and cancellation are passed explicitly through a [`RetrievalContext`].
//! Cancellation is polled at each record (and each page for paginated sources); a
//! cancelled retrieval is **not** an error: it returns what was accumulated, flagged
//! with [`RetrievedObservations::interrupted`].
pub mod aid;
pub mod gaia;
pub mod progress;
pub mod tess;
pub mod text_format;
pub mod ztf;

use itertools::Itertools;

use crate::observations::{InvalidObservation, JdFlavour, ParsedRecord, SeriesType, ValidObservation};
use crate::varstar_errors::ObservationReadError;

pub use progress::{CancelFlag, CountingProgress, NoProgress, ProgressSink};

static NO_PROGRESS: NoProgress = NoProgress;

/// Progress sink and cancellation flag of one retrieval.
#[derive(Clone)]
pub struct RetrievalContext<'a> {
    progress: &'a dyn ProgressSink,
    cancel: CancelFlag,
}

impl Default for RetrievalContext<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> RetrievalContext<'a> {
    /// Silent, never cancelled context.
    pub fn new() -> Self {
        RetrievalContext {
            progress: &NO_PROGRESS,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_progress(mut self, progress: &'a dyn ProgressSink) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    #[inline]
    pub fn was_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    #[inline]
    pub fn increment_progress(&self, n: usize) {
        self.progress.increment(n);
    }

    pub fn set_total(&self, total: usize) {
        self.progress.set_total(total);
    }

    pub fn finish(&self) {
        self.progress.finish();
    }

    pub fn cancel_flag(&self) -> &CancelFlag {
        &self.cancel
    }
}

/// Outcome of a retrieval.
#[derive(Debug, Clone, Default)]
pub struct RetrievedObservations {
    pub valid: Vec<ValidObservation>,
    pub invalid: Vec<InvalidObservation>,
    /// Reference frame of the primary Julian Days.
    pub jd_flavour: JdFlavour,
    /// Object or file name of the source.
    pub source_name: String,
    /// Kind of source ("Gaia DR3 file", "ZTF file", …).
    pub source_type: String,
    /// `true` when the retrieval stopped on a cancellation request.
    pub interrupted: bool,
}

impl RetrievedObservations {
    /// Distinct series present in the valid observations, in order of appearance.
    pub fn series(&self) -> Vec<SeriesType> {
        self.valid.iter().map(|o| o.band.clone()).unique().collect()
    }

    /// Valid observations of one series.
    pub fn of_series<'s>(&'s self, series: &'s SeriesType) -> impl Iterator<Item = &'s ValidObservation> + 's {
        self.valid.iter().filter(move |o| &o.band == series)
    }

    pub fn is_empty(&self) -> bool {
        self.valid.is_empty() && self.invalid.is_empty()
    }
}

/// Accumulates the records of a retrieval and remembers the first error.
#[derive(Debug, Default)]
pub struct ObservationCollector {
    valid: Vec<ValidObservation>,
    invalid: Vec<InvalidObservation>,
    first_error: Option<String>,
    source: Option<&'static str>,
}

impl ObservationCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag every invalid observation with `source`.
    pub fn for_source(source: &'static str) -> Self {
        ObservationCollector {
            source: Some(source),
            ..Self::default()
        }
    }

    pub fn add_valid(&mut self, ob: ValidObservation) {
        self.valid.push(ob);
    }

    pub fn add_invalid(&mut self, mut ob: InvalidObservation) {
        if self.first_error.is_none() {
            self.first_error = Some(ob.error.clone());
        }
        if ob.source.is_none() {
            ob.source = self.source.map(str::to_string);
        }
        self.invalid.push(ob);
    }

    pub fn add(&mut self, record: ParsedRecord) {
        match record {
            ParsedRecord::Valid(ob) => self.add_valid(ob),
            ParsedRecord::Invalid(ob) => self.add_invalid(ob),
        }
    }

    pub fn valid(&self) -> &[ValidObservation] {
        &self.valid
    }

    pub fn valid_count(&self) -> usize {
        self.valid.len()
    }

    pub fn invalid_count(&self) -> usize {
        self.invalid.len()
    }

    pub fn first_error(&self) -> Option<&str> {
        self.first_error.as_deref()
    }

    /// Fail when no valid observation was produced but some record was rejected.
    pub fn ensure_any_valid(&self) -> Result<(), ObservationReadError> {
        match (&self.first_error, self.valid.is_empty()) {
            (Some(first), true) => Err(ObservationReadError::NoObservations(first.clone())),
            _ => Ok(()),
        }
    }

    pub fn into_parts(self) -> (Vec<ValidObservation>, Vec<InvalidObservation>) {
        (self.valid, self.invalid)
    }

    pub fn finish(
        self,
        jd_flavour: JdFlavour,
        source_name: impl Into<String>,
        source_type: impl Into<String>,
        interrupted: bool,
    ) -> RetrievedObservations {
        let source_name = source_name.into();
        log::info!(
            "{source_name}: {} valid, {} invalid observation(s){}",
            self.valid.len(),
            self.invalid.len(),
            if interrupted { " (interrupted)" } else { "" }
        );
        RetrievedObservations {
            valid: self.valid,
            invalid: self.invalid,
            jd_flavour,
            source_name,
            source_type: source_type.into(),
            interrupted,
        }
    }
}

/// A source of observations.
pub trait ObservationRetriever {
    /// Run the retrieval.
    ///
    /// Return
    /// ----------
    /// * The valid and invalid observations, or a structural [`ObservationReadError`].
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError>;

    /// Number of records to be read, when known before the retrieval.
    fn number_of_records(&self) -> Option<usize> {
        None
    }

    fn source_name(&self) -> String;

    fn source_type(&self) -> String;
}

/// Lines of `reader`, with I/O failures surfaced as read errors.
pub(crate) fn read_lines<R: std::io::BufRead>(reader: R) -> Result<Vec<String>, ObservationReadError> {
    reader
        .lines()
        .collect::<Result<Vec<_>, _>>()
        .map_err(ObservationReadError::from)
}
