//! Error taxonomy for the ingestion pipeline.
//!
//! Two tiers are distinguished:
//!
//! * [`ObservationValidationError`] is **record-level**. A retriever catches it for one
//!   record, turns that record into an [`InvalidObservation`](crate::observations::InvalidObservation)
//!   and carries on with the next one.
//! * [`ObservationReadError`] is **structural**. The retrieval is aborted and no partial
//!   data is returned (missing header, I/O failure, malformed response shape, …).
//!
//! [`AlgorithmError`] covers model construction and evaluation failures, and
//! [`FitsError`] is raised by the FITS container reader before being lifted into a
//! read error by the light-curve retrievers.
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ObservationValidationError {
    #[error("Invalid Julian Day: '{0}'")]
    InvalidJulianDay(String),

    #[error("Invalid magnitude: '{0}'")]
    InvalidMagnitude(String),

    #[error("Was '>' intended (brighter than) or '<'?")]
    BrighterThanNotSupported,

    #[error("{field} value {value} is outside the range [{lo}, {hi}]")]
    OutOfRange {
        field: &'static str,
        value: f64,
        lo: f64,
        hi: f64,
    },

    #[error("Invalid {field}: '{value}'")]
    InvalidNumber { field: &'static str, value: String },

    #[error("{0} must not be empty")]
    EmptyField(&'static str),

    #[error("Invalid validation flag: '{0}'")]
    InvalidValflag(String),

    #[error("Invalid magnitude type: '{0}'")]
    InvalidMType(String),

    #[error("Invalid transformed flag: '{0}'")]
    InvalidTransformed(String),

    #[error("Expected between {min} and {max} fields but found {found}")]
    FieldCount {
        min: usize,
        max: usize,
        found: usize,
    },

    #[error("Missing field '{0}'")]
    MissingField(&'static str),

    #[error("Unexpected Gaia band: {0}")]
    UnexpectedGaiaBand(String),

    #[error("Invalid Gaia flux: flux = {flux}, flux error = {flux_error}")]
    InvalidGaiaFlux { flux: f64, flux_error: f64 },

    #[error("No matching blue/red observation to transform")]
    NoMatchingObservation,

    #[error("Invalid flux or flux error")]
    InvalidFlux,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum ObservationReadError {
    #[error("Unable to read observation source: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("FITS error: {0}")]
    Fits(#[from] FitsError),

    #[error("Cannot find {0} header")]
    HeaderNotFound(&'static str),

    #[error("Header lacks required column '{0}'")]
    MissingColumn(String),

    #[error("'{0}' is in an unknown format.")]
    UnknownFormat(String),

    #[error("Only one Data element expected in AID CSV stream")]
    UnexpectedDataElements,

    #[error("No CSV header in AID data stream")]
    MissingAidCsvHeader,

    #[error("No observations found. The first error message:\n{0}")]
    NoObservations(String),

    #[error("Cannot determine reference epoch")]
    MissingReferenceEpoch,

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("At least {required} points are required, found {found}")]
    InsufficientData { required: usize, found: usize },

    #[error("Time series is not strictly increasing at index {index} ({previous} then {current})")]
    UnorderedSeries {
        index: usize,
        previous: f64,
        current: f64,
    },

    #[error("Non-monotonic evaluation: t = {requested} is before the cursor at t = {cursor}")]
    NonMonotonicTime { requested: f64, cursor: f64 },

    #[error("Bracket index {index} is out of range (series length {len})")]
    BracketOutOfRange { index: usize, len: usize },

    #[error("Model execution was interrupted")]
    Interrupted,

    #[error("Degenerate fit: {0}")]
    DegenerateFit(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FitsError {
    #[error("Truncated FITS stream: {0}")]
    Truncated(String),

    #[error("Header has no END card")]
    MissingEnd,

    #[error("Missing mandatory keyword {0}")]
    MissingKeyword(String),

    #[error("Keyword {keyword} has an invalid value '{value}'")]
    InvalidKeyword { keyword: String, value: String },

    #[error("Unsupported TFORM '{0}'")]
    UnsupportedTform(String),

    #[error("No binary table extension found")]
    NoBinaryTable,

    #[error("Column '{0}' not found")]
    ColumnNotFound(String),

    #[error("Column '{column}' is not numeric ({tform})")]
    NonNumericColumn { column: String, tform: String },

    #[error("Error during the nom parsing: {0}")]
    NomParsingError(String),
}
