pub mod constants;
pub mod fits;
pub mod models;
pub mod observations;
pub mod retrievers;
pub mod time;
pub mod validation;
pub mod varstar_errors;

pub use observations::{InvalidObservation, Magnitude, ParsedRecord, SeriesType, ValidObservation};
pub use retrievers::{CancelFlag, ObservationRetriever, RetrievalContext, RetrievedObservations};
pub use varstar_errors::{AlgorithmError, FitsError, ObservationReadError, ObservationValidationError};
