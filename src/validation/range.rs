use serde::{Deserialize, Serialize};

use crate::varstar_errors::ObservationValidationError;

/// Closed interval `[lo, hi]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InclusiveRange {
    pub lo: f64,
    pub hi: f64,
}

impl InclusiveRange {
    pub const fn new(lo: f64, hi: f64) -> Self {
        InclusiveRange { lo, hi }
    }

    /// NaN is never contained.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.lo && value <= self.hi
    }

    pub fn check(&self, field: &'static str, value: f64) -> Result<f64, ObservationValidationError> {
        if self.contains(value) {
            Ok(value)
        } else {
            Err(ObservationValidationError::OutOfRange {
                field,
                value,
                lo: self.lo,
                hi: self.hi,
            })
        }
    }
}

impl From<(f64, f64)> for InclusiveRange {
    fn from((lo, hi): (f64, f64)) -> Self {
        InclusiveRange::new(lo, hi)
    }
}
