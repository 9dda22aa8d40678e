//! # Constants and type aliases
//!
//! Centralizes the **reference epochs**, **tolerances**, **validation ranges** and
//! a few type aliases shared by the retrievers and models.
//!
//! ## Overview
//!
//! - Time reference constants (Gaia epoch, matching tolerance)
//! - Magnitude and uncertainty ranges enforced by the validators
//! - Light-curve magnitude conversion constants
//! - Common aliases used across the crate

use ahash::RandomState;
use std::collections::HashMap;

// -------------------------------------------------------------------------------------------------
// Time references
// -------------------------------------------------------------------------------------------------

/// Gaia time origin (2010-01-01T00:00:00 TCB) expressed as a Julian Day.
pub const GAIA_EPOCH: f64 = 2_455_197.5;

/// Maximum |ΔJD| between G and BP/RP epochs for a transform match (5 minutes).
pub const GAIA_MATCH_TOLERANCE: f64 = 1.0 / 288.0;

// -------------------------------------------------------------------------------------------------
// Validation ranges
// -------------------------------------------------------------------------------------------------

/// Lowest magnitude accepted by the magnitude validator.
pub const MIN_MAGNITUDE: f64 = -5.0;

/// Highest magnitude accepted by the magnitude validator.
pub const MAX_MAGNITUDE: f64 = 25.0;

/// Default closed range for magnitude uncertainties.
pub const UNCERTAINTY_RANGE: (f64, f64) = (0.0, 1.0);

// -------------------------------------------------------------------------------------------------
// Light-curve photometry
// -------------------------------------------------------------------------------------------------

/// Sentinel written by mission pipelines when no catalogue magnitude is known.
pub const INVALID_MAG: f64 = 99.99;

/// Zero point used when no reference magnitude is available.
pub const DEFAULT_MAG_SHIFT: f64 = 15.0;

/// 2.5 / ln(10): flux relative error → magnitude error.
pub const FLUX_TO_MAG_ERROR: f64 = 1.086;

// -------------------------------------------------------------------------------------------------
// Type aliases
// -------------------------------------------------------------------------------------------------

/// Julian Day (possibly heliocentric or barycentric, see [`crate::observations::JdFlavour`])
pub type JulianDay = f64;

/// Apparent magnitude
pub type Mag = f64;

/// Hash map using `ahash` for speed
pub type FastHashMap<K, V> = HashMap<K, V, RandomState>;
