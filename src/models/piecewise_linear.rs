//! # Piecewise-linear functions
//!
//! A [`PiecewiseLinearFunction`] joins consecutive points of a reference series (usually
//! the means of a light curve) with straight [`LinearFunction`] segments.
//!
//! ## Evaluation
//! -----------------
//! * [`PiecewiseLinearFunction::value`] is pure: the segment is found by binary search on
//!   the segment end times, and the first/last segments are extrapolated outside the
//!   covered span.
//! * [`PiecewiseCursor`] is a forward-only evaluator for sorted queries. It never
//!   rewinds and returns [`AlgorithmError::NonMonotonicTime`] when asked to.
//! * [`PiecewiseLinearFunction::seek_function`] maps a time to the segment containing it,
//!   with `t1 <= t < t2` and the last segment closed at its end.
use std::fmt::Write as _;

use crate::constants::{JulianDay, Mag};
use crate::observations::ValidObservation;
use crate::varstar_errors::AlgorithmError;

/// Decimals of times in function strings.
const TIME_PRECISION: usize = 5;

/// Decimals of coefficients in function strings.
const COEFF_PRECISION: usize = 8;

/// Straight line through `(t1, mag1)` and `(t2, mag2)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LinearFunction {
    t1: JulianDay,
    t2: JulianDay,
    mag1: Mag,
    mag2: Mag,
    slope: f64,
    intercept: f64,
}

impl LinearFunction {
    pub fn new(t1: JulianDay, t2: JulianDay, mag1: Mag, mag2: Mag) -> Self {
        let slope = (mag2 - mag1) / (t2 - t1);
        LinearFunction {
            t1,
            t2,
            mag1,
            mag2,
            slope,
            intercept: mag1 - slope * t1,
        }
    }

    pub fn start_time(&self) -> JulianDay {
        self.t1
    }

    pub fn end_time(&self) -> JulianDay {
        self.t2
    }

    pub fn start_mag(&self) -> Mag {
        self.mag1
    }

    pub fn end_mag(&self) -> Mag {
        self.mag2
    }

    pub fn slope(&self) -> f64 {
        self.slope
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    #[inline]
    pub fn value(&self, t: f64) -> Mag {
        self.slope * t + self.intercept
    }

    /// One `when` branch of a VeLa function.
    ///
    /// The first segment only checks its end bound, the last one is unconditional.
    pub fn to_vela_string(&self, first: bool, last: bool) -> String {
        let mut out = String::new();
        if !first && !last {
            let _ = write!(out, "t >= {:.p$} and ", self.t1, p = TIME_PRECISION);
        }
        if last {
            out.push_str("true");
        } else {
            let _ = write!(out, "t < {:.p$}", self.t2, p = TIME_PRECISION);
        }
        let _ = write!(
            out,
            " -> {:.p$}*t + {:.p$}",
            self.slope,
            self.intercept,
            p = COEFF_PRECISION
        );
        out
    }
}

/// Ordered, contiguous linear segments.
#[derive(Debug, Clone, PartialEq)]
pub struct PiecewiseLinearFunction {
    functions: Vec<LinearFunction>,
}

impl PiecewiseLinearFunction {
    /// Join consecutive `(times[i], mags[i])` points.
    ///
    /// Arguments
    /// -----------------
    /// * `times`: strictly increasing finite times, at least two.
    /// * `mags`: finite magnitudes, same length as `times`.
    ///
    /// Return
    /// ----------
    /// * The function, or [`AlgorithmError::InsufficientData`] /
    ///   [`AlgorithmError::UnorderedSeries`].
    pub fn new(times: &[f64], mags: &[f64]) -> Result<Self, AlgorithmError> {
        if times.len() != mags.len() {
            return Err(AlgorithmError::DegenerateFit(format!(
                "{} times for {} magnitudes",
                times.len(),
                mags.len()
            )));
        }
        if times.len() < 2 {
            return Err(AlgorithmError::InsufficientData {
                required: 2,
                found: times.len(),
            });
        }
        if let Some(i) = times.iter().chain(mags).position(|v| !v.is_finite()) {
            let (kind, index) = if i < times.len() { ("time", i) } else { ("magnitude", i - times.len()) };
            return Err(AlgorithmError::DegenerateFit(format!("non-finite {kind} at index {index}")));
        }
        if let Some(i) = (1..times.len()).find(|&i| times[i] <= times[i - 1]) {
            return Err(AlgorithmError::UnorderedSeries {
                index: i,
                previous: times[i - 1],
                current: times[i],
            });
        }

        let functions = times
            .windows(2)
            .zip(mags.windows(2))
            .map(|(t, m)| LinearFunction::new(t[0], t[1], m[0], m[1]))
            .collect();
        Ok(PiecewiseLinearFunction { functions })
    }

    /// Function through the Julian Days and magnitudes of `obs`.
    pub fn from_observations(obs: &[ValidObservation]) -> Result<Self, AlgorithmError> {
        let times: Vec<f64> = obs.iter().map(ValidObservation::jd).collect();
        let mags: Vec<f64> = obs.iter().map(ValidObservation::mag).collect();
        Self::new(&times, &mags)
    }

    pub fn functions(&self) -> &[LinearFunction] {
        &self.functions
    }

    pub fn number_of_functions(&self) -> usize {
        self.functions.len()
    }

    /// First segment whose end time is after `t`, the last one past the span.
    fn segment_index(&self, t: f64) -> usize {
        self.functions
            .partition_point(|f| f.t2 <= t)
            .min(self.functions.len() - 1)
    }

    /// Value at `t`, extrapolating the end segments outside the span.
    pub fn value(&self, t: f64) -> Mag {
        self.functions[self.segment_index(t)].value(t)
    }

    /// Segment containing `t`.
    ///
    /// Return
    /// ----------
    /// * `Some(i)` when `t1 <= t < t2` for segment `i` (or `t` is the last end time),
    ///   `None` outside the span.
    pub fn seek_function(&self, t: f64) -> Option<usize> {
        let first = self.functions.first()?;
        let last = self.functions.last()?;
        if !(first.t1..=last.t2).contains(&t) {
            return None;
        }
        Some(self.segment_index(t))
    }

    pub fn cursor(&self) -> PiecewiseCursor<'_> {
        PiecewiseCursor {
            function: self,
            index: 0,
            last_time: f64::NEG_INFINITY,
        }
    }

    /// The function as a VeLa `when` expression.
    pub fn to_vela_string(&self) -> String {
        let n = self.functions.len();
        let branches: Vec<String> = self
            .functions
            .iter()
            .enumerate()
            .map(|(i, f)| format!("        {}", f.to_vela_string(i == 0, i == n - 1)))
            .collect();
        format!("f(t:real) : real {{\n    when\n{}\n}}", branches.join("\n"))
    }
}

/// Forward-only evaluator over a [`PiecewiseLinearFunction`].
#[derive(Debug, Clone)]
pub struct PiecewiseCursor<'f> {
    function: &'f PiecewiseLinearFunction,
    index: usize,
    last_time: f64,
}

impl PiecewiseCursor<'_> {
    /// Value at `t`, which must not precede the previous query.
    pub fn value(&mut self, t: f64) -> Result<Mag, AlgorithmError> {
        if t < self.last_time || t.is_nan() {
            return Err(AlgorithmError::NonMonotonicTime {
                requested: t,
                cursor: self.last_time,
            });
        }
        self.last_time = t;

        let functions = &self.function.functions;
        while self.index < functions.len() - 1 && t >= functions[self.index].t2 {
            self.index += 1;
        }
        Ok(functions[self.index].value(t))
    }

    /// Index of the current segment.
    pub fn index(&self) -> usize {
        self.index
    }
}
