//! Extrema of a piecewise-linear model.
//!
//! A piecewise-linear function has its local extrema at the junctions where the slope
//! changes sign: negative then positive for a minimum (the light curve is brightest in
//! magnitude terms), positive then negative for a maximum. The extremum is the junction
//! point itself; no refinement inside a segment is attempted.
use std::fmt;

use crate::constants::{JulianDay, Mag};
use crate::observations::ValidObservation;
use crate::varstar_errors::AlgorithmError;

use super::piecewise_linear::PiecewiseLinearFunction;

/// Kind of extremum searched for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Goal {
    Minimize,
    Maximize,
}

impl Goal {
    /// `true` when slopes `before` and `after` a junction enclose this kind of extremum.
    fn matches(&self, before: f64, after: f64) -> bool {
        match self {
            Goal::Minimize => before < 0.0 && after > 0.0,
            Goal::Maximize => before > 0.0 && after < 0.0,
        }
    }
}

/// Time and magnitude of an extremum.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extremum {
    pub goal: Goal,
    pub time: JulianDay,
    pub magnitude: Mag,
}

impl fmt::Display for Extremum {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self.goal {
            Goal::Minimize => "Minimum",
            Goal::Maximize => "Maximum",
        };
        write!(f, "{kind}: time {:.5}, magnitude {:.4}", self.time, self.magnitude)
    }
}

/// Extrema finder over the fitted observations of a piecewise-linear model.
pub struct PiecewiseLinearExtremaFinder<'a> {
    fit: &'a [ValidObservation],
    function: &'a PiecewiseLinearFunction,
}

impl<'a> PiecewiseLinearExtremaFinder<'a> {
    pub fn new(fit: &'a [ValidObservation], function: &'a PiecewiseLinearFunction) -> Self {
        PiecewiseLinearExtremaFinder { fit, function }
    }

    /// Extremum within a bracket of fitted observations.
    ///
    /// Arguments
    /// -----------------
    /// * `goal`: minimum or maximum.
    /// * `bracket`: indices `[first, last]` into the fitted observations.
    ///
    /// Return
    /// ----------
    /// * `Some` extremum when the bracket times fall in two adjacent segments whose slopes
    ///   match `goal`, `None` otherwise.
    /// * [`AlgorithmError::BracketOutOfRange`] for an index past the fitted series.
    pub fn find(&self, goal: Goal, bracket: [usize; 2]) -> Result<Option<Extremum>, AlgorithmError> {
        let time = |index: usize| {
            self.fit
                .get(index)
                .map(ValidObservation::jd)
                .ok_or(AlgorithmError::BracketOutOfRange {
                    index,
                    len: self.fit.len(),
                })
        };
        let first = self.function.seek_function(time(bracket[0])?);
        let last = self.function.seek_function(time(bracket[1])?);

        let (Some(first), Some(last)) = (first, last) else {
            return Ok(None);
        };
        if last != first + 1 {
            return Ok(None);
        }
        Ok(self.junction(goal, last))
    }

    /// Every extremum of `goal` kind, in time order.
    pub fn find_all(&self, goal: Goal) -> Vec<Extremum> {
        (1..self.function.number_of_functions())
            .filter_map(|i| self.junction(goal, i))
            .collect()
    }

    /// Extremum at the start of segment `index`, when its slope and the previous one match.
    fn junction(&self, goal: Goal, index: usize) -> Option<Extremum> {
        let functions = self.function.functions();
        let (before, after) = (functions.get(index.checked_sub(1)?)?, functions.get(index)?);
        goal.matches(before.slope(), after.slope()).then(|| {
            let time = after.start_time();
            Extremum {
                goal,
                time,
                magnitude: after.value(time),
            }
        })
    }
}

#[cfg(test)]
mod extrema_test {
    use super::*;
    use crate::observations::{Magnitude, SeriesType};
    use approx::assert_relative_eq;

    fn model_obs(times: &[f64]) -> Vec<ValidObservation> {
        times
            .iter()
            .enumerate()
            .map(|(i, t)| ValidObservation::new(i + 1, *t, Magnitude::new(0.0, 0.0), SeriesType::MODEL))
            .collect()
    }

    #[test]
    fn test_minimum_at_junction() {
        let function = PiecewiseLinearFunction::new(&[0.0, 1.0, 2.0], &[10.0, 8.0, 10.0]).unwrap();
        let fit = model_obs(&[0.0, 1.0, 2.0]);
        let finder = PiecewiseLinearExtremaFinder::new(&fit, &function);

        let minimum = finder.find(Goal::Minimize, [0, 2]).unwrap().unwrap();
        assert_relative_eq!(minimum.time, 1.0);
        assert_relative_eq!(minimum.magnitude, 8.0);
        assert_eq!(minimum.to_string(), "Minimum: time 1.00000, magnitude 8.0000");

        assert_eq!(finder.find(Goal::Maximize, [0, 2]).unwrap(), None);
    }

    #[test]
    fn test_bracket_not_spanning_one_junction() {
        let function = PiecewiseLinearFunction::new(&[0.0, 1.0, 2.0, 3.0], &[10.0, 8.0, 10.0, 8.0]).unwrap();
        let fit = model_obs(&[0.2, 0.5, 2.5]);
        let finder = PiecewiseLinearExtremaFinder::new(&fit, &function);

        // same segment
        assert_eq!(finder.find(Goal::Minimize, [0, 1]).unwrap(), None);
        // two junctions apart
        assert_eq!(finder.find(Goal::Minimize, [0, 2]).unwrap(), None);
        assert_eq!(
            finder.find(Goal::Minimize, [0, 3]),
            Err(AlgorithmError::BracketOutOfRange { index: 3, len: 3 })
        );
    }

    #[test]
    fn test_find_all() {
        let function = PiecewiseLinearFunction::new(&[0.0, 1.0, 2.0, 3.0, 4.0], &[10.0, 8.0, 10.0, 8.0, 8.0]).unwrap();
        let fit = model_obs(&[]);
        let finder = PiecewiseLinearExtremaFinder::new(&fit, &function);

        let minima = finder.find_all(Goal::Minimize);
        assert_eq!(minima.len(), 1);
        assert_relative_eq!(minima[0].time, 1.0);

        // the flat last segment does not close a maximum
        let maxima = finder.find_all(Goal::Maximize);
        assert_eq!(maxima.len(), 1);
        assert_relative_eq!(maxima[0].magnitude, 10.0);
    }
}
