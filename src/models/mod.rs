//! # Light-curve models
//!
//! Models fitted to a series of [`ValidObservation`]s. The fit and the residuals are
//! themselves observations, in the [`SeriesType::MODEL`] and [`SeriesType::RESIDUALS`]
//! series, so they can be displayed and exported like any other data.
//!
//! ## Overview
//! -----------------
//! * [`piecewise_linear`]: segments joining consecutive points of a reference series.
//! * [`extrema`]: extrema of a piecewise-linear function at its junctions.
//! * [`PiecewiseLinearModel`]: evaluates the function at each observation time and
//!   reports the goodness of fit (RMS, AIC, BIC).
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use varstar::models::PiecewiseLinearModel;
//! use varstar::retrievers::CancelFlag;
//! # let obs: Vec<varstar::observations::ValidObservation> = Vec::new();
//! # let means = obs.clone();
//!
//! let model = PiecewiseLinearModel::new(obs, &means).unwrap();
//! let fit = model.execute(&CancelFlag::new()).unwrap();
//! println!("{fit}");
//! ```
pub mod extrema;
pub mod piecewise_linear;

use std::fmt;

use crate::observations::{Magnitude, SeriesType, ValidObservation};
use crate::retrievers::CancelFlag;
use crate::varstar_errors::AlgorithmError;

pub use extrema::{Extremum, Goal, PiecewiseLinearExtremaFinder};
pub use piecewise_linear::{LinearFunction, PiecewiseCursor, PiecewiseLinearFunction};

const PIECEWISE_LINEAR_KIND: &str = "Piecewise linear model";

/// Outcome of a model execution.
#[derive(Debug, Clone)]
pub struct ModelFit {
    /// Model value at each observation time, in the [`SeriesType::MODEL`] series.
    pub fit: Vec<ValidObservation>,
    /// Observed minus model, in the [`SeriesType::RESIDUALS`] series.
    pub residuals: Vec<ValidObservation>,
    pub rms: f64,
    /// Akaike information criterion, NaN for a perfect or empty fit.
    pub aic: f64,
    /// Bayesian information criterion, NaN for a perfect or empty fit.
    pub bic: f64,
    pub description: String,
    /// The model as a VeLa function.
    pub vela: String,
    /// Minima and maxima, in time order.
    pub extrema: Vec<Extremum>,
}

impl ModelFit {
    /// `RMS`, `AIC` and `BIC` lines.
    pub fn fit_metrics(&self) -> String {
        format!("RMS: {:.4}\nAIC: {:.4}\nBIC: {:.4}", self.rms, self.aic, self.bic)
    }
}

impl fmt::Display for ModelFit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.description)?;
        writeln!(f, "{}", self.fit_metrics())?;
        for extremum in &self.extrema {
            writeln!(f, "{extremum}")?;
        }
        write!(f, "{}", self.vela)
    }
}

/// Information criteria of a fit with `k` estimated parameters.
///
/// Return
/// ----------
/// * `(aic, bic)` with `aic = n ln(SSR/n) + 2k` and `bic = n ln(SSR/n) + k ln(n)`, or
///   NaNs when `n` or `SSR` is zero.
pub fn information_criteria(sum_sq_residuals: f64, n: usize, k: usize) -> (f64, f64) {
    if n == 0 || sum_sq_residuals == 0.0 {
        return (f64::NAN, f64::NAN);
    }
    let n = n as f64;
    let k = k as f64;
    let common = n * (sum_sq_residuals / n).ln();
    (common + 2.0 * k, common + k * n.ln())
}

/// Piecewise-linear model of a series, built on a reference ("means") series.
#[derive(Debug, Clone)]
pub struct PiecewiseLinearModel {
    obs: Vec<ValidObservation>,
    function: PiecewiseLinearFunction,
}

impl PiecewiseLinearModel {
    /// Arguments
    /// -----------------
    /// * `obs`: observations to fit, sorted by time here.
    /// * `means`: reference series, strictly increasing in time, at least two points.
    pub fn new(mut obs: Vec<ValidObservation>, means: &[ValidObservation]) -> Result<Self, AlgorithmError> {
        if obs.is_empty() {
            return Err(AlgorithmError::InsufficientData { required: 1, found: 0 });
        }
        obs.sort_by(|a, b| a.jd().total_cmp(&b.jd()));
        Ok(PiecewiseLinearModel {
            obs,
            function: PiecewiseLinearFunction::from_observations(means)?,
        })
    }

    pub fn function(&self) -> &PiecewiseLinearFunction {
        &self.function
    }

    /// "Piecewise linear model with 4 functions for Johnson V series"
    pub fn description(&self) -> String {
        format!(
            "{PIECEWISE_LINEAR_KIND} with {} functions for {} series",
            self.function.number_of_functions(),
            self.obs[0].band.description
        )
    }

    /// Evaluate the model at each observation time.
    ///
    /// Return
    /// ----------
    /// * The [`ModelFit`], or [`AlgorithmError::Interrupted`] when `cancel` is raised
    ///   during the evaluation.
    pub fn execute(&self, cancel: &CancelFlag) -> Result<ModelFit, AlgorithmError> {
        let mut cursor = self.function.cursor();
        let mut fit = Vec::with_capacity(self.obs.len());
        let mut residuals = Vec::with_capacity(self.obs.len());
        let mut sum_sq_residuals = 0.0;

        for ob in &self.obs {
            if cancel.is_cancelled() {
                return Err(AlgorithmError::Interrupted);
            }
            let value = cursor.value(ob.jd())?;
            let residual = ob.mag() - value;
            sum_sq_residuals += residual * residual;

            fit.push(derived(ob, value, SeriesType::MODEL));
            residuals.push(derived(ob, residual, SeriesType::RESIDUALS));
        }

        let n = residuals.len();
        let k = self.function.number_of_functions();
        let (aic, bic) = information_criteria(sum_sq_residuals, n, k);

        let finder = PiecewiseLinearExtremaFinder::new(&fit, &self.function);
        let mut extrema = finder.find_all(Goal::Minimize);
        extrema.extend(finder.find_all(Goal::Maximize));
        extrema.sort_by(|a, b| a.time.total_cmp(&b.time));

        log::debug!("{}: {n} points, {} extrema", self.description(), extrema.len());
        Ok(ModelFit {
            rms: (sum_sq_residuals / n as f64).sqrt(),
            aic,
            bic,
            description: self.description(),
            vela: self.function.to_vela_string(),
            extrema,
            fit,
            residuals,
        })
    }
}

/// Model or residual point at the time of `ob`.
fn derived(ob: &ValidObservation, value: f64, band: SeriesType) -> ValidObservation {
    let mut point = ValidObservation::new(ob.record_number, ob.jd(), Magnitude::new(value, 0.0), band);
    point.name = ob.name.clone();
    point.comments = Some(PIECEWISE_LINEAR_KIND.to_string());
    point
}
