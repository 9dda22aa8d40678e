//! # Gaia G/BP/RP to Johnson-Cousins transformation
//!
//! Each transformed magnitude is `G + P(x)` with `x = BP - RP` and `P` a polynomial
//! in the colour index whose coefficients depend on the data release:
//!
//! * **DR2** (Evans et al. 2018, appendix A): V, R and I, second degree.
//! * **DR3** (Riello et al. 2021, table C.2): V, R, I and B, fourth degree.
//!
//! The uncertainty is propagated in quadrature through the derivative of `P`:
//!
//! ```text
//! σ² = σ_G² + (P'(x) · sqrt(σ_BP² + σ_RP²))²
//! ```
//!
//! Transformed observations are always freshly built; the G, BP and RP sources are
//! never modified.
use smallvec::SmallVec;

use crate::constants::{JulianDay, GAIA_MATCH_TOLERANCE};
use crate::observations::{Magnitude, SeriesType, ValidObservation};

use super::GaiaRelease;

/// Colour polynomial of one target band.
#[derive(Debug, Clone)]
pub struct ColorTransform {
    pub band: SeriesType,
    /// Coefficients of `x^0, x^1, …`.
    pub coefficients: &'static [f64],
}

impl ColorTransform {
    const fn new(band: SeriesType, coefficients: &'static [f64]) -> Self {
        ColorTransform { band, coefficients }
    }

    /// `P(x)`, Horner evaluated.
    pub fn polynomial(&self, x: f64) -> f64 {
        self.coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
    }

    /// `P'(x)`.
    pub fn derivative(&self, x: f64) -> f64 {
        self.coefficients
            .iter()
            .enumerate()
            .skip(1)
            .rev()
            .fold(0.0, |acc, (n, c)| acc * x + n as f64 * c)
    }

    pub fn magnitude(&self, g: f64, x: f64) -> f64 {
        g + self.polynomial(x)
    }

    /// Uncertainty of [`Self::magnitude`] given the G and colour index uncertainties.
    pub fn uncertainty(&self, g_err: f64, x: f64, x_err: f64) -> f64 {
        let colour_term = self.derivative(x) * x_err;
        (g_err * g_err + colour_term * colour_term).sqrt()
    }
}

pub static DR2_TRANSFORMS: [ColorTransform; 3] = [
    ColorTransform::new(SeriesType::JOHNSON_V, &[0.01760, 0.006860, 0.1732]),
    ColorTransform::new(SeriesType::COUSINS_R, &[0.003226, -0.3833, 0.1345]),
    ColorTransform::new(SeriesType::COUSINS_I, &[-0.02085, -0.7419, 0.09631]),
];

pub static DR3_TRANSFORMS: [ColorTransform; 4] = [
    ColorTransform::new(SeriesType::JOHNSON_V, &[0.02704, -0.01424, 0.2156, -0.01426]),
    ColorTransform::new(SeriesType::COUSINS_R, &[0.02275, -0.3961, 0.1243, 0.01396, -0.003775]),
    ColorTransform::new(SeriesType::COUSINS_I, &[-0.01753, -0.76, 0.0991]),
    ColorTransform::new(SeriesType::JOHNSON_B, &[-0.01448, 0.6874, 0.3604, -0.06718, 0.006061]),
];

/// Transformations used for a release. An unknown release uses the DR3 set.
pub fn transforms_for(release: GaiaRelease) -> &'static [ColorTransform] {
    match release {
        GaiaRelease::Dr2 => &DR2_TRANSFORMS,
        GaiaRelease::Dr3 | GaiaRelease::Unknown => &DR3_TRANSFORMS,
    }
}

/// Index of the candidate nearest in time to `jd`.
///
/// Linear scan, the first of several equally close candidates wins. A candidate is
/// only accepted when strictly closer than [`GAIA_MATCH_TOLERANCE`].
pub fn closest_observation(jd: JulianDay, candidates: &[ValidObservation]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, candidate) in candidates.iter().enumerate() {
        let delta = (candidate.jd() - jd).abs();
        if best.map_or(true, |(_, d)| delta < d) {
            best = Some((i, delta));
        }
    }
    best.filter(|(_, d)| *d < GAIA_MATCH_TOLERANCE).map(|(i, _)| i)
}

/// The transformed observations built from one G/BP/RP triple, in V, R, I\[, B\] order.
#[derive(Debug, Clone, Default)]
pub struct OvribGroup {
    pub observations: SmallVec<[ValidObservation; 4]>,
}

impl OvribGroup {
    /// Transform a matched triple.
    ///
    /// Arguments
    /// -----------------
    /// * `g`, `bp`, `rp`: the matched Gaia observations.
    /// * `transforms`: polynomials of the release.
    /// * `index`: 0-based position of `g` among all G observations.
    /// * `n_groups`: number of G observations.
    ///
    /// Return
    /// ----------
    /// * One observation per transform, numbered `k * n_groups + index + 1` where `k` is
    ///   the position of the transform. Every observation is discrepant when any
    ///   source is.
    pub fn transform(
        g: &ValidObservation,
        bp: &ValidObservation,
        rp: &ValidObservation,
        transforms: &[ColorTransform],
        index: usize,
        n_groups: usize,
    ) -> Self {
        let x = bp.mag() - rp.mag();
        let x_err = bp.uncertainty().hypot(rp.uncertainty());
        let discrepant = g.is_discrepant() || bp.is_discrepant() || rp.is_discrepant();
        let comment = format!(
            "Transformed from Gaia G= {:.5}, BP= {:.5}, RP= {:.5}",
            g.mag(),
            bp.mag(),
            rp.mag()
        );

        let observations = transforms
            .iter()
            .enumerate()
            .map(|(k, t)| {
                let magnitude = Magnitude::new(t.magnitude(g.mag(), x), t.uncertainty(g.uncertainty(), x, x_err));
                let mut ob = ValidObservation::new(k * n_groups + index + 1, g.jd(), magnitude, t.band.clone());
                ob.name = g.name.clone();
                ob.obs_code = g.obs_code.clone();
                ob.transformed = true;
                ob.comments = Some(comment.clone());
                ob.set_discrepant(discrepant);
                ob
            })
            .collect();
        OvribGroup { observations }
    }

    pub fn band(&self, band: &SeriesType) -> Option<&ValidObservation> {
        self.observations.iter().find(|o| &o.band == band)
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }
}

impl IntoIterator for OvribGroup {
    type Item = ValidObservation;
    type IntoIter = smallvec::IntoIter<[ValidObservation; 4]>;

    fn into_iter(self) -> Self::IntoIter {
        self.observations.into_iter()
    }
}
