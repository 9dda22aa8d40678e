//! # TESS / Kepler FITS light curves
//!
//! Loads the binary table of one or more FITS light-curve files into magnitudes. The
//! mission specific column layout is provided by a [`LightCurveSource`]
//! (see [`missions`]).
//!
//! ## Overview
//! -----------------
//! * Julian Days are `TIME + reference epoch` (barycentric).
//! * A row whose time, flux or flux error is not finite, or whose flux is not
//!   positive, becomes an invalid observation.
//! * Magnitudes are `shift - 2.5 log10(flux)` with an uncertainty of
//!   `1.086 * flux_error / flux`.
//! * The shift is [`DEFAULT_MAG_SHIFT`], unless the primary header carries a catalogue
//!   magnitude: the median instrumental magnitude is then aligned on it. A fixed shift
//!   can be forced with [`FitsOptions::mag_shift`].
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use camino::Utf8Path;
//! use varstar::retrievers::tess::{FitsOptions, SpocLightCurve, TessRetriever};
//! use varstar::retrievers::{ObservationRetriever, RetrievalContext};
//!
//! let mut retriever = TessRetriever::from_path(SpocLightCurve, Utf8Path::new("tess_lc.fits"))
//!     .unwrap()
//!     .with_options(FitsOptions::default().load_raw(true));
//! let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
//! println!("{}: {} observations", result.source_name, result.valid.len());
//! ```
pub mod missions;

use camino::Utf8Path;
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};

use crate::constants::{DEFAULT_MAG_SHIFT, FLUX_TO_MAG_ERROR};
use crate::fits::{BinTable, FitsFile};
use crate::observations::{DetailValue, InvalidObservation, JdFlavour, Magnitude, SeriesRegistry, SeriesType, ValidObservation};
use crate::retrievers::{ObservationCollector, ObservationRetriever, RetrievalContext, RetrievedObservations};
use crate::varstar_errors::{FitsError, ObservationReadError};

pub use missions::{ColumnRole, LightCurveFile, LightCurveSource, LightkurveLightCurve, MissionSeries, QlpLightCurve, SpocLightCurve};

/// Options of the FITS light-curve retriever.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct FitsOptions {
    /// Read the simple aperture flux instead of the corrected one.
    pub load_raw: bool,
    /// Fixed magnitude shift, overriding the reference magnitude alignment.
    pub mag_shift: Option<f64>,
    /// Skip rows whose quality flags are nonzero.
    pub drop_flagged: bool,
}

impl FitsOptions {
    pub fn load_raw(mut self, load_raw: bool) -> Self {
        self.load_raw = load_raw;
        self
    }

    pub fn mag_shift(mut self, mag_shift: Option<f64>) -> Self {
        self.mag_shift = mag_shift;
        self
    }

    pub fn drop_flagged(mut self, drop_flagged: bool) -> Self {
        self.drop_flagged = drop_flagged;
        self
    }
}

/// Median of positive, finite fluxes.
pub fn median_flux(fluxes: &[f64]) -> Option<f64> {
    let mut sorted: Vec<OrderedFloat<f64>> = fluxes.iter().copied().map(OrderedFloat).collect();
    if sorted.is_empty() {
        return None;
    }
    sorted.sort_unstable();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 0 {
        (sorted[mid - 1].0 + sorted[mid].0) / 2.0
    } else {
        sorted[mid].0
    })
}

/// Magnitude shift aligning the median instrumental magnitude of `fluxes` on `reference`.
///
/// Return
/// ----------
/// * `reference + 2.5 log10(median flux)`, [`DEFAULT_MAG_SHIFT`] when there is no
///   reference or no flux.
pub fn magnitude_shift(reference: Option<f64>, fluxes: &[f64]) -> f64 {
    match (reference, median_flux(fluxes)) {
        (Some(reference), Some(median)) => reference + 2.5 * median.log10(),
        _ => DEFAULT_MAG_SHIFT,
    }
}

/// One accepted row, before the magnitude shift is known.
#[derive(Debug, Clone, Copy)]
struct RawRow {
    record_number: usize,
    bjd: f64,
    flux: f64,
    flux_error: f64,
    quality: Option<i64>,
}

/// Columns of one light curve, read as a whole.
struct LightCurveColumns {
    time: Vec<f64>,
    flux: Vec<f64>,
    flux_error: Option<Vec<f64>>,
    quality: Option<Vec<Option<i64>>>,
}

impl LightCurveColumns {
    fn read<S: LightCurveSource>(
        source: &S,
        file: &LightCurveFile,
        options: &FitsOptions,
    ) -> Result<Self, FitsError> {
        let name = |role| source.column(file, role, options);
        let read = |role| -> Result<Option<Vec<f64>>, FitsError> {
            name(role).map(|n| file.table.read_f64(n)).transpose()
        };
        Ok(LightCurveColumns {
            time: read(ColumnRole::Time)?.ok_or_else(|| FitsError::ColumnNotFound("TIME".into()))?,
            flux: read(ColumnRole::Flux)?.ok_or_else(|| FitsError::ColumnNotFound("FLUX".into()))?,
            flux_error: read(ColumnRole::FluxError)?,
            quality: name(ColumnRole::QualityFlags)
                .map(|n| file.table.read_i64(n))
                .transpose()?,
        })
    }
}

/// Retriever over FITS light curves of one mission layout.
pub struct TessRetriever<S: LightCurveSource> {
    source: S,
    files: Vec<(String, FitsFile)>,
    options: FitsOptions,
    registry: SeriesRegistry,
    object: Option<String>,
}

impl<S: LightCurveSource> TessRetriever<S> {
    /// Arguments
    /// -----------------
    /// * `source`: mission layout of the files.
    /// * `name`: input name, used when the file has no `OBJECT` keyword.
    /// * `file`: the parsed FITS file.
    pub fn new(source: S, name: impl Into<String>, file: FitsFile) -> Self {
        TessRetriever {
            source,
            files: vec![(name.into(), file)],
            options: FitsOptions::default(),
            registry: SeriesRegistry::with_builtin(),
            object: None,
        }
    }

    pub fn from_bytes(source: S, name: impl Into<String>, bytes: &[u8]) -> Result<Self, ObservationReadError> {
        Ok(Self::new(source, name, FitsFile::from_bytes(bytes)?))
    }

    pub fn from_path(source: S, path: &Utf8Path) -> Result<Self, ObservationReadError> {
        let name = path.file_name().unwrap_or(path.as_str()).to_string();
        Ok(Self::new(source, name, FitsFile::from_path(path)?))
    }

    /// Append another light curve of the same target.
    pub fn add_file(mut self, name: impl Into<String>, file: FitsFile) -> Self {
        self.files.push((name.into(), file));
        self
    }

    pub fn with_options(mut self, options: FitsOptions) -> Self {
        self.options = options;
        self
    }

    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    fn light_curve(name: &str, fits: &FitsFile) -> Result<LightCurveFile, ObservationReadError> {
        let hdu = fits
            .binary_table_hdu()
            .map_err(|_| ObservationReadError::Other(format!("Not a valid FITS file: {name}")))?;
        Ok(LightCurveFile {
            primary: fits.primary_header().clone(),
            table_header: hdu.header.clone(),
            table: BinTable::new(&hdu.header, hdu.data.clone())?,
        })
    }

    fn register_series(&mut self, file: &LightCurveFile) -> SeriesType {
        let series = self.source.series(file, &self.options);
        self.registry
            .register(series.description, series.short_name, series.color)
    }
}

impl<S: LightCurveSource> ObservationRetriever for TessRetriever<S> {
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError> {
        let mut collector = ObservationCollector::for_source("FITS");
        let light_curves = self
            .files
            .iter()
            .map(|(name, fits)| Self::light_curve(name, fits).map(|lc| (name.clone(), lc)))
            .collect::<Result<Vec<_>, _>>()?;
        ctx.set_total(light_curves.iter().map(|(_, lc)| lc.table.n_rows()).sum());

        let mut record_number = 0usize;
        let mut interrupted = false;
        for (name, file) in &light_curves {
            if !self.source.validate(file) {
                return Err(ObservationReadError::Other(format!("Not a valid FITS file: {name}")));
            }
            let epoch = self
                .source
                .reference_epoch(file)
                .ok_or(ObservationReadError::MissingReferenceEpoch)?;
            let band = self.register_series(file);
            let reference = self.source.reference_magnitude(file);
            let columns = LightCurveColumns::read(&self.source, file, &self.options)?;
            let object = file.object().unwrap_or(name.as_str()).to_string();

            let mut rows = Vec::with_capacity(columns.time.len());
            let mut flagged = 0usize;
            for (i, time) in columns.time.iter().enumerate() {
                if ctx.was_cancelled() {
                    interrupted = true;
                    break;
                }
                ctx.increment_progress(1);
                record_number += 1;

                let bjd = time + epoch;
                let flux = columns.flux.get(i).copied().unwrap_or(f64::NAN);
                let flux_error = columns
                    .flux_error
                    .as_ref()
                    .map_or(0.0, |e| e.get(i).copied().unwrap_or(f64::NAN));
                let quality = columns.quality.as_ref().and_then(|q| q.get(i).copied().flatten());

                if !(bjd.is_finite() && flux.is_finite() && flux_error.is_finite() && flux > 0.0) {
                    collector.add_invalid(InvalidObservation::new(
                        record_number,
                        format!("Time = {bjd:.6}, Flux = {flux:.6}, Flux error = {flux_error:.6}"),
                        "Invalid flux or flux error",
                    ));
                    continue;
                }
                if self.options.drop_flagged && quality.is_some_and(|q| q != 0) {
                    flagged += 1;
                    continue;
                }
                rows.push(RawRow {
                    record_number,
                    bjd,
                    flux,
                    flux_error,
                    quality,
                });
            }
            if flagged > 0 {
                log::debug!("{name}: {flagged} row(s) with quality flags dropped");
            }

            let fluxes: Vec<f64> = rows.iter().map(|r| r.flux).collect();
            let shift = self
                .options
                .mag_shift
                .unwrap_or_else(|| magnitude_shift(reference.map(|(m, _)| m), &fluxes));
            log::debug!("{name}: {} row(s), magnitude shift {shift:.5}", rows.len());

            for row in rows {
                let magnitude = Magnitude::new(
                    shift - 2.5 * row.flux.log10(),
                    FLUX_TO_MAG_ERROR * row.flux_error / row.flux,
                );
                let mut ob = ValidObservation::new(row.record_number, row.bjd, magnitude, band.clone());
                ob.name = object.clone();
                if let Some((mag, description)) = reference {
                    ob.add_detail("HEADER_MAG", description, DetailValue::Real(mag));
                }
                ob.add_detail("FLUX", "Flux", DetailValue::Real(row.flux));
                if let Some(quality) = row.quality {
                    ob.add_detail("QUALITY", "Quality", DetailValue::Int(quality));
                }
                collector.add_valid(ob);
            }

            self.object = Some(object);
            if interrupted {
                break;
            }
        }
        ctx.finish();

        if !interrupted {
            collector.ensure_any_valid()?;
        }
        Ok(collector.finish(JdFlavour::Bjd, self.source_name(), self.source_type(), interrupted))
    }

    fn number_of_records(&self) -> Option<usize> {
        self.files
            .iter()
            .map(|(_, fits)| {
                fits.binary_table_hdu()
                    .ok()
                    .and_then(|hdu| hdu.header.get_i64("NAXIS2"))
                    .map(|n| n.max(0) as usize)
            })
            .sum()
    }

    fn source_name(&self) -> String {
        self.object
            .clone()
            .or_else(|| self.files.first().map(|(name, _)| name.clone()))
            .unwrap_or_default()
    }

    fn source_type(&self) -> String {
        self.source.source_type().to_string()
    }
}
