//! # Gaia DR2/DR3 epoch photometry
//!
//! Reads Gaia epoch photometry CSV (narrow archive layout or wide DR3 layout, see
//! [`schema`]) into G, BP and RP observations, optionally transformed into
//! Johnson-Cousins V, R, I (and B for DR3) with [`transform`].
//!
//! ## Overview
//! -----------------
//! * Julian Days are `time + 2455197.5` (barycentric, [`GAIA_EPOCH`]).
//! * The uncertainty is derived from the fluxes, `-2.5 log10(flux / (flux + flux_error))`,
//!   and must fall within `[0, 1]`.
//! * A row is discrepant when `rejected_by_photometry` or `rejected_by_variability` is
//!   true, unless [`GaiaOptions::ignore_flags`] is set.
//! * When transforming, each G observation is matched with the nearest BP and RP
//!   observations (less than five minutes apart) and the triple yields one
//!   [`OvribGroup`]. G observations without a match become invalid observations.
//!
//! ## Example
//! -----------------
//! ```rust,no_run
//! use varstar::retrievers::gaia::{GaiaOptions, GaiaRelease, GaiaRetriever};
//! use varstar::retrievers::{ObservationRetriever, RetrievalContext};
//!
//! let csv = std::fs::read_to_string("epoch_photometry.csv").unwrap();
//! let mut retriever = GaiaRetriever::from_reader(csv.as_bytes(), "epoch_photometry")
//!     .unwrap()
//!     .with_options(GaiaOptions::default().release(GaiaRelease::Dr2).transform(true));
//! let result = retriever.retrieve(&RetrievalContext::new()).unwrap();
//! println!("{} observations", result.valid.len());
//! ```
pub mod schema;
pub mod transform;

use std::io::BufRead;

use camino::Utf8Path;
use serde::{Deserialize, Serialize};

use crate::constants::{GAIA_EPOCH, UNCERTAINTY_RANGE};
use crate::observations::{DetailValue, InvalidObservation, JdFlavour, Rgb, SeriesRegistry, SeriesType, ValidObservation};
use crate::retrievers::{read_lines, ObservationCollector, ObservationRetriever, RetrievalContext, RetrievedObservations};
use crate::validation::{parse_real, FieldValidator, JulianDayValidator, MagnitudeFieldValidator, UncertaintyValueValidator};
use crate::varstar_errors::{ObservationReadError, ObservationValidationError};

use schema::{split_csv_line, GaiaSchema, NarrowRow};
pub use transform::{closest_observation, ColorTransform, OvribGroup};

/// Gaia data release of the input.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum GaiaRelease {
    Dr2,
    #[default]
    Dr3,
    Unknown,
}

impl GaiaRelease {
    /// Observer code of the release ("GaiaDR2", "GaiaDR3", or "Gaia").
    pub fn obs_code(&self) -> &'static str {
        match self {
            GaiaRelease::Dr2 => "GaiaDR2",
            GaiaRelease::Dr3 => "GaiaDR3",
            GaiaRelease::Unknown => "Gaia",
        }
    }
}

/// Options of the Gaia retriever.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GaiaOptions {
    pub release: GaiaRelease,
    /// Produce V/R/I\[/B\] observations instead of G/BP/RP.
    pub transform: bool,
    /// Do not mark rejected transits as discrepant.
    pub ignore_flags: bool,
}

impl GaiaOptions {
    pub fn release(mut self, release: GaiaRelease) -> Self {
        self.release = release;
        self
    }

    pub fn transform(mut self, transform: bool) -> Self {
        self.transform = transform;
        self
    }

    pub fn ignore_flags(mut self, ignore_flags: bool) -> Self {
        self.ignore_flags = ignore_flags;
        self
    }
}

/// Gaia passband of a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaiaBand {
    G,
    Bp,
    Rp,
}

impl GaiaBand {
    pub const ALL: [GaiaBand; 3] = [GaiaBand::G, GaiaBand::Bp, GaiaBand::Rp];

    pub fn from_code(code: &str) -> Result<Self, ObservationValidationError> {
        match code.trim() {
            "G" => Ok(GaiaBand::G),
            "BP" => Ok(GaiaBand::Bp),
            "RP" => Ok(GaiaBand::Rp),
            other => Err(ObservationValidationError::UnexpectedGaiaBand(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            GaiaBand::G => "Gaia G",
            GaiaBand::Bp => "Gaia BP",
            GaiaBand::Rp => "Gaia RP",
        }
    }

    pub fn color(&self) -> Rgb {
        match self {
            GaiaBand::G => Rgb(0, 128, 0),
            GaiaBand::Bp => Rgb(0, 0, 255),
            GaiaBand::Rp => Rgb(255, 0, 0),
        }
    }

    /// Register the series of this band in `registry`.
    pub fn register(&self, registry: &mut SeriesRegistry) -> SeriesType {
        registry.register(self.name(), self.name(), self.color())
    }
}

/// A validated row and the text it came from.
struct GaiaRow {
    band: GaiaBand,
    observation: ValidObservation,
    input: String,
}

/// Per-row validators.
struct RowParser {
    options: GaiaOptions,
    series: [SeriesType; 3],
    jd: JulianDayValidator,
    magnitude: MagnitudeFieldValidator,
    uncertainty: UncertaintyValueValidator,
}

impl RowParser {
    fn band_series(&self, band: GaiaBand) -> SeriesType {
        self.series[band as usize].clone()
    }

    fn parse(&self, row: &NarrowRow, record_number: usize) -> Result<(GaiaBand, ValidObservation), ObservationValidationError> {
        let jd = self.jd.parse(&row.time)? + GAIA_EPOCH;
        let mut magnitude = self.magnitude.validate(&row.mag)?;

        let flux = parse_real("flux", &row.flux)?;
        let flux_error = parse_real("flux_error", &row.flux_error)?;
        if !flux.is_finite() || !flux_error.is_finite() || flux <= 0.0 || flux_error < 0.0 {
            return Err(ObservationValidationError::InvalidGaiaFlux { flux, flux_error });
        }
        magnitude.uncertainty = self
            .uncertainty
            .check(-2.5 * (flux / (flux + flux_error)).log10())?;

        let band = GaiaBand::from_code(&row.band)?;

        let obs_code = self.options.release.obs_code();
        let mut ob = ValidObservation::new(record_number, jd, magnitude, self.band_series(band));
        ob.name = format!("{obs_code} {}", row.source_id);
        ob.obs_code = Some(obs_code.to_string());

        let rejected = |flag: &str| flag.eq_ignore_ascii_case("true");
        if !self.options.ignore_flags
            && (rejected(&row.rejected_by_photometry) || rejected(&row.rejected_by_variability))
        {
            ob.set_discrepant(true);
        }

        ob.add_detail("FLUX", "flux", DetailValue::Real(flux));
        if !self.options.transform {
            ob.add_detail(
                "REJECTED_BY_PHOTOMETRY",
                "rejected_by_photometry",
                DetailValue::Text(row.rejected_by_photometry.clone()),
            );
            ob.add_detail(
                "REJECTED_BY_VARIABILITY",
                "rejected_by_variability",
                DetailValue::Text(row.rejected_by_variability.clone()),
            );
            if let Ok(flags) = row.other_flags.trim().parse::<i64>() {
                ob.add_detail("OTHER_FLAGS", "other_flags", DetailValue::Int(flags));
            }
        }
        Ok((band, ob))
    }
}

/// Retriever over an in-memory copy of a Gaia CSV file.
pub struct GaiaRetriever {
    lines: Vec<String>,
    options: GaiaOptions,
    registry: SeriesRegistry,
    source_name: String,
}

impl GaiaRetriever {
    pub fn from_reader<R: BufRead>(reader: R, name: &str) -> Result<Self, ObservationReadError> {
        let mut registry = SeriesRegistry::with_builtin();
        for band in GaiaBand::ALL {
            band.register(&mut registry);
        }
        Ok(GaiaRetriever {
            lines: read_lines(reader)?,
            options: GaiaOptions::default(),
            registry,
            source_name: name.to_string(),
        })
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, ObservationReadError> {
        let file = std::fs::File::open(path)?;
        let name = path.file_stem().unwrap_or(path.as_str());
        Self::from_reader(std::io::BufReader::new(file), name)
    }

    pub fn with_options(mut self, options: GaiaOptions) -> Self {
        self.options = options;
        self
    }

    /// Series known to this retriever, Gaia G/BP/RP included.
    pub fn registry(&self) -> &SeriesRegistry {
        &self.registry
    }

    fn row_parser(&self, options: GaiaOptions) -> RowParser {
        let series = GaiaBand::ALL.map(|b| {
            self.registry
                .by_short_name(b.name())
                .cloned()
                .unwrap_or_else(|| SeriesType::new(-1, b.name(), b.name(), b.color()))
        });
        RowParser {
            options,
            series,
            jd: JulianDayValidator::new(),
            magnitude: MagnitudeFieldValidator::new(),
            uncertainty: UncertaintyValueValidator::new(UNCERTAINTY_RANGE.into()),
        }
    }
}

/// Transform cached rows, G by G.
fn transform_rows(
    collector: &mut ObservationCollector,
    rows: Vec<GaiaRow>,
    transforms: &[ColorTransform],
) {
    let (mut green, mut blue, mut red) = (Vec::new(), Vec::new(), Vec::new());
    for row in rows {
        match row.band {
            GaiaBand::G => green.push(row),
            GaiaBand::Bp => blue.push(row.observation),
            GaiaBand::Rp => red.push(row.observation),
        }
    }

    let n_groups = green.len();
    for (i, g) in green.iter().enumerate() {
        let jd = g.observation.jd();
        match (closest_observation(jd, &blue), closest_observation(jd, &red)) {
            (Some(b), Some(r)) => {
                let group = OvribGroup::transform(&g.observation, &blue[b], &red[r], transforms, i, n_groups);
                for ob in group {
                    collector.add_valid(ob);
                }
            }
            _ => collector.add_invalid(InvalidObservation::new(
                g.observation.record_number,
                g.input.as_str(),
                ObservationValidationError::NoMatchingObservation.to_string(),
            )),
        }
    }
}

impl ObservationRetriever for GaiaRetriever {
    fn retrieve(&mut self, ctx: &RetrievalContext<'_>) -> Result<RetrievedObservations, ObservationReadError> {
        let mut collector = ObservationCollector::for_source("Gaia");
        if self.lines.is_empty() {
            return Ok(collector.finish(JdFlavour::Bjd, self.source_name(), self.source_type(), false));
        }
        ctx.set_total(self.lines.len());

        let mut options = self.options;
        let mut parser = self.row_parser(options);
        let mut schema: Option<GaiaSchema> = None;
        let mut cached: Vec<GaiaRow> = Vec::new();
        let mut parsed = 0usize;
        let mut narrow_index = 0usize;
        let mut interrupted = false;

        for (i, line) in self.lines.iter().enumerate() {
            if ctx.was_cancelled() {
                interrupted = true;
                break;
            }
            ctx.increment_progress(1);

            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let Some(current) = &schema else {
                let Ok(fields) = split_csv_line(line) else {
                    continue;
                };
                schema = GaiaSchema::detect(&fields)?;
                if schema.as_ref().is_some_and(GaiaSchema::is_wide) && options.release != GaiaRelease::Dr3 {
                    log::debug!("wide Gaia layout only exists in DR3, release forced to DR3");
                    options = options.release(GaiaRelease::Dr3);
                    parser = self.row_parser(options);
                }
                continue;
            };

            let fields = match split_csv_line(line) {
                Ok(fields) => fields,
                Err(e) => {
                    collector.add_invalid(InvalidObservation::new(i + 1, line, e.to_string()));
                    continue;
                }
            };
            for row in current.rows(&fields) {
                let (record_number, input) = if current.is_wide() {
                    narrow_index += 1;
                    (narrow_index, row.to_csv_line())
                } else {
                    (i + 1, line.to_string())
                };
                match parser.parse(&row, record_number) {
                    Ok((band, observation)) => {
                        parsed += 1;
                        self.source_name = observation.name.clone();
                        if options.transform {
                            cached.push(GaiaRow { band, observation, input });
                        } else {
                            collector.add_valid(observation);
                        }
                    }
                    Err(e) => collector.add_invalid(InvalidObservation::new(record_number, input, e.to_string())),
                }
            }
        }
        ctx.finish();

        if schema.is_none() && !interrupted {
            return Err(ObservationReadError::HeaderNotFound("Gaia"));
        }
        if parsed == 0 && !interrupted {
            if let Some(first) = collector.first_error() {
                return Err(ObservationReadError::NoObservations(first.to_string()));
            }
        }
        if options.transform {
            transform_rows(&mut collector, cached, transform::transforms_for(options.release));
            if !interrupted {
                collector.ensure_any_valid()?;
            }
        }
        Ok(collector.finish(JdFlavour::Bjd, self.source_name(), self.source_type(), interrupted))
    }

    fn number_of_records(&self) -> Option<usize> {
        Some(self.lines.len())
    }

    fn source_name(&self) -> String {
        self.source_name.clone()
    }

    fn source_type(&self) -> String {
        "Gaia DR2/DR3 Format".to_string()
    }
}

#[cfg(test)]
mod gaia_test {
    use super::*;
    use approx::assert_relative_eq;

    const HEADER: &str = "source_id,transit_id,band,time,mag,flux,flux_error,flux_over_error,\
rejected_by_photometry,rejected_by_variability,other_flags,solution_id";

    fn retrieve(text: &str, options: GaiaOptions) -> Result<RetrievedObservations, ObservationReadError> {
        GaiaRetriever::from_reader(text.as_bytes(), "gaia")?
            .with_options(options)
            .retrieve(&RetrievalContext::new())
    }

    fn triple(transit: u32, time: f64) -> String {
        format!(
            "42,{transit},G,{time},12.0,10000,10,1000,false,false,1,7\n\
             42,{transit},BP,{time},12.5,6000,12,500,false,true,0,7\n\
             42,{transit},RP,{time},11.5,15000,15,1000,false,false,0,7\n"
        )
    }

    #[test]
    fn test_raw_bands() {
        let text = format!("{HEADER}\n{}", triple(1, 1700.0));
        let result = retrieve(&text, GaiaOptions::default()).unwrap();
        assert_eq!(result.valid.len(), 3);
        assert_eq!(result.jd_flavour, JdFlavour::Bjd);
        assert_eq!(result.source_name, "GaiaDR3 42");
        assert_eq!(result.source_type, "Gaia DR2/DR3 Format");

        let g = &result.valid[0];
        assert_eq!(g.record_number, 2);
        assert_eq!(g.band.short_name, "Gaia G");
        assert_relative_eq!(g.jd(), 1700.0 + GAIA_EPOCH);
        assert_relative_eq!(g.uncertainty(), -2.5 * (10000.0_f64 / 10010.0).log10());
        assert_eq!(g.obs_code.as_deref(), Some("GaiaDR3"));
        assert_eq!(g.detail("OTHER_FLAGS"), Some(&DetailValue::Int(1)));
        assert_eq!(g.detail("FLUX"), Some(&DetailValue::Real(10000.0)));

        assert!(result.valid[1].is_discrepant());
        assert_eq!(result.series().len(), 3);
    }

    #[test]
    fn test_ignore_flags() {
        let text = format!("{HEADER}\n{}", triple(1, 1700.0));
        let result = retrieve(&text, GaiaOptions::default().ignore_flags(true)).unwrap();
        assert!(result.valid.iter().all(|o| !o.is_discrepant()));
    }

    #[test]
    fn test_transform_dr2() {
        let text = format!("{HEADER}\n{}{}", triple(1, 1700.0), triple(2, 1800.0));
        let options = GaiaOptions::default().release(GaiaRelease::Dr2).transform(true);
        let result = retrieve(&text, options).unwrap();
        assert_eq!(result.valid.len(), 6);
        assert!(result.invalid.is_empty());

        let numbers: Vec<usize> = result.valid.iter().map(|o| o.record_number).collect();
        assert_eq!(numbers, vec![1, 3, 5, 2, 4, 6]);
        let v = &result.valid[0];
        assert_eq!(v.band, SeriesType::JOHNSON_V);
        assert_eq!(v.name, "GaiaDR2 42");
        assert!(v.transformed && v.is_discrepant());
        assert_relative_eq!(v.mag(), 12.0 + 0.01760 + 0.006860 + 0.1732, epsilon = 1e-12);
        assert!(v.detail("REJECTED_BY_PHOTOMETRY").is_none());
    }

    #[test]
    fn test_transform_dr3_has_b() {
        let text = format!("{HEADER}\n{}", triple(1, 1700.0));
        let result = retrieve(&text, GaiaOptions::default().transform(true)).unwrap();
        assert_eq!(result.valid.len(), 4);
        assert_eq!(result.valid[3].band, SeriesType::JOHNSON_B);
    }

    #[test]
    fn test_unmatched_green() {
        let text = format!(
            "{HEADER}\n{}42,3,G,1900.0,12.0,10000,10,1000,false,false,0,7\n",
            triple(1, 1700.0)
        );
        let result = retrieve(&text, GaiaOptions::default().transform(true)).unwrap();
        assert_eq!(result.valid.len(), 4);
        assert_eq!(result.invalid.len(), 1);
        assert_eq!(result.invalid[0].error, "No matching blue/red observation to transform");
        assert_eq!(result.invalid[0].record_number, 5);
        assert!(result.invalid[0].input.contains("1900.0"));
    }

    #[test]
    fn test_record_level_errors() {
        let text = format!(
            "{HEADER}\n{}42,4,X,1700.0,12.0,100,1,100,false,false,0,7\n42,5,G,1700.0,12.0,-5,1,1,false,false,0,7\n",
            triple(1, 1700.0)
        );
        let result = retrieve(&text, GaiaOptions::default()).unwrap();
        assert_eq!(result.valid.len(), 3);
        assert_eq!(result.invalid[0].error, "Unexpected Gaia band: X");
        assert!(result.invalid[1].error.starts_with("Invalid Gaia flux"));
        assert_eq!(result.invalid[1].source.as_deref(), Some("Gaia"));
    }

    #[test]
    fn test_missing_header() {
        match retrieve("1,2,3\n", GaiaOptions::default()) {
            Err(ObservationReadError::HeaderNotFound(which)) => assert_eq!(which, "Gaia"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_all_rows_invalid() {
        let text = format!("{HEADER}\n42,1,G,abc,12.0,100,1,100,false,false,0,7\n");
        match retrieve(&text, GaiaOptions::default()) {
            Err(ObservationReadError::NoObservations(first)) => assert!(first.contains("abc")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wide_forces_dr3() {
        let header = "source_id,solution_id,g_transit_time,g_transit_mag,g_transit_flux,g_transit_flux_error,\
bp_obs_time,bp_mag,bp_flux,bp_flux_error,rp_obs_time,rp_mag,rp_flux,rp_flux_error";
        let text = format!("{header}\n42,7,1700.0,12.0,10000,10,1700.0,12.5,6000,12,1700.001,11.5,15000,15\n");
        let options = GaiaOptions::default().release(GaiaRelease::Dr2).transform(true);
        let result = retrieve(&text, options).unwrap();
        assert_eq!(result.valid.len(), 4);
        assert_eq!(result.source_name, "GaiaDR3 42");
    }
}
