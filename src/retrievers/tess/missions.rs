//! Mission specific layouts of FITS light curves.
//!
//! A [`LightCurveSource`] knows where a mission stores its time, flux, flux error and
//! quality columns, its reference epoch and its reference magnitude. Three layouts are
//! supported:
//!
//! * [`SpocLightCurve`]: Kepler and TESS SPOC light curves (`SAP_FLUX`/`PDCSAP_FLUX`),
//! * [`QlpLightCurve`]: TESS Quick Look Pipeline (`SAP_FLUX`, `KSPSAP_FLUX` or `DET_FLUX`),
//! * [`LightkurveLightCurve`]: files written by Lightkurve (`TIME`, `FLUX`, `FLUX_ERR`).
use crate::constants::INVALID_MAG;
use crate::fits::{BinTable, Header};
use crate::observations::Rgb;

use super::FitsOptions;

/// Columns of a light curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnRole {
    Time,
    Flux,
    FluxError,
    QualityFlags,
}

/// Series a light curve is loaded into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissionSeries {
    pub description: &'static str,
    pub short_name: &'static str,
    pub color: Rgb,
}

impl MissionSeries {
    const fn same(name: &'static str, color: Rgb) -> Self {
        MissionSeries {
            description: name,
            short_name: name,
            color,
        }
    }
}

const GREEN: Rgb = Rgb(0, 255, 0);

/// Headers and table of one light-curve file.
#[derive(Debug, Clone)]
pub struct LightCurveFile {
    pub primary: Header,
    pub table_header: Header,
    pub table: BinTable,
}

impl LightCurveFile {
    /// `TELESCOP` keyword of the primary header.
    pub fn telescope(&self) -> Option<&str> {
        self.primary.get_str("TELESCOP").map(str::trim)
    }

    /// `OBJECT` keyword of the primary header, when not blank.
    pub fn object(&self) -> Option<&str> {
        self.primary
            .get_str("OBJECT")
            .map(str::trim)
            .filter(|o| !o.is_empty())
    }

    fn column_name(&self, index: usize) -> Option<&str> {
        self.table.columns().get(index).map(|c| c.name.as_str())
    }

    /// Sum of two table header keywords, the usual integer + fraction split of an epoch.
    fn epoch(&self, integer: &str, fraction: &str) -> Option<f64> {
        Some(self.table_header.get_f64(integer)? + self.table_header.get_f64(fraction)?)
    }

    /// Primary header magnitude, `None` when absent or equal to [`INVALID_MAG`].
    fn magnitude(&self, keyword: &str) -> Option<f64> {
        self.primary
            .get_f64(keyword)
            .filter(|m| *m != INVALID_MAG)
    }
}

/// Mission specific reading rules of a FITS light curve.
pub trait LightCurveSource {
    /// `true` when the file has the expected column layout.
    fn validate(&self, file: &LightCurveFile) -> bool;

    fn series(&self, file: &LightCurveFile, options: &FitsOptions) -> MissionSeries;

    /// Catalogue magnitude of the target and its description, used to align the
    /// median instrumental magnitude.
    fn reference_magnitude(&self, _file: &LightCurveFile) -> Option<(f64, &'static str)> {
        None
    }

    /// Julian Day the `TIME` column is counted from.
    fn reference_epoch(&self, file: &LightCurveFile) -> Option<f64>;

    /// Name of the column playing `role`, `None` when the layout has none.
    fn column(&self, file: &LightCurveFile, role: ColumnRole, options: &FitsOptions) -> Option<&'static str>;

    fn source_type(&self) -> &'static str;
}

/// Kepler and TESS SPOC light curves.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpocLightCurve;

impl LightCurveSource for SpocLightCurve {
    fn validate(&self, file: &LightCurveFile) -> bool {
        [(0, "TIME"), (3, "SAP_FLUX"), (4, "SAP_FLUX_ERR"), (7, "PDCSAP_FLUX"), (8, "PDCSAP_FLUX_ERR")]
            .iter()
            .all(|(i, name)| file.column_name(*i) == Some(*name))
    }

    fn series(&self, file: &LightCurveFile, options: &FitsOptions) -> MissionSeries {
        match (file.telescope(), options.load_raw) {
            (Some("TESS"), false) => MissionSeries::same("TESS", GREEN),
            (Some("TESS"), true) => MissionSeries::same("TESS raw", GREEN),
            (Some("Kepler"), false) => MissionSeries::same("Kepler", GREEN),
            (Some("Kepler"), true) => MissionSeries::same("Kepler raw", GREEN),
            (_, false) => MissionSeries::same("MAST", GREEN),
            (_, true) => MissionSeries::same("MAST raw", GREEN),
        }
    }

    fn reference_magnitude(&self, file: &LightCurveFile) -> Option<(f64, &'static str)> {
        match file.telescope() {
            Some("TESS") => file.magnitude("TESSMAG").map(|m| (m, "TESS Magnitude")),
            Some("Kepler") => file.magnitude("KEPMAG").map(|m| (m, "Kepler Magnitude")),
            _ => None,
        }
    }

    fn reference_epoch(&self, file: &LightCurveFile) -> Option<f64> {
        file.epoch("BJDREFI", "BJDREFF")
    }

    fn column(&self, file: &LightCurveFile, role: ColumnRole, options: &FitsOptions) -> Option<&'static str> {
        match role {
            ColumnRole::Time => Some("TIME"),
            ColumnRole::Flux if options.load_raw => Some("SAP_FLUX"),
            ColumnRole::Flux => Some("PDCSAP_FLUX"),
            ColumnRole::FluxError if options.load_raw => Some("SAP_FLUX_ERR"),
            ColumnRole::FluxError => Some("PDCSAP_FLUX_ERR"),
            ColumnRole::QualityFlags => {
                let name = match file.telescope() {
                    Some("Kepler") => "SAP_QUALITY",
                    Some("TESS") => "QUALITY",
                    _ => return None,
                };
                file.table.has_column(name).then_some(name)
            }
        }
    }

    fn source_type(&self) -> &'static str {
        "Kepler/TESS FITS File"
    }
}

/// TESS Quick Look Pipeline light curves.
///
/// Detrended flux columns were renamed from `KSPSAP_FLUX` to `DET_FLUX` in sector 56;
/// both are accepted. The raw `SAP_FLUX` has no error column.
#[derive(Debug, Clone, Copy, Default)]
pub struct QlpLightCurve;

impl QlpLightCurve {
    fn detrended(file: &LightCurveFile) -> (&'static str, &'static str) {
        if file.table.has_column("DET_FLUX") {
            ("DET_FLUX", "DET_FLUX_ERR")
        } else {
            ("KSPSAP_FLUX", "KSPSAP_FLUX_ERR")
        }
    }
}

impl LightCurveSource for QlpLightCurve {
    fn validate(&self, file: &LightCurveFile) -> bool {
        let (flux, error) = Self::detrended(file);
        [(0, "TIME"), (2, "SAP_FLUX"), (3, flux), (4, error), (5, "QUALITY")]
            .iter()
            .all(|(i, name)| file.column_name(*i) == Some(*name))
    }

    fn series(&self, _file: &LightCurveFile, options: &FitsOptions) -> MissionSeries {
        if options.load_raw {
            MissionSeries::same("QLP raw", GREEN)
        } else {
            MissionSeries::same("QLP", GREEN)
        }
    }

    fn reference_magnitude(&self, file: &LightCurveFile) -> Option<(f64, &'static str)> {
        file.magnitude("TESSMAG").map(|m| (m, "TESS Magnitude"))
    }

    fn reference_epoch(&self, file: &LightCurveFile) -> Option<f64> {
        file.epoch("BJDREFI", "BJDREFR")
            .or_else(|| file.epoch("BJDREFI", "BJDREFF"))
    }

    fn column(&self, file: &LightCurveFile, role: ColumnRole, options: &FitsOptions) -> Option<&'static str> {
        let (flux, error) = Self::detrended(file);
        match role {
            ColumnRole::Time => Some("TIME"),
            ColumnRole::Flux if options.load_raw => Some("SAP_FLUX"),
            ColumnRole::Flux => Some(flux),
            ColumnRole::FluxError if options.load_raw => None,
            ColumnRole::FluxError => Some(error),
            ColumnRole::QualityFlags => Some("QUALITY"),
        }
    }

    fn source_type(&self) -> &'static str {
        "QLP FITS File"
    }
}

/// Light curves exported by Lightkurve.
///
/// Times are counted from BTJD (2457000) for TESS and BKJD (2454833) for Kepler; the
/// magnitudes are instrumental.
#[derive(Debug, Clone, Copy, Default)]
pub struct LightkurveLightCurve;

impl LightCurveSource for LightkurveLightCurve {
    fn validate(&self, file: &LightCurveFile) -> bool {
        file.column_name(0) == Some("TIME") && file.table.columns().len() >= 3
    }

    fn series(&self, file: &LightCurveFile, _options: &FitsOptions) -> MissionSeries {
        match file.telescope() {
            Some("TESS") => MissionSeries {
                description: "Lightkurve TESS (arbitrary mag)",
                short_name: "Lightkurve TESS",
                color: Rgb(255, 0, 255),
            },
            Some("Kepler") => MissionSeries {
                description: "Lightkurve Kepler (arbitrary mag)",
                short_name: "Lightkurve Kepler",
                color: Rgb(64, 64, 64),
            },
            _ => MissionSeries {
                description: "Lightkurve (arbitrary mag)",
                short_name: "Lightkurve",
                color: Rgb(255, 175, 175),
            },
        }
    }

    fn reference_epoch(&self, file: &LightCurveFile) -> Option<f64> {
        Some(match file.telescope() {
            Some("TESS") => 2_457_000.0,
            Some("Kepler") => 2_454_833.0,
            _ => 0.0,
        })
    }

    fn column(&self, file: &LightCurveFile, role: ColumnRole, _options: &FitsOptions) -> Option<&'static str> {
        match role {
            ColumnRole::Time => Some("TIME"),
            ColumnRole::Flux => Some("FLUX"),
            ColumnRole::FluxError => Some("FLUX_ERR"),
            ColumnRole::QualityFlags => file.table.has_column("QUALITY").then_some("QUALITY"),
        }
    }

    fn source_type(&self) -> &'static str {
        "Lightkurve FITS File"
    }
}
