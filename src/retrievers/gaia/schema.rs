//! # Gaia CSV schemas
//!
//! Two layouts are accepted:
//!
//! * the **narrow** epoch photometry layout (one row per transit and band) with the
//!   columns listed in [`NARROW_COLUMNS`], located by name (only
//!   [`REQUIRED_NARROW_COLUMNS`] must be present);
//! * the **wide** DR3 layout (one row per source) recognised by the
//!   `g_transit_time`, `bp_obs_time` and `rp_obs_time` columns. A wide row carries
//!   either one value per column or bracketed arrays of per-transit values
//!   (`"[a, b, …]"`); it is pivoted into narrow G, BP and RP rows.
//!
//! Both layouts feed the same per-row validation through [`NarrowRow`].
use crate::varstar_errors::ObservationReadError;

/// Columns of the narrow layout, in their usual order.
pub const NARROW_COLUMNS: [&str; 12] = [
    "source_id",
    "transit_id",
    "band",
    "time",
    "mag",
    "flux",
    "flux_error",
    "flux_over_error",
    "rejected_by_photometry",
    "rejected_by_variability",
    "other_flags",
    "solution_id",
];

/// Columns a narrow header must carry; `transit_id`, `flux_over_error` and
/// `solution_id` are optional.
pub const REQUIRED_NARROW_COLUMNS: [&str; 9] = [
    "source_id",
    "band",
    "time",
    "mag",
    "flux",
    "flux_error",
    "rejected_by_photometry",
    "rejected_by_variability",
    "other_flags",
];

const WIDE_MARKERS: [&str; 3] = ["g_transit_time", "bp_obs_time", "rp_obs_time"];

/// One band of a wide row.
#[derive(Debug, Clone, Copy)]
struct WideBand {
    band: &'static str,
    time: &'static str,
    mag: &'static str,
    flux: &'static str,
    flux_error: &'static str,
    flux_over_error: &'static str,
    variability_reject: &'static str,
}

const WIDE_BANDS: [WideBand; 3] = [
    WideBand {
        band: "G",
        time: "g_transit_time",
        mag: "g_transit_mag",
        flux: "g_transit_flux",
        flux_error: "g_transit_flux_error",
        flux_over_error: "g_transit_flux_over_error",
        variability_reject: "variability_flag_g_reject",
    },
    WideBand {
        band: "BP",
        time: "bp_obs_time",
        mag: "bp_mag",
        flux: "bp_flux",
        flux_error: "bp_flux_error",
        flux_over_error: "bp_flux_over_error",
        variability_reject: "variability_flag_bp_reject",
    },
    WideBand {
        band: "RP",
        time: "rp_obs_time",
        mag: "rp_mag",
        flux: "rp_flux",
        flux_error: "rp_flux_error",
        flux_over_error: "rp_flux_over_error",
        variability_reject: "variability_flag_rp_reject",
    },
];

/// Column positions of a header line.
#[derive(Debug, Clone)]
pub struct ColumnIndex {
    names: Vec<String>,
}

impl ColumnIndex {
    fn new(fields: &[String]) -> Self {
        ColumnIndex {
            names: fields.iter().map(|f| f.trim().to_string()).collect(),
        }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    fn require(&self, name: &str) -> Result<usize, ObservationReadError> {
        self.position(name)
            .ok_or_else(|| ObservationReadError::MissingColumn(name.to_string()))
    }
}

/// Layout recognised from a header line.
#[derive(Debug, Clone)]
pub enum GaiaSchema {
    Narrow(ColumnIndex),
    Wide(ColumnIndex),
}

impl GaiaSchema {
    /// Recognise a header line.
    ///
    /// Return
    /// ----------
    /// * `Ok(None)` when `fields` is not a Gaia header.
    /// * [`ObservationReadError::MissingColumn`] for a wide header lacking a required column.
    pub fn detect(fields: &[String]) -> Result<Option<Self>, ObservationReadError> {
        let columns = ColumnIndex::new(fields);
        if WIDE_MARKERS.iter().all(|m| columns.position(m).is_some()) {
            columns.require("source_id")?;
            for band in &WIDE_BANDS {
                for name in [band.time, band.mag, band.flux, band.flux_error] {
                    columns.require(name)?;
                }
            }
            log::debug!("Gaia wide DR3 header detected");
            return Ok(Some(GaiaSchema::Wide(columns)));
        }
        if REQUIRED_NARROW_COLUMNS.iter().all(|c| columns.position(c).is_some()) {
            log::debug!("Gaia narrow header detected");
            return Ok(Some(GaiaSchema::Narrow(columns)));
        }
        Ok(None)
    }

    pub fn is_wide(&self) -> bool {
        matches!(self, GaiaSchema::Wide(_))
    }

    /// Narrow rows carried by one data line.
    pub fn rows(&self, fields: &[String]) -> Vec<NarrowRow> {
        match self {
            GaiaSchema::Narrow(columns) => vec![NarrowRow::from_narrow(columns, fields)],
            GaiaSchema::Wide(columns) => pivot(columns, fields),
        }
    }
}

/// A narrow epoch photometry row, values kept as text until validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NarrowRow {
    pub source_id: String,
    pub transit_id: String,
    pub band: String,
    pub time: String,
    pub mag: String,
    pub flux: String,
    pub flux_error: String,
    pub flux_over_error: String,
    pub rejected_by_photometry: String,
    pub rejected_by_variability: String,
    pub other_flags: String,
    pub solution_id: String,
}

impl NarrowRow {
    fn from_narrow(columns: &ColumnIndex, fields: &[String]) -> Self {
        let get = |name: &str| {
            columns
                .position(name)
                .and_then(|i| fields.get(i))
                .map(|v| v.trim().to_string())
                .unwrap_or_default()
        };
        NarrowRow {
            source_id: get("source_id"),
            transit_id: get("transit_id"),
            band: get("band"),
            time: get("time"),
            mag: get("mag"),
            flux: get("flux"),
            flux_error: get("flux_error"),
            flux_over_error: get("flux_over_error"),
            rejected_by_photometry: get("rejected_by_photometry"),
            rejected_by_variability: get("rejected_by_variability"),
            other_flags: get("other_flags"),
            solution_id: get("solution_id"),
        }
    }

    /// The row rendered in the narrow layout column order.
    pub fn to_csv_line(&self) -> String {
        [
            &self.source_id,
            &self.transit_id,
            &self.band,
            &self.time,
            &self.mag,
            &self.flux,
            &self.flux_error,
            &self.flux_over_error,
            &self.rejected_by_photometry,
            &self.rejected_by_variability,
            &self.other_flags,
            &self.solution_id,
        ]
        .iter()
        .map(|s| s.as_str())
        .collect::<Vec<_>>()
        .join(",")
    }
}

/// Values of a cell: the elements of a bracketed array, or the cell itself.
fn cell_values(cell: &str) -> Vec<&str> {
    let cell = cell.trim();
    let inner = cell
        .strip_prefix('[')
        .and_then(|c| c.strip_suffix(']'))
        .or_else(|| cell.strip_prefix('(').and_then(|c| c.strip_suffix(')')));
    match inner {
        Some(inner) if inner.trim().is_empty() => Vec::new(),
        Some(inner) => inner.split(',').map(str::trim).collect(),
        None => vec![cell],
    }
}

/// `k`-th value of a cell; a scalar applies to every transit, empty values fall back to `default`.
fn element(cell: Option<&str>, k: usize, default: &str) -> String {
    let Some(cell) = cell else {
        return default.to_string();
    };
    let values = cell_values(cell);
    let value = if values.len() == 1 { values.first() } else { values.get(k) };
    value
        .filter(|v| !v.is_empty())
        .map_or_else(|| default.to_string(), |v| v.to_string())
}

fn is_missing_time(value: &str) -> bool {
    value.is_empty() || value.eq_ignore_ascii_case("nan") || value.eq_ignore_ascii_case("null")
}

/// Split one wide row into G, BP and RP narrow rows, transit by transit.
///
/// Transits without a time in a band carry no measurement and are skipped.
fn pivot(columns: &ColumnIndex, fields: &[String]) -> Vec<NarrowRow> {
    let cell = |name: &str| columns.position(name).and_then(|i| fields.get(i)).map(String::as_str);
    let source_id = element(cell("source_id"), 0, "");
    let solution_id = element(cell("solution_id"), 0, "");
    let noisy = cell("photometry_flag_noisy_data");

    let n_transits = WIDE_BANDS
        .iter()
        .map(|b| cell(b.time).map_or(0, |c| cell_values(c).len()))
        .max()
        .unwrap_or(0);

    let mut rows = Vec::with_capacity(n_transits * WIDE_BANDS.len());
    for k in 0..n_transits {
        for band in &WIDE_BANDS {
            let time = element(cell(band.time), k, "");
            if is_missing_time(&time) {
                continue;
            }
            rows.push(NarrowRow {
                source_id: source_id.clone(),
                transit_id: element(cell("transit_id"), k, ""),
                band: band.band.to_string(),
                time,
                mag: element(cell(band.mag), k, ""),
                flux: element(cell(band.flux), k, ""),
                flux_error: element(cell(band.flux_error), k, ""),
                flux_over_error: element(cell(band.flux_over_error), k, ""),
                rejected_by_photometry: element(noisy, k, "false"),
                rejected_by_variability: element(cell(band.variability_reject), k, "false"),
                other_flags: String::new(),
                solution_id: solution_id.clone(),
            });
        }
    }
    rows
}

/// Split one CSV line into trimmed fields, honouring quotes.
pub fn split_csv_line(line: &str) -> Result<Vec<String>, csv::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(line.as_bytes());
    match reader.records().next() {
        Some(record) => Ok(record?.iter().map(str::to_string).collect()),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod gaia_schema_test {
    use super::*;

    fn fields(line: &str) -> Vec<String> {
        split_csv_line(line).unwrap()
    }

    const WIDE_HEADER: &str = "source_id,solution_id,transit_id,g_transit_time,g_transit_mag,g_transit_flux,\
g_transit_flux_error,bp_obs_time,bp_mag,bp_flux,bp_flux_error,rp_obs_time,rp_mag,rp_flux,rp_flux_error,\
photometry_flag_noisy_data,variability_flag_g_reject,variability_flag_bp_reject,variability_flag_rp_reject";

    #[test]
    fn test_narrow_detection() {
        let header = fields(&NARROW_COLUMNS.join(","));
        let schema = GaiaSchema::detect(&header).unwrap().unwrap();
        assert!(!schema.is_wide());

        let rows = schema.rows(&fields("42,17,BP,1700.5,12.3,1000.0,10.0,100.0,false,true,0,375316653866487564"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].band, "BP");
        assert_eq!(rows[0].rejected_by_variability, "true");
        assert_eq!(
            rows[0].to_csv_line(),
            "42,17,BP,1700.5,12.3,1000.0,10.0,100.0,false,true,0,375316653866487564"
        );
    }

    #[test]
    fn test_narrow_header_without_optional_columns() {
        let header = fields(&REQUIRED_NARROW_COLUMNS.join(","));
        let schema = GaiaSchema::detect(&header).unwrap().unwrap();
        assert!(!schema.is_wide());

        let rows = schema.rows(&fields("42,G,1700.5,12.3,1000.0,10.0,false,false,1"));
        assert_eq!(rows[0].band, "G");
        assert_eq!(rows[0].other_flags, "1");
        assert!(rows[0].transit_id.is_empty());
        assert!(rows[0].solution_id.is_empty());

        let missing_flags = fields("source_id,transit_id,band,time,mag,flux,flux_error,rejected_by_photometry");
        assert!(GaiaSchema::detect(&missing_flags).unwrap().is_none());
    }

    #[test]
    fn test_not_a_header() {
        assert!(GaiaSchema::detect(&fields("a,b,c")).unwrap().is_none());
        assert!(GaiaSchema::detect(&fields("42,17,G,1700.5")).unwrap().is_none());
    }

    #[test]
    fn test_wide_missing_column() {
        let header = fields("source_id,g_transit_time,bp_obs_time,rp_obs_time");
        match GaiaSchema::detect(&header) {
            Err(ObservationReadError::MissingColumn(name)) => assert_eq!(name, "g_transit_mag"),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_wide_row_pivots_into_three_rows() {
        let schema = GaiaSchema::detect(&fields(WIDE_HEADER)).unwrap().unwrap();
        assert!(schema.is_wide());

        let row = fields("42,99,7,1700.1,12.0,1000,5,1700.1,12.5,600,6,1700.1,11.5,1500,7,true,false,,true");
        let rows = schema.rows(&row);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows.iter().map(|r| r.band.as_str()).collect::<Vec<_>>(), vec!["G", "BP", "RP"]);
        assert!(rows.iter().all(|r| r.source_id == "42" && r.solution_id == "99" && r.transit_id == "7"));
        assert!(rows.iter().all(|r| r.rejected_by_photometry == "true"));
        assert_eq!(rows[0].rejected_by_variability, "false");
        assert_eq!(rows[1].rejected_by_variability, "false");
        assert_eq!(rows[2].rejected_by_variability, "true");
        assert_eq!(rows[1].mag, "12.5");
        assert_eq!(rows[2].flux_error, "7");
    }

    #[test]
    fn test_wide_row_with_arrays() {
        let header = fields(
            "source_id,solution_id,transit_id,g_transit_time,g_transit_mag,g_transit_flux,g_transit_flux_error,\
bp_obs_time,bp_mag,bp_flux,bp_flux_error,rp_obs_time,rp_mag,rp_flux,rp_flux_error",
        );
        let schema = GaiaSchema::detect(&header).unwrap().unwrap();
        let line = r#"42,99,"[7, 8]","[1700.1, 1710.2]","[12.0, 12.1]","[1000, 990]","[5, 5]","[1700.1, NaN]","[12.5, NaN]","[600, NaN]","[6, NaN]","[1700.1, 1710.2]","[11.5, 11.6]","[1500, 1490]","[7, 7]""#;
        let rows = schema.rows(&fields(line));
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[3].band, "G");
        assert_eq!(rows[3].transit_id, "8");
        assert_eq!(rows[3].time, "1710.2");
        assert_eq!(rows[4].band, "RP");
        assert!(rows.iter().all(|r| r.rejected_by_photometry == "false"));
    }

    #[test]
    fn test_cell_values() {
        assert_eq!(cell_values("[1, 2 ,3]"), vec!["1", "2", "3"]);
        assert_eq!(cell_values("(1,2)"), vec!["1", "2"]);
        assert!(cell_values("[]").is_empty());
        assert_eq!(cell_values(" 5 "), vec!["5"]);
    }
}
