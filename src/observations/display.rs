//! # Tabular display for light-curve observations
//!
//! Renderers to print a slice of [`ValidObservation`]s, or the rejected
//! [`InvalidObservation`]s of a retrieval, as a **table**.
//!
//! ## Overview
//!
//! The main entry point is the display adaptor [`ObservationsDisplay`]. It **borrows**
//! the observations and renders a table when used with `{}`, without cloning them.
//!
//! Two layouts are available:
//!
//! - **Default** (compact, fixed-width):  
//!   `# | JD | Date | Mag ±σ | Band | Obs | Valflag`
//! - **Wide** (diagnostic, uses `comfy-table`):  
//!   adds `Name | Transformed | MType | Comments | Details`
//!
//! Rejected records are printed with [`InvalidObservationsDisplay`], always through
//! `comfy-table` since their input lines are of arbitrary width.
//!
//! ## Precision & Sorting
//!
//! - `with_jd_precision(p)` : fractional digits of the JD column.
//! - `with_mag_precision(p)` : fractional digits of magnitudes and uncertainties.
//! - `sorted()` : rows sorted by JD. The `#` column always shows the **record number**.
//!
//! ## Quick examples
//!
//! ```rust,ignore
//! use varstar::observations::display::ObservationsDisplayExt;
//!
//! println!("{}", result.valid.show().sorted());
//! println!("{}", result.valid.table_wide().with_mag_precision(4));
//! println!("{}", InvalidObservationsDisplay::new(&result.invalid));
//! ```
//!
//! [`comfy-table`]: https://crates.io/crates/comfy-table
use std::fmt;

use comfy_table::{presets::UTF8_FULL, Cell, CellAlignment, ContentArrangement, Row, Table};
use itertools::Itertools;

use crate::observations::{InvalidObservation, ValidObservation};

/// Column layout selector.
enum TableMode {
    Default,
    Wide,
}

/// Display adaptor to render valid observations as a **table**.
///
/// Sorting
/// -----------------
/// * [`Self::sorted`] orders rows by JD ascending, ties broken by original position.
/// * The `#` column prints the record number assigned by the retriever.
///
/// See also
/// ------------
/// * [`ObservationsDisplayExt`] – Builders for each mode.
pub struct ObservationsDisplay<'a> {
    obs: &'a [ValidObservation],
    mode: TableMode,
    jd_prec: usize,
    mag_prec: usize,
    sorted: bool,
}

impl<'a> ObservationsDisplay<'a> {
    pub fn new(obs: &'a [ValidObservation]) -> Self {
        Self {
            obs,
            mode: TableMode::Default,
            jd_prec: 5,
            mag_prec: 3,
            sorted: false,
        }
    }

    /// Switch to **wide** mode (adds name, transform flags, comments and details).
    pub fn wide(mut self, yes: bool) -> Self {
        self.mode = if yes {
            TableMode::Wide
        } else {
            TableMode::Default
        };
        self
    }

    pub fn with_jd_precision(mut self, p: usize) -> Self {
        self.jd_prec = p;
        self
    }

    pub fn with_mag_precision(mut self, p: usize) -> Self {
        self.mag_prec = p;
        self
    }

    /// Display rows sorted by JD.
    pub fn sorted(mut self) -> Self {
        self.sorted = true;
        self
    }

    fn row_iter(&self) -> Box<dyn Iterator<Item = &ValidObservation> + '_> {
        if self.sorted {
            let mut order: Vec<usize> = (0..self.obs.len()).collect();
            order.sort_by(|&a, &b| {
                self.obs[a]
                    .jd()
                    .total_cmp(&self.obs[b].jd())
                    .then_with(|| a.cmp(&b))
            });
            Box::new(order.into_iter().map(|i| &self.obs[i]))
        } else {
            Box::new(self.obs.iter())
        }
    }

    fn mag_str(&self, o: &ValidObservation) -> String {
        let mp = self.mag_prec;
        format!(
            "{}{:.*}{} ± {:.*}",
            o.magnitude.modifier.prefix(),
            mp,
            o.magnitude.value,
            if o.magnitude.is_uncertain { ":" } else { "" },
            mp,
            o.magnitude.uncertainty
        )
    }

    fn render_wide_comfy(&self) -> String {
        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);

        table.set_header(vec![
            Cell::new("#"),
            Cell::new("JD"),
            Cell::new("Date"),
            Cell::new("Mag ±σ"),
            Cell::new("Band"),
            Cell::new("Obs"),
            Cell::new("Valflag"),
            Cell::new("Name"),
            Cell::new("Transformed"),
            Cell::new("MType"),
            Cell::new("Comments"),
            Cell::new("Details"),
        ]);

        for o in self.row_iter() {
            let details = o
                .details
                .iter()
                .map(|(key, d)| format!("{key}={}", d.value))
                .join(", ");
            table.add_row(Row::from(vec![
                Cell::new(o.record_number).set_alignment(CellAlignment::Right),
                Cell::new(format!("{:.*}", self.jd_prec, o.jd())).set_alignment(CellAlignment::Right),
                Cell::new(&o.date_info.calendar_date),
                Cell::new(self.mag_str(o)).set_alignment(CellAlignment::Right),
                Cell::new(&o.band.short_name),
                Cell::new(o.obs_code.as_deref().unwrap_or("")),
                Cell::new(o.validation_type),
                Cell::new(&o.name),
                Cell::new(if o.transformed { "yes" } else { "no" }),
                Cell::new(o.mtype),
                Cell::new(o.comments.as_deref().unwrap_or("")),
                Cell::new(details),
            ]));
        }

        table.to_string()
    }
}

/// Builders for [`ObservationsDisplay`].
pub trait ObservationsDisplayExt {
    /// Compact fixed-width table.
    fn show(&self) -> ObservationsDisplay<'_>;

    /// Wide `comfy-table` rendering.
    fn table_wide(&self) -> ObservationsDisplay<'_>;

    /// Convenience: compact table as an owned `String`.
    fn show_string(&self) -> String {
        format!("{}", self.show())
    }
}

impl ObservationsDisplayExt for [ValidObservation] {
    fn show(&self) -> ObservationsDisplay<'_> {
        ObservationsDisplay::new(self)
    }

    fn table_wide(&self) -> ObservationsDisplay<'_> {
        ObservationsDisplay::new(self).wide(true)
    }
}

impl fmt::Display for ObservationsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Observations (n={})", self.obs.len())?;
        writeln!(f, "-------------------")?;

        match self.mode {
            TableMode::Wide => f.write_str(&self.render_wide_comfy()),
            TableMode::Default => {
                writeln!(
                    f,
                    "{:>6}  {:>16}  {:>16}  {:>18}  {:>12}  {:>8}  {:>12}",
                    "#", "JD", "Date", "Mag ±σ", "Band", "Obs", "Valflag"
                )?;
                for o in self.row_iter() {
                    writeln!(
                        f,
                        "{rec:>6}  {jd:>16.jp$}  {date:>16}  {mag:>18}  {band:>12}  {obs:>8}  {val:>12}",
                        rec = o.record_number,
                        jd = o.jd(),
                        jp = self.jd_prec,
                        date = o.date_info.calendar_date,
                        mag = self.mag_str(o),
                        band = o.band.short_name,
                        obs = o.obs_code.as_deref().unwrap_or(""),
                        val = o.validation_type.to_string(),
                    )?;
                }
                Ok(())
            }
        }
    }
}

/// Table of rejected records: record number, error and the raw input.
pub struct InvalidObservationsDisplay<'a> {
    obs: &'a [InvalidObservation],
}

impl<'a> InvalidObservationsDisplay<'a> {
    pub fn new(obs: &'a [InvalidObservation]) -> Self {
        Self { obs }
    }
}

impl fmt::Display for InvalidObservationsDisplay<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Invalid observations (n={})", self.obs.len())?;
        writeln!(f, "---------------------------")?;

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("#"),
            Cell::new("Source"),
            Cell::new("Error"),
            Cell::new("Input"),
        ]);
        for o in self.obs {
            table.add_row(Row::from(vec![
                Cell::new(o.record_number).set_alignment(CellAlignment::Right),
                Cell::new(o.source.as_deref().unwrap_or("")),
                Cell::new(&o.error),
                Cell::new(&o.input),
            ]));
        }
        f.write_str(&table.to_string())
    }
}

#[cfg(test)]
mod display_test {
    use super::*;
    use crate::observations::{Magnitude, SeriesType};

    fn sample() -> Vec<ValidObservation> {
        let mut late = ValidObservation::new(1, 2_459_000.75, Magnitude::new(11.25, 0.02), SeriesType::JOHNSON_V);
        late.obs_code = Some("ABC".into());
        let mut early = ValidObservation::new(2, 2_459_000.25, Magnitude::new(11.5, 0.03), SeriesType::COUSINS_R);
        early.set_discrepant(true);
        vec![late, early]
    }

    #[test]
    fn test_default_layout() {
        let obs = sample();
        let s = obs.show_string();
        assert!(s.starts_with("Observations (n=2)"));
        assert!(s.contains("11.250 ± 0.020"));
        assert!(s.contains("ABC"));
        assert!(s.contains("Discrepant"));
    }

    #[test]
    fn test_sorted_by_jd() {
        let obs = sample();
        let s = format!("{}", obs.show().sorted());
        let first_r = s.find("11.500").unwrap();
        let first_v = s.find("11.250").unwrap();
        assert!(first_r < first_v);
    }

    #[test]
    fn test_wide_and_invalid_tables() {
        let mut obs = sample();
        obs[0].add_detail("FLUX", "Flux", crate::observations::DetailValue::Real(42.0));
        let s = format!("{}", obs.table_wide().with_mag_precision(2));
        assert!(s.contains("FLUX=42"));
        assert!(s.contains("11.25 ± 0.02"));

        let invalid = vec![InvalidObservation::new(3, "abc,def", "Invalid Julian Day: 'abc'").with_source("ZTF")];
        let s = format!("{}", InvalidObservationsDisplay::new(&invalid));
        assert!(s.contains("Invalid observations (n=1)"));
        assert!(s.contains("abc,def"));
    }
}
