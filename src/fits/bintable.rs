//! Binary table extensions.
//!
//! Each row is `NAXIS1` bytes long and there are `NAXIS2` rows. Column `n` is described by
//! `TTYPEn` (name) and `TFORMn` (`rT`: repeat count `r`, default 1, and type code `T`):
//!
//! | code | type             | bytes |
//! |------|------------------|-------|
//! | `L`  | logical          | 1     |
//! | `B`  | unsigned byte    | 1     |
//! | `I`  | 16-bit integer   | 2     |
//! | `J`  | 32-bit integer   | 4     |
//! | `K`  | 64-bit integer   | 8     |
//! | `E`  | 32-bit float     | 4     |
//! | `D`  | 64-bit float     | 8     |
//! | `A`  | character        | 1     |
//!
//! Numeric values are big-endian; the physical value is `TZEROn + TSCALn * raw`. An
//! integer equal to `TNULLn` is read as NaN.
use nom::{
    character::complete::{digit0, one_of},
    number::complete::{be_f32, be_f64, be_i16, be_i32, be_i64, be_u8},
    IResult,
};

use crate::varstar_errors::FitsError;

use super::Header;

/// Type code of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TformKind {
    Logical,
    Byte,
    Short,
    Int,
    Long,
    Float,
    Double,
    Char,
}

impl TformKind {
    fn from_code(code: char) -> Option<Self> {
        Some(match code {
            'L' => TformKind::Logical,
            'B' => TformKind::Byte,
            'I' => TformKind::Short,
            'J' => TformKind::Int,
            'K' => TformKind::Long,
            'E' => TformKind::Float,
            'D' => TformKind::Double,
            'A' => TformKind::Char,
            _ => return None,
        })
    }

    /// Size in bytes of one element.
    pub fn width(&self) -> usize {
        match self {
            TformKind::Logical | TformKind::Byte | TformKind::Char => 1,
            TformKind::Short => 2,
            TformKind::Int | TformKind::Float => 4,
            TformKind::Long | TformKind::Double => 8,
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, TformKind::Byte | TformKind::Short | TformKind::Int | TformKind::Long)
    }
}

/// Parsed `TFORMn` value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tform {
    pub repeat: usize,
    pub kind: TformKind,
}

fn tform_parts(input: &str) -> IResult<&str, (&str, char)> {
    let (input, repeat) = digit0(input)?;
    let (input, code) = one_of("LBIJKEDA")(input)?;
    Ok((input, (repeat, code)))
}

impl Tform {
    /// Parse a `TFORMn` value such as `D`, `1E` or `20A`.
    ///
    /// Trailing characters after the type code (array descriptors of some writers) are
    /// ignored; variable length (`P`/`Q`) and bit (`X`) columns are rejected.
    pub fn parse(text: &str) -> Result<Self, FitsError> {
        let trimmed = text.trim();
        let unsupported = || FitsError::UnsupportedTform(trimmed.to_string());
        let (_, (repeat, code)) = tform_parts(trimmed).map_err(|_| unsupported())?;
        let repeat = if repeat.is_empty() {
            1
        } else {
            repeat.parse::<usize>().map_err(|_| unsupported())?
        };
        let kind = TformKind::from_code(code).ok_or_else(unsupported)?;
        repeat.checked_mul(kind.width()).ok_or_else(unsupported)?;
        Ok(Tform { repeat, kind })
    }

    /// Size in bytes of the column in a row.
    pub fn width(&self) -> usize {
        self.repeat * self.kind.width()
    }
}

/// Descriptor of one table column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub tform: Tform,
    /// Byte offset of the column inside a row.
    pub offset: usize,
    pub scale: f64,
    pub zero: f64,
    pub null: Option<i64>,
    pub unit: Option<String>,
}

impl Column {
    /// Physical value of the first element at the start of `bytes`.
    fn decode<'b>(&self, bytes: &'b [u8]) -> IResult<&'b [u8], f64> {
        let (rest, raw) = match self.tform.kind {
            TformKind::Logical => {
                let (rest, b) = be_u8(bytes)?;
                return Ok((rest, if b == b'T' { 1.0 } else { 0.0 }));
            }
            TformKind::Byte => be_u8(bytes).map(|(r, v)| (r, RawValue::Int(v as i64)))?,
            TformKind::Short => be_i16(bytes).map(|(r, v)| (r, RawValue::Int(v as i64)))?,
            TformKind::Int => be_i32(bytes).map(|(r, v)| (r, RawValue::Int(v as i64)))?,
            TformKind::Long => be_i64(bytes).map(|(r, v)| (r, RawValue::Int(v)))?,
            TformKind::Float => be_f32(bytes).map(|(r, v)| (r, RawValue::Real(v as f64)))?,
            TformKind::Double => be_f64(bytes).map(|(r, v)| (r, RawValue::Real(v)))?,
            TformKind::Char => return Ok((bytes, f64::NAN)),
        };
        let value = match raw {
            RawValue::Int(i) if self.null == Some(i) => f64::NAN,
            RawValue::Int(i) => self.zero + self.scale * i as f64,
            RawValue::Real(f) => self.zero + self.scale * f,
        };
        Ok((rest, value))
    }
}

enum RawValue {
    Int(i64),
    Real(f64),
}

/// A binary table with its rows.
#[derive(Debug, Clone, PartialEq)]
pub struct BinTable {
    columns: Vec<Column>,
    row_width: usize,
    n_rows: usize,
    data: Vec<u8>,
}

impl BinTable {
    /// Build a table from its extension header and data unit.
    pub fn new(header: &Header, data: Vec<u8>) -> Result<Self, FitsError> {
        let row_width = header.require_usize("NAXIS1")?;
        let n_rows = header.require_usize("NAXIS2")?;
        let n_columns = header.require_usize("TFIELDS")?;

        let mut columns = Vec::with_capacity(n_columns);
        let mut offset = 0;
        for n in 1..=n_columns {
            let tform_key = format!("TFORM{n}");
            let tform = Tform::parse(
                header
                    .get_str(&tform_key)
                    .ok_or(FitsError::MissingKeyword(tform_key))?,
            )?;
            let name = header
                .get_str(&format!("TTYPE{n}"))
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| format!("COL{n}"));
            columns.push(Column {
                name,
                tform,
                offset,
                scale: header.get_f64(&format!("TSCAL{n}")).unwrap_or(1.0),
                zero: header.get_f64(&format!("TZERO{n}")).unwrap_or(0.0),
                null: header.get_i64(&format!("TNULL{n}")),
                unit: header.get_str(&format!("TUNIT{n}")).map(|s| s.trim().to_string()),
            });
            offset = offset
                .checked_add(tform.width())
                .ok_or_else(|| FitsError::InvalidKeyword {
                    keyword: format!("TFORM{n}"),
                    value: "row width overflows".to_string(),
                })?;
        }

        if offset > row_width {
            return Err(FitsError::InvalidKeyword {
                keyword: "NAXIS1".to_string(),
                value: format!("{row_width} (columns need {offset} bytes)"),
            });
        }
        let needed = row_width
            .checked_mul(n_rows)
            .ok_or_else(|| FitsError::InvalidKeyword {
                keyword: "NAXIS2".to_string(),
                value: format!("{n_rows} rows of {row_width} bytes overflow"),
            })?;
        if data.len() < needed {
            return Err(FitsError::Truncated(format!(
                "binary table needs {needed} bytes, {} available",
                data.len()
            )));
        }
        Ok(BinTable {
            columns,
            row_width,
            n_rows,
            data,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    /// Column by name, case-insensitive.
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column(name).is_some()
    }

    fn require(&self, name: &str) -> Result<&Column, FitsError> {
        self.column(name).ok_or_else(|| FitsError::ColumnNotFound(name.to_string()))
    }

    fn cell(&self, column: &Column, row: usize) -> &[u8] {
        let start = row * self.row_width + column.offset;
        &self.data[start..start + column.tform.width()]
    }

    /// Physical values of a numeric column (first element of each cell).
    ///
    /// Return
    /// ----------
    /// * One value per row; NaN for null integers, 1/0 for logicals.
    pub fn read_f64(&self, name: &str) -> Result<Vec<f64>, FitsError> {
        let column = self.require(name)?;
        if column.tform.kind == TformKind::Char {
            return Err(FitsError::NonNumericColumn {
                column: column.name.clone(),
                tform: format!("{}A", column.tform.repeat),
            });
        }
        (0..self.n_rows)
            .map(|row| {
                column
                    .decode(self.cell(column, row))
                    .map(|(_, v)| v)
                    .map_err(|e| FitsError::NomParsingError(format!("{} row {row}: {e}", column.name)))
            })
            .collect()
    }

    /// Integer values of a column; NaN and non integral values read as `None`.
    pub fn read_i64(&self, name: &str) -> Result<Vec<Option<i64>>, FitsError> {
        Ok(self
            .read_f64(name)?
            .into_iter()
            .map(|v| (v.is_finite() && v.fract() == 0.0).then_some(v as i64))
            .collect())
    }

    /// Text values of a character column, trailing spaces and NULs removed.
    pub fn read_strings(&self, name: &str) -> Result<Vec<String>, FitsError> {
        let column = self.require(name)?;
        if column.tform.kind != TformKind::Char {
            return Err(FitsError::ColumnNotFound(format!("{name} (not a character column)")));
        }
        Ok((0..self.n_rows)
            .map(|row| {
                String::from_utf8_lossy(self.cell(column, row))
                    .trim_end_matches(['\0', ' '])
                    .to_string()
            })
            .collect())
    }
}
