//! # FITS container reader
//!
//! A minimal reader for the FITS files distributed by the TESS and Kepler missions (and
//! by tools such as Lightkurve): a primary header unit followed by extensions, the
//! light curve itself being a binary table (`XTENSION = 'BINTABLE'`).
//!
//! ## Layout
//! -----------------
//! * The file is a sequence of 2880 byte blocks ([`BLOCK_SIZE`]).
//! * Each header data unit starts with a [`Header`] of 80 byte cards ([`CARD_SIZE`])
//!   closed by `END`, padded to a block boundary, followed by a data unit also padded
//!   to a block boundary.
//! * Binary table columns are described by `TTYPEn`/`TFORMn` (plus optional
//!   `TSCALn`/`TZEROn`/`TNULLn`) and stored big-endian, see [`bintable`].
//!
//! ## Scope
//! -----------------
//! Images, ASCII tables, random groups and variable length arrays are not decoded; their
//! data units are skipped.
pub mod bintable;
pub mod header;

use std::io::Read;

use camino::Utf8Path;

use crate::varstar_errors::FitsError;

pub use bintable::{BinTable, Column, Tform, TformKind};
pub use header::{Header, HeaderValue};

/// FITS logical record size.
pub const BLOCK_SIZE: usize = 2880;

/// Header card size.
pub const CARD_SIZE: usize = 80;

/// `len` rounded up to a whole number of blocks.
pub fn padded_len(len: usize) -> usize {
    len.div_ceil(BLOCK_SIZE) * BLOCK_SIZE
}

/// One header data unit.
#[derive(Debug, Clone, PartialEq)]
pub struct Hdu {
    pub header: Header,
    pub data: Vec<u8>,
}

impl Hdu {
    /// Extension type (`BINTABLE`, `IMAGE`, …), `None` for the primary unit.
    pub fn extension(&self) -> Option<&str> {
        self.header.get_str("XTENSION").map(str::trim)
    }

    pub fn is_binary_table(&self) -> bool {
        self.extension() == Some("BINTABLE")
    }
}

/// All header data units of a FITS file.
#[derive(Debug, Clone, PartialEq)]
pub struct FitsFile {
    hdus: Vec<Hdu>,
}

impl FitsFile {
    /// Split a complete FITS byte stream into its header data units.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, FitsError> {
        let mut hdus = Vec::new();
        let mut rest = bytes;
        while !rest.is_empty() && !rest.iter().all(|b| *b == 0 || *b == b' ') {
            let (after_header, header) = header::Header::parse(rest)?;
            let data_len = header.data_len()?;
            let data = after_header
                .get(..data_len)
                .ok_or_else(|| {
                    FitsError::Truncated(format!(
                        "HDU {} declares {data_len} data bytes, {} available",
                        hdus.len(),
                        after_header.len()
                    ))
                })?
                .to_vec();
            rest = after_header.get(padded_len(data_len)..).unwrap_or(&[]);
            log::debug!(
                "FITS HDU {}: {} ({data_len} data bytes)",
                hdus.len(),
                header.get_str("XTENSION").unwrap_or("PRIMARY")
            );
            hdus.push(Hdu { header, data });
        }
        if hdus.is_empty() {
            return Err(FitsError::Truncated("empty FITS stream".to_string()));
        }
        Ok(FitsFile { hdus })
    }

    pub fn read<R: Read>(mut reader: R) -> Result<Self, FitsError> {
        let mut bytes = Vec::new();
        reader
            .read_to_end(&mut bytes)
            .map_err(|e| FitsError::Truncated(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    pub fn from_path(path: &Utf8Path) -> Result<Self, FitsError> {
        let bytes = std::fs::read(path).map_err(|e| FitsError::Truncated(format!("{path}: {e}")))?;
        Self::from_bytes(&bytes)
    }

    pub fn primary_header(&self) -> &Header {
        &self.hdus[0].header
    }

    pub fn hdus(&self) -> &[Hdu] {
        &self.hdus
    }

    /// First binary table extension unit.
    pub fn binary_table_hdu(&self) -> Result<&Hdu, FitsError> {
        self.hdus
            .iter()
            .skip(1)
            .find(|h| h.is_binary_table())
            .ok_or(FitsError::NoBinaryTable)
    }

    /// First binary table extension, decoded.
    pub fn binary_table(&self) -> Result<BinTable, FitsError> {
        let hdu = self.binary_table_hdu()?;
        BinTable::new(&hdu.header, hdu.data.clone())
    }

    /// Header keyword looked up in the primary header, then in the extensions in order.
    pub fn keyword(&self, keyword: &str) -> Option<&HeaderValue> {
        self.hdus.iter().find_map(|h| h.header.get(keyword))
    }
}
