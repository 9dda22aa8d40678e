//! FITS header units.
//!
//! A header is a sequence of 80 byte ASCII cards, terminated by an `END` card and padded
//! to a multiple of 2880 bytes. Value cards have the keyword in columns 1-8 and `= ` in
//! columns 9-10; the value may be followed by a `/` comment.
//!
//! Only fixed-format values are interpreted: quoted strings (with `''` escapes),
//! logicals `T`/`F`, integers and reals (`E` or `D` exponent). Commentary cards
//! (`COMMENT`, `HISTORY`, blank keyword) are skipped.
use nom::{bytes::complete::take, IResult};

use crate::varstar_errors::FitsError;

use super::{padded_len, CARD_SIZE};

/// Typed value of a header card.
#[derive(Debug, Clone, PartialEq)]
pub enum HeaderValue {
    Text(String),
    Int(i64),
    Real(f64),
    Logical(bool),
    /// A keyword with an empty value field.
    Undefined,
}

impl HeaderValue {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HeaderValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            HeaderValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers are widened to reals.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            HeaderValue::Real(f) => Some(*f),
            HeaderValue::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HeaderValue::Logical(b) => Some(*b),
            _ => None,
        }
    }

    /// Interpret a value field (columns 11-80 of a card).
    pub fn parse(field: &str) -> Self {
        let field = field.trim_start();
        if let Some(quoted) = field.strip_prefix('\'') {
            return HeaderValue::Text(parse_quoted(quoted));
        }

        let value = field.split('/').next().unwrap_or("").trim();
        match value {
            "" => HeaderValue::Undefined,
            "T" => HeaderValue::Logical(true),
            "F" => HeaderValue::Logical(false),
            _ => {
                if let Ok(i) = value.parse::<i64>() {
                    HeaderValue::Int(i)
                } else if let Ok(f) = value.replace(['D', 'd'], "E").parse::<f64>() {
                    HeaderValue::Real(f)
                } else {
                    HeaderValue::Text(value.to_string())
                }
            }
        }
    }
}

/// Body of a quoted string after the opening quote; `''` is an escaped quote and
/// trailing spaces are not significant.
fn parse_quoted(body: &str) -> String {
    let mut out = String::new();
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\'' {
            if chars.peek() == Some(&'\'') {
                out.push('\'');
                chars.next();
            } else {
                break;
            }
        } else {
            out.push(c);
        }
    }
    out.trim_end().to_string()
}

/// Ordered keyword/value cards of one header unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Header {
    cards: Vec<(String, HeaderValue)>,
}

impl Header {
    /// Parse a header unit at the start of `input`.
    ///
    /// Arguments
    /// -----------------
    /// * `input`: bytes starting at the first card of the header.
    ///
    /// Return
    /// ----------
    /// * The remaining input after the padded header, and the header.
    pub fn parse(input: &[u8]) -> Result<(&[u8], Header), FitsError> {
        let mut header = Header::default();
        let mut rest = input;
        let mut n_cards = 0usize;
        loop {
            if rest.is_empty() {
                return Err(FitsError::MissingEnd);
            }
            let (next, card) = take_card(rest)
                .map_err(|_| FitsError::Truncated(format!("partial card after {n_cards} cards")))?;
            rest = next;
            n_cards += 1;

            let keyword = String::from_utf8_lossy(&card[..8]).trim().to_string();
            if keyword == "END" {
                break;
            }
            if keyword.is_empty() || keyword == "COMMENT" || keyword == "HISTORY" || &card[8..10] != b"= " {
                continue;
            }
            let value = HeaderValue::parse(&String::from_utf8_lossy(&card[10..]));
            header.cards.push((keyword, value));
        }

        let padding = padded_len(n_cards * CARD_SIZE) - n_cards * CARD_SIZE;
        let rest = rest.get(padding..).unwrap_or(&[]);
        Ok((rest, header))
    }

    pub fn get(&self, keyword: &str) -> Option<&HeaderValue> {
        self.cards
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(keyword))
            .map(|(_, v)| v)
    }

    pub fn get_str(&self, keyword: &str) -> Option<&str> {
        self.get(keyword).and_then(HeaderValue::as_str)
    }

    pub fn get_i64(&self, keyword: &str) -> Option<i64> {
        self.get(keyword).and_then(HeaderValue::as_i64)
    }

    pub fn get_f64(&self, keyword: &str) -> Option<f64> {
        self.get(keyword).and_then(HeaderValue::as_f64)
    }

    pub fn get_bool(&self, keyword: &str) -> Option<bool> {
        self.get(keyword).and_then(HeaderValue::as_bool)
    }

    /// Mandatory non-negative integer keyword.
    pub fn require_usize(&self, keyword: &str) -> Result<usize, FitsError> {
        match self.get(keyword) {
            None => Err(FitsError::MissingKeyword(keyword.to_string())),
            Some(value) => value
                .as_i64()
                .and_then(|i| usize::try_from(i).ok())
                .ok_or_else(|| FitsError::InvalidKeyword {
                    keyword: keyword.to_string(),
                    value: format!("{value:?}"),
                }),
        }
    }

    pub fn len(&self) -> usize {
        self.cards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &HeaderValue)> {
        self.cards.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Size in bytes of the data unit following this header, padding excluded.
    pub fn data_len(&self) -> Result<usize, FitsError> {
        let naxis = self.require_usize("NAXIS")?;
        if naxis == 0 {
            return Ok(0);
        }
        let bitpix = self
            .get_i64("BITPIX")
            .ok_or_else(|| FitsError::MissingKeyword("BITPIX".to_string()))?;
        let overflow = |keyword: String| FitsError::InvalidKeyword {
            keyword,
            value: "data size overflows".to_string(),
        };
        let mut elements = 1usize;
        for axis in 1..=naxis {
            let keyword = format!("NAXIS{axis}");
            elements = elements
                .checked_mul(self.require_usize(&keyword)?)
                .ok_or_else(|| overflow(keyword))?;
        }
        let pcount = self.get_i64("PCOUNT").unwrap_or(0).max(0) as usize;
        let gcount = self.get_i64("GCOUNT").unwrap_or(1).max(1) as usize;
        (bitpix.unsigned_abs() as usize / 8)
            .checked_mul(gcount)
            .zip(pcount.checked_add(elements))
            .and_then(|(bytes, count)| bytes.checked_mul(count))
            .ok_or_else(|| overflow("PCOUNT".to_string()))
    }
}

fn take_card(input: &[u8]) -> IResult<&[u8], &[u8]> {
    take(CARD_SIZE)(input)
}

#[cfg(test)]
mod header_test {
    use super::*;

    fn card(text: &str) -> String {
        format!("{text:<80}")
    }

    #[test]
    fn test_value_parsing() {
        assert_eq!(HeaderValue::parse(" 'TIC 12345 '        / object"), HeaderValue::Text("TIC 12345".into()));
        assert_eq!(HeaderValue::parse("'O''Hara'"), HeaderValue::Text("O'Hara".into()));
        assert_eq!(HeaderValue::parse("                   T"), HeaderValue::Logical(true));
        assert_eq!(HeaderValue::parse("  2457000 / BJD ref"), HeaderValue::Int(2_457_000));
        assert_eq!(HeaderValue::parse(" 0.5D0"), HeaderValue::Real(0.5));
        assert_eq!(HeaderValue::parse("  1.25E1 "), HeaderValue::Real(12.5));
        assert_eq!(HeaderValue::parse("   / nothing"), HeaderValue::Undefined);
    }

    #[test]
    fn test_header_unit() {
        let mut text = String::new();
        for c in ["SIMPLE  =                    T", "NAXIS   =                    0", "COMMENT hello", "OBJECT  = 'R Car'", "END"] {
            text.push_str(&card(c));
        }
        let mut bytes = text.into_bytes();
        bytes.resize(2880, b' ');
        bytes.extend_from_slice(b"next");

        let (rest, header) = Header::parse(&bytes).unwrap();
        assert_eq!(rest, b"next");
        assert_eq!(header.len(), 3);
        assert_eq!(header.get_bool("SIMPLE"), Some(true));
        assert_eq!(header.get_str("object"), Some("R Car"));
        assert_eq!(header.data_len().unwrap(), 0);
    }

    #[test]
    fn test_missing_end() {
        let text = card("SIMPLE  =                    T");
        assert_eq!(Header::parse(text.as_bytes()), Err(FitsError::MissingEnd));
        assert!(matches!(Header::parse(&text.as_bytes()[..50]), Err(FitsError::Truncated(_))));
    }

    #[test]
    fn test_data_size_overflow() {
        let mut text = String::new();
        for c in [
            "SIMPLE  =                    T",
            "BITPIX  =                    8",
            "NAXIS   =                    2",
            "NAXIS1  =        1099511627776",
            "NAXIS2  =        1099511627776",
            "END",
        ] {
            text.push_str(&card(c));
        }
        let (_, header) = Header::parse(text.as_bytes()).unwrap();
        assert_eq!(
            header.data_len(),
            Err(FitsError::InvalidKeyword {
                keyword: "NAXIS2".to_string(),
                value: "data size overflows".to_string()
            })
        );

        let mut bytes = text.into_bytes();
        bytes.resize(2880, b' ');
        assert!(matches!(
            crate::fits::FitsFile::from_bytes(&bytes),
            Err(FitsError::InvalidKeyword { .. })
        ));
    }

    #[test]
    fn test_invalid_mandatory_keyword() {
        let mut text = card("NAXIS   =                 -1");
        text.push_str(&card("END"));
        let (_, header) = Header::parse(text.as_bytes()).unwrap();
        assert!(matches!(header.data_len(), Err(FitsError::InvalidKeyword { .. })));
    }
}
