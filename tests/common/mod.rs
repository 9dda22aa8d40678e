#![allow(dead_code)]

use varstar::observations::{Magnitude, SeriesType, ValidObservation};

const BLOCK_SIZE: usize = 2880;

fn padded(mut bytes: Vec<u8>, fill: u8) -> Vec<u8> {
    let len = bytes.len().div_ceil(BLOCK_SIZE).max(1) * BLOCK_SIZE;
    bytes.resize(len, fill);
    bytes
}

fn header_unit(cards: &[String]) -> Vec<u8> {
    let mut bytes: Vec<u8> = cards.iter().flat_map(|c| format!("{c:<80}").into_bytes()).collect();
    bytes.extend_from_slice(format!("{:<80}", "END").as_bytes());
    padded(bytes, b' ')
}

pub fn int_card(key: &str, value: i64) -> String {
    format!("{key:<8}= {value:>20}")
}

pub fn real_card(key: &str, value: f64) -> String {
    format!("{key:<8}= {value:>20?}")
}

pub fn text_card(key: &str, value: &str) -> String {
    format!("{key:<8}= '{value}'")
}

/// FITS file made of a primary unit and one binary table of `D`, `E` or `J` columns.
pub fn fits_light_curve(
    primary: &[String],
    table: &[String],
    columns: &[(&str, char)],
    rows: &[Vec<f64>],
) -> Vec<u8> {
    let width = |code: char| if code == 'D' { 8 } else { 4 };
    let row_width: usize = columns.iter().map(|(_, c)| width(*c)).sum();

    let mut primary_cards = vec![
        format!("{:<8}= {:>20}", "SIMPLE", "T"),
        int_card("BITPIX", 8),
        int_card("NAXIS", 0),
    ];
    primary_cards.extend_from_slice(primary);

    let mut table_cards = vec![
        text_card("XTENSION", "BINTABLE"),
        int_card("BITPIX", 8),
        int_card("NAXIS", 2),
        int_card("NAXIS1", row_width as i64),
        int_card("NAXIS2", rows.len() as i64),
        int_card("PCOUNT", 0),
        int_card("GCOUNT", 1),
        int_card("TFIELDS", columns.len() as i64),
    ];
    for (n, (name, code)) in columns.iter().enumerate() {
        table_cards.push(text_card(&format!("TTYPE{}", n + 1), name));
        table_cards.push(text_card(&format!("TFORM{}", n + 1), &code.to_string()));
    }
    table_cards.extend_from_slice(table);

    let mut data = Vec::with_capacity(row_width * rows.len());
    for row in rows {
        for ((_, code), value) in columns.iter().zip(row) {
            match code {
                'D' => data.extend_from_slice(&value.to_be_bytes()),
                'E' => data.extend_from_slice(&(*value as f32).to_be_bytes()),
                _ => data.extend_from_slice(&(*value as i32).to_be_bytes()),
            }
        }
    }

    let mut bytes = header_unit(&primary_cards);
    bytes.extend(header_unit(&table_cards));
    bytes.extend(padded(data, 0));
    bytes
}

/// One CSV-in-XML AID page.
pub fn aid_csv_page(count: Option<usize>, rows: &[String]) -> Vec<u8> {
    let count = count.map(|c| format!("<Count>{c}</Count>")).unwrap_or_default();
    format!(
        "<VSXObservations>{count}<Data><![CDATA[obsID,JD,mag,uncert,band,by,val\n{}\n]]></Data></VSXObservations>",
        rows.join("\n")
    )
    .into_bytes()
}

/// AID CSV rows `first..first + n`, one day apart, all good V estimates.
pub fn aid_rows(first: usize, n: usize) -> Vec<String> {
    (first..first + n)
        .map(|id| format!("{id},{},{:.2},0.01,V,ABC,Z", 2_450_000.5 + id as f64, 9.0 + id as f64 / 100.0))
        .collect()
}

pub fn observations(points: &[(f64, f64)], band: SeriesType) -> Vec<ValidObservation> {
    points
        .iter()
        .enumerate()
        .map(|(i, (jd, mag))| ValidObservation::new(i + 1, *jd, Magnitude::new(*mag, 0.0), band.clone()))
        .collect()
}
