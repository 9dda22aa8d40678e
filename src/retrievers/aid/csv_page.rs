//! Pages of the AID CSV web service: a CSV table wrapped in XML.
//!
//! ```xml
//! <VSXObservations>
//!   <Count>12345</Count>
//!   <Data><![CDATA[obsID,JD,mag,uncert,band,by,val
//! 1,2450000.5,9.5,0.01,V,ABC,Z
//! ]]></Data>
//! </VSXObservations>
//! ```
use std::io::{BufReader, Read};

use itertools::Itertools;
use quick_xml::events::Event;
use quick_xml::Reader;

use super::filter::ControlByteFilter;
use super::record::{NodeSequence, RawAidRecord};
use super::AidPage;
use crate::varstar_errors::ObservationReadError;

/// Parse one CSV-in-XML page.
///
/// Errors
/// ----------
/// * [`ObservationReadError::UnexpectedDataElements`] unless exactly one `<Data>` element is present.
/// * [`ObservationReadError::MissingAidCsvHeader`] when the CSV payload has no header line.
pub fn parse_csv_page<R: Read>(input: R) -> Result<AidPage, ObservationReadError> {
    let mut reader = Reader::from_reader(BufReader::new(ControlByteFilter::new(input)));

    let mut count: Option<usize> = None;
    let mut data: Vec<String> = Vec::new();
    let mut buf = Vec::new();
    let mut in_count = false;
    let mut in_data = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => match e.local_name().as_ref() {
                b"Count" => in_count = true,
                b"Data" => {
                    in_data = true;
                    data.push(String::new());
                }
                _ => {}
            },
            Event::Empty(e) if e.local_name().as_ref() == b"Data" => data.push(String::new()),
            Event::Text(t) => {
                let text = t.unescape().map_err(quick_xml::Error::from)?;
                if in_count {
                    count = text.trim().parse().ok();
                } else if in_data {
                    if let Some(current) = data.last_mut() {
                        current.push_str(&text);
                    }
                }
            }
            Event::CData(c) => {
                if let (true, Some(current)) = (in_data, data.last_mut()) {
                    current.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Event::End(e) => match e.local_name().as_ref() {
                b"Count" => in_count = false,
                b"Data" => in_data = false,
                _ => {}
            },
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    if data.len() != 1 {
        return Err(ObservationReadError::UnexpectedDataElements);
    }
    let payload = data.remove(0);

    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(payload.as_bytes());

    let headers = csv_reader
        .headers()
        .map_err(|_| ObservationReadError::MissingAidCsvHeader)?
        .clone();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ObservationReadError::MissingAidCsvHeader);
    }

    let mut records = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let mut fields = NodeSequence::new();
        for (header, value) in headers.iter().zip(record.iter()) {
            fields.push(header, value);
        }
        records.push(RawAidRecord {
            raw: record.iter().join(","),
            fields,
        });
    }

    Ok(AidPage { count, records })
}

#[cfg(test)]
mod csv_page_test {
    use super::*;

    #[test]
    fn test_csv_payload() {
        let body = b"<VSXObservations><Count>2</Count><Data><![CDATA[obsID,JD,MAG,uncert\n1,2450000.5,9.5,0.01\n2,2450001.5,<10.0,\n]]></Data></VSXObservations>";
        let page = parse_csv_page(&body[..]).unwrap();
        assert_eq!(page.count, Some(2));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].fields.get("mag"), Some("9.5"));
        assert_eq!(page.records[1].fields.get("Mag"), Some("<10.0"));
        assert_eq!(page.records[1].raw, "2,2450001.5,<10.0,");
    }

    #[test]
    fn test_data_element_count() {
        let none = b"<Root><Count>2</Count></Root>";
        assert!(matches!(
            parse_csv_page(&none[..]),
            Err(ObservationReadError::UnexpectedDataElements)
        ));

        let two = b"<Root><Data>a\n1</Data><Data>a\n2</Data></Root>";
        assert!(matches!(
            parse_csv_page(&two[..]),
            Err(ObservationReadError::UnexpectedDataElements)
        ));
    }

    #[test]
    fn test_missing_header() {
        let empty = b"<Root><Data></Data></Root>";
        assert!(matches!(
            parse_csv_page(&empty[..]),
            Err(ObservationReadError::MissingAidCsvHeader)
        ));
    }
}
