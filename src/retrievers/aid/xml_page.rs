//! Pages of the AID XML web service.
//!
//! Two encodings of an observation are accepted and may even be mixed:
//!
//! ```xml
//! <VSXObservations>
//!   <Data Count="2">
//!     <Observation obsID="1" JD="2450000.5" mag="9.5" uncert="0.01" band="V"/>
//!     <Observation><obsID>2</obsID><JD>2450001.5</JD><mag>9.6</mag></Observation>
//!   </Data>
//! </VSXObservations>
//! ```
//!
//! The count may also come as a `<Count>` element.
use std::io::{BufReader, Read};

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;

use super::filter::ControlByteFilter;
use super::record::{NodeSequence, RawAidRecord};
use super::AidPage;
use crate::varstar_errors::ObservationReadError;

fn element_name(e: &BytesStart<'_>) -> String {
    String::from_utf8_lossy(e.local_name().as_ref()).into_owned()
}

fn attributes(e: &BytesStart<'_>) -> Result<NodeSequence, ObservationReadError> {
    let mut seq = NodeSequence::new();
    for attr in e.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = String::from_utf8_lossy(attr.key.local_name().as_ref()).into_owned();
        let value = attr.unescape_value().map_err(quick_xml::Error::from)?.into_owned();
        seq.push(key, value);
    }
    Ok(seq)
}

fn parse_count(text: &str) -> Option<usize> {
    let count = text.trim().parse::<usize>().ok();
    if count.is_none() {
        log::warn!("ignoring unreadable observation count '{}'", text.trim());
    }
    count
}

/// Parse one XML page. Control bytes are filtered out of `input` first.
pub fn parse_xml_page<R: Read>(input: R) -> Result<AidPage, ObservationReadError> {
    let mut reader = Reader::from_reader(BufReader::new(ControlByteFilter::new(input)));
    reader.config_mut().trim_text(true);

    let mut page = AidPage::default();
    let mut buf = Vec::new();
    let mut current: Option<NodeSequence> = None;
    let mut field: Option<String> = None;
    let mut in_count = false;

    loop {
        match reader.read_event_into(&mut buf)? {
            Event::Start(e) => {
                let name = element_name(&e);
                if name.eq_ignore_ascii_case("Observation") {
                    current = Some(attributes(&e)?);
                } else if current.is_some() {
                    field = Some(name);
                } else if name.eq_ignore_ascii_case("Count") {
                    in_count = true;
                } else if let Some(count) = attributes(&e)?.get("Count") {
                    page.count = parse_count(count);
                }
            }
            Event::Empty(e) => {
                let name = element_name(&e);
                if name.eq_ignore_ascii_case("Observation") {
                    let fields = attributes(&e)?;
                    page.records.push(RawAidRecord {
                        raw: fields.to_string(),
                        fields,
                    });
                } else if let Some(seq) = current.as_mut() {
                    seq.push(name, "");
                } else if let Some(count) = attributes(&e)?.get("Count") {
                    page.count = parse_count(count);
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(quick_xml::Error::from)?.into_owned();
                if in_count {
                    page.count = parse_count(&text);
                } else if let (Some(seq), Some(name)) = (current.as_mut(), field.as_ref()) {
                    seq.push(name.clone(), text);
                }
            }
            Event::CData(c) => {
                if let (Some(seq), Some(name)) = (current.as_mut(), field.as_ref()) {
                    seq.push(name.clone(), String::from_utf8_lossy(&c.into_inner()).into_owned());
                }
            }
            Event::End(e) => {
                let name = String::from_utf8_lossy(e.local_name().as_ref()).into_owned();
                if name.eq_ignore_ascii_case("Observation") {
                    if let Some(fields) = current.take() {
                        page.records.push(RawAidRecord {
                            raw: fields.to_string(),
                            fields,
                        });
                    }
                    field = None;
                } else if name.eq_ignore_ascii_case("Count") && current.is_none() {
                    in_count = false;
                } else if field.as_deref() == Some(name.as_str()) {
                    field = None;
                }
            }
            Event::Eof => break,
            _ => {}
        }
        buf.clear();
    }

    Ok(page)
}

#[cfg(test)]
mod xml_page_test {
    use super::*;

    #[test]
    fn test_attribute_and_child_encodings() {
        let xml = br#"<?xml version="1.0"?>
<VSXObservations>
  <Data Count="3">
    <Observation obsID="1" JD="2450000.5" mag="9.5" uncert="0.01" band="V"/>
    <Observation><obsID>2</obsID><JD>2450001.5</JD><mag>9.6</mag><comment>a &amp; b</comment></Observation>
  </Data>
</VSXObservations>"#;
        let page = parse_xml_page(&xml[..]).unwrap();
        assert_eq!(page.count, Some(3));
        assert_eq!(page.records.len(), 2);
        assert_eq!(page.records[0].fields.get("band"), Some("V"));
        assert_eq!(page.records[1].fields.get("obsid"), Some("2"));
        assert_eq!(page.records[1].fields.get("comment"), Some("a & b"));
    }

    #[test]
    fn test_count_element_and_control_bytes() {
        let xml = b"<Root><Count>10</Count><Observation obsID=\"1\" comment=\"bad\x02byte\"/></Root>";
        let page = parse_xml_page(&xml[..]).unwrap();
        assert_eq!(page.count, Some(10));
        assert_eq!(page.records[0].fields.get("comment"), Some("bad byte"));
    }

    #[test]
    fn test_no_count() {
        let page = parse_xml_page(&b"<Root><Observation obsID=\"1\"/></Root>"[..]).unwrap();
        assert_eq!(page.count, None);
        assert_eq!(page.records.len(), 1);
    }

    #[test]
    fn test_malformed_xml_is_read_error() {
        assert!(parse_xml_page(&b"<Root><Observation obsID=\"1\"></Root>"[..]).is_err());
    }
}
